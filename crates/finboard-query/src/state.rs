//! Query results as seen by callers.

use finboard_core::FinanceError;
use std::sync::Arc;

/// An error shared by every subscriber of a failed query.
pub type SharedError = Arc<FinanceError>;

/// Current state of a query.
///
/// `Idle` means no request was ever issued for the entry, typically because
/// the query is disabled. It is distinct from `Pending`.
#[derive(Debug)]
pub enum QueryState<T> {
    /// No request issued.
    Idle,
    /// A request is in flight and no result is available for it yet.
    Pending,
    /// The last request succeeded.
    Success(Arc<T>),
    /// The last request failed.
    Error(SharedError),
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Idle => Self::Idle,
            Self::Pending => Self::Pending,
            Self::Success(data) => Self::Success(Arc::clone(data)),
            Self::Error(err) => Self::Error(Arc::clone(err)),
        }
    }
}

impl<T> QueryState<T> {
    /// Returns true if no request was issued.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Returns true while a request is in flight.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Returns true if the last request succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns true if the last request failed.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Returns the payload of a successful query.
    #[must_use]
    pub const fn data(&self) -> Option<&Arc<T>> {
        match self {
            Self::Success(data) => Some(data),
            _ => None,
        }
    }

    /// Returns the error of a failed query.
    #[must_use]
    pub const fn error(&self) -> Option<&SharedError> {
        match self {
            Self::Error(err) => Some(err),
            _ => None,
        }
    }

    /// Converts the state into the uniform caller view.
    #[must_use]
    pub fn view(&self) -> QueryView<T> {
        QueryView {
            data: self.data().cloned(),
            is_loading: self.is_pending(),
            error: self.error().cloned(),
        }
    }
}

/// The uniform shape every query hands to callers, whatever the resource.
#[derive(Debug)]
pub struct QueryView<T> {
    /// Payload, if the last request succeeded.
    pub data: Option<Arc<T>>,
    /// True while a request is in flight.
    pub is_loading: bool,
    /// Error, if the last request failed.
    pub error: Option<SharedError>,
}

impl<T> Clone for QueryView<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            is_loading: self.is_loading,
            error: self.error.clone(),
        }
    }
}

impl<T> Default for QueryView<T> {
    fn default() -> Self {
        Self {
            data: None,
            is_loading: false,
            error: None,
        }
    }
}
