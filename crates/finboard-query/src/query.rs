//! Live query handles.

use finboard_core::ResourceKey;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::entry::{Entry, Status, typed};
use crate::state::{QueryState, QueryView};

/// A subscription to one cache entry.
///
/// The handle counts as a subscriber until dropped. Dropping it does not
/// cancel an in-flight request; it only stops update delivery and, for the
/// last subscriber, starts the entry's retention window.
pub struct Query<T> {
    entry: Arc<Entry>,
    rx: watch::Receiver<Status>,
    enabled: bool,
    active: bool,
    stale_time: Duration,
    _marker: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("key", self.entry.key())
            .field("enabled", &self.enabled)
            .field("active", &self.active)
            .field("status", &*self.rx.borrow())
            .finish()
    }
}

impl<T: Send + Sync + 'static> Query<T> {
    pub(crate) fn new(
        entry: Arc<Entry>,
        enabled: bool,
        active: bool,
        stale_time: Duration,
    ) -> Self {
        let rx = entry.receiver();
        Self {
            entry,
            rx,
            enabled: enabled && active,
            active,
            stale_time,
            _marker: PhantomData,
        }
    }

    /// Returns the key this query is subscribed to.
    #[must_use]
    pub fn key(&self) -> &ResourceKey {
        self.entry.key()
    }

    /// Returns whether this subscriber may trigger fetches.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns whether the query's parameters allow a request.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> QueryState<T> {
        typed(self.entry.key(), &self.rx.borrow())
    }

    /// Returns the current state in the uniform caller shape.
    #[must_use]
    pub fn view(&self) -> QueryView<T> {
        self.state().view()
    }

    /// Enables or disables fetching for this subscriber.
    ///
    /// Enabling triggers a fetch if the cached data is missing or stale.
    /// Disabling does not cancel an in-flight request. Enabling an inactive
    /// query has no effect.
    pub fn set_enabled(&mut self, enabled: bool) {
        let enabled = enabled && self.active;
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        self.entry.toggle_enabled(enabled, self.stale_time);
    }

    /// Requests a fresh fetch.
    ///
    /// Returns false without fetching when the query is disabled or a request
    /// for the key is already in flight.
    pub fn refetch(&self) -> bool {
        self.enabled && self.entry.refetch()
    }

    /// Waits for the next state change and returns the new state.
    pub async fn changed(&mut self) -> QueryState<T> {
        // The sender lives in the entry this handle keeps alive.
        let _ = self.rx.changed().await;
        self.state()
    }

    /// Waits until the query is no longer pending and returns its state.
    pub async fn settled(&mut self) -> QueryState<T> {
        loop {
            let state = typed(self.entry.key(), &self.rx.borrow_and_update());
            if !state.is_pending() {
                return state;
            }
            if self.rx.changed().await.is_err() {
                return self.state();
            }
        }
    }
}

impl<T> Drop for Query<T> {
    fn drop(&mut self) {
        self.entry.detach(self.enabled);
    }
}
