//! Resource keys identifying cached queries.
//!
//! A [`ResourceKey`] is a resource kind plus an ordered list of scalar
//! parameters. Two keys are equal iff the kind and every parameter match by
//! value.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of resource a query fetches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    /// Company cash flow statements.
    CompanyCashFlow,
    /// Company profile.
    CompanyData,
    /// Price history.
    StockPrice,
    /// Market news.
    MarketNews,
    /// Latest quote.
    StockQuote,
    /// Symbol search.
    Search,
}

impl ResourceKind {
    /// All resource kinds.
    pub const ALL: [Self; 6] = [
        Self::CompanyCashFlow,
        Self::CompanyData,
        Self::StockPrice,
        Self::MarketNews,
        Self::StockQuote,
        Self::Search,
    ];

    /// Returns the kind's path segment under `/api/finance`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CompanyCashFlow => "company-cash-flow",
            Self::CompanyData => "company-data",
            Self::StockPrice => "stock-price",
            Self::MarketNews => "market-news",
            Self::StockQuote => "stock-quote",
            Self::Search => "search",
        }
    }

    /// Returns the endpoint path for this kind.
    #[must_use]
    pub fn path(&self) -> String {
        format!("/api/finance/{}", self.as_str())
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scalar key parameter.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyParam {
    /// Absent optional parameter.
    None,
    /// Boolean parameter.
    Bool(bool),
    /// Integer parameter.
    Int(i64),
    /// String parameter.
    Str(String),
}

impl fmt::Display for KeyParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("-"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for KeyParam {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for KeyParam {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for KeyParam {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for KeyParam {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl<T: Into<Self>> From<Option<T>> for KeyParam {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::None, Into::into)
    }
}

/// Identity of a cached query: resource kind plus ordered parameters.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    kind: ResourceKind,
    params: Vec<KeyParam>,
}

impl ResourceKey {
    /// Creates a key with no parameters.
    #[must_use]
    pub const fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            params: Vec::new(),
        }
    }

    /// Appends a parameter.
    #[must_use]
    pub fn with(mut self, param: impl Into<KeyParam>) -> Self {
        self.params.push(param.into());
        self
    }

    /// Returns the resource kind.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Returns the parameters in order.
    #[must_use]
    pub fn params(&self) -> &[KeyParam] {
        &self.params
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        for param in &self.params {
            write!(f, "/{param}")?;
        }
        Ok(())
    }
}
