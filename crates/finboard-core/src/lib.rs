#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/finboard/finboard/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for the finboard data layer.
//!
//! - [`FinanceApi`](provider::FinanceApi) - Typed access to the finance endpoints
//! - [`ResourceKey`](key::ResourceKey) - Identity of a cached query
//! - [`FinanceError`](error::FinanceError) - The single error value surfaced to callers

/// Error types for finance data operations.
pub mod error;
/// Resource keys identifying cached queries.
pub mod key;
/// Request parameter types.
pub mod params;
/// The finance API trait.
pub mod provider;
/// Persisted record shapes.
pub mod records;
/// Resource payloads (Symbol, StockQuote, PriceHistory, etc.).
pub mod types;

// Re-export commonly used items at crate root
pub use error::{FinanceError, Result};
pub use key::{KeyParam, ResourceKey, ResourceKind};
pub use params::{PeriodType, PriceRange};
pub use provider::FinanceApi;
pub use records::{
    NewPortfolio, NewStock, NewUser, Portfolio, PortfolioSummary, Stock, User,
};
pub use types::{
    CashFlowStatement, CompanyProfile, NewsArticle, PriceHistory, PricePoint, StockQuote, Symbol,
    SymbolMatch,
};
