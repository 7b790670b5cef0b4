#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/finboard/finboard/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Typed, cached finance data for the finboard dashboard.
//!
//! This crate ties the finance API to the query cache. It re-exports the core
//! types, the cache, and (with the `http` feature) the HTTP client, and
//! provides [`FinanceQueries`] with one cached query per finance resource.
//!
//! # Features
//!
//! - `http` - HTTP client for the `/api/finance` endpoints (default)
//!
//! # Example
//!
//! ```rust,ignore
//! use finboard::{FinanceQueries, PriceRange, QueryOptions};
//!
//! #[tokio::main]
//! async fn main() -> finboard::Result<()> {
//!     let queries = FinanceQueries::from_env()?;
//!
//!     let mut prices = queries.stock_price("AAPL", PriceRange::OneMonth, QueryOptions::new());
//!     let state = prices.settled().await;
//!     if let Some(history) = state.data() {
//!         println!("{}", history.to_frame()?);
//!     }
//!
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use finboard_core::*;

// Query cache
pub use finboard_query::{
    CacheConfig, DEFAULT_GC_TIME, Query, QueryCache, QueryOptions, QueryState, QueryView,
    RetryPolicy, SharedError,
};

// Transport
#[cfg(feature = "http")]
pub use finboard_client::{ClientConfig, HttpFinanceClient};

/// Resource keys and activation rules.
pub mod keys;
mod queries;
pub use queries::FinanceQueries;
