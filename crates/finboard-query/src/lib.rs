#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/finboard/finboard/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Keyed, deduplicating query cache.
//!
//! - [`QueryCache`] - The shared store; create queries and manage entries
//! - [`Query`] - A live subscription to one entry
//! - [`QueryState`] / [`QueryView`] - What subscribers observe
//! - [`QueryOptions`] / [`CacheConfig`] / [`RetryPolicy`] - Configuration

/// The process-wide query cache.
pub mod cache;
mod entry;
/// Cache-wide defaults and per-query overrides.
pub mod options;
/// Live query handles.
pub mod query;
/// Query results as seen by callers.
pub mod state;

pub use cache::QueryCache;
pub use options::{CacheConfig, DEFAULT_GC_TIME, QueryOptions, RetryPolicy};
pub use query::Query;
pub use state::{QueryState, QueryView, SharedError};
