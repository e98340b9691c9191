//! Shared domain types and contracts for the SmartShopper reconciliation core.

pub mod cache;
pub mod common;
pub mod domain;

pub use cache::{InMemoryCache, ResultCache};
pub use common::error::{AggregationError, CacheError, ConversionError};
