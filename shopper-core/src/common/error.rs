use thiserror::Error;

/// Raised by the normalizer when a price cannot be converted into the base
/// currency. Recovered by skipping the offending offer, never the batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("no exchange rate known from {from} to {to}")]
    UnknownRate { from: String, to: String },
}

/// The only core-level error visible to callers of `aggregate`.
///
/// Partial adapter failure is not an error state; this fires only when every
/// attempted source failed, so callers can tell "no results found" apart from
/// "no data obtainable".
#[derive(Error, Debug)]
pub enum AggregationError {
    #[error("all sources unavailable for query '{query}'")]
    AllSourcesUnavailable { query: String },
}

/// Cache-layer failures. The aggregator degrades these to cache-miss
/// behavior rather than failing the request.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("cache backend error: {message}")]
    Backend { message: String },
}
