use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::normalize::RateTable;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// One directed exchange rate in the pluggable rate table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub from: String,
    pub to: String,
    pub rate: f64,
}

/// Runtime configuration for the scraping and reconciliation pipeline.
///
/// Loaded from a TOML file with every field optional; `.env` is read at
/// startup so deployments can override the file location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// User-agent identity sent with every listing request.
    pub user_agent: String,
    /// Politeness delay before each request, in milliseconds.
    pub request_delay_ms: u64,
    /// Random jitter added on top of the politeness delay.
    pub request_jitter_ms: u64,
    /// Per-request timeout; elapsing yields a timeout fetch failure.
    pub request_timeout_secs: u64,
    /// Overall aggregation deadline across the whole adapter fan-out.
    pub overall_timeout_secs: u64,
    /// Similarity threshold (0-100) for joining an offer to a cluster.
    pub similarity_threshold: f64,
    /// TTL for cached aggregation results, in seconds.
    pub cache_ttl_secs: u64,
    /// Currency every offer price is converted into.
    pub base_currency: String,
    /// Known exchange rates. Same-currency conversion needs no entry.
    pub rates: Vec<ExchangeRate>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            user_agent: "SmartShopper/1.0".to_string(),
            request_delay_ms: 1000,
            request_jitter_ms: 250,
            request_timeout_secs: 10,
            overall_timeout_secs: 15,
            similarity_threshold: 80.0,
            cache_ttl_secs: 3600,
            base_currency: "INR".to_string(),
            rates: Vec::new(),
        }
    }
}

impl ScraperConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn rate_table(&self) -> RateTable {
        let mut table = RateTable::new();
        for entry in &self.rates {
            table.insert(&entry.from, &entry.to, entry.rate);
        }
        table
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn overall_timeout(&self) -> Duration {
        Duration::from_secs(self.overall_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
