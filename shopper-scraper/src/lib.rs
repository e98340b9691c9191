//! Scraping and reconciliation pipeline for the SmartShopper core.

pub mod apis;
pub mod common;
pub mod config;
pub mod observability;
pub mod pipeline;

pub use pipeline::aggregator::{Aggregator, SearchOptions};
