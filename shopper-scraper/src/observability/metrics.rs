//! Metrics for the scraping and reconciliation pipeline.
//!
//! Thin helpers over the `metrics` facade with Prometheus-style names, so
//! call sites stay free of magic strings. Installing an exporter is the
//! embedding process's concern.

pub mod adapters {
    /// Record a successful adapter fetch
    pub fn fetch_success(site: &str) {
        ::metrics::counter!("shopper_adapter_fetches_success_total", "site" => site.to_string())
            .increment(1);
    }

    /// Record a failed adapter fetch
    pub fn fetch_error(site: &str) {
        ::metrics::counter!("shopper_adapter_fetches_error_total", "site" => site.to_string())
            .increment(1);
    }

    /// Record fetch duration in seconds
    pub fn fetch_duration(site: &str, secs: f64) {
        ::metrics::histogram!("shopper_adapter_fetch_duration_seconds", "site" => site.to_string())
            .record(secs);
    }

    /// Record the number of raw offers one fetch extracted
    pub fn offers_extracted(site: &str, count: usize) {
        ::metrics::histogram!("shopper_adapter_offers_extracted", "site" => site.to_string())
            .record(count as f64);
    }
}

pub mod cache {
    pub fn hit() {
        ::metrics::counter!("shopper_cache_hits_total").increment(1);
    }

    pub fn miss() {
        ::metrics::counter!("shopper_cache_misses_total").increment(1);
    }

    /// A cache backend error degraded to miss behavior
    pub fn degraded() {
        ::metrics::counter!("shopper_cache_degraded_total").increment(1);
    }
}

pub mod matching {
    pub fn offers_clustered(count: usize) {
        ::metrics::histogram!("shopper_matching_offers_clustered").record(count as f64);
    }

    pub fn clusters_formed(count: usize) {
        ::metrics::histogram!("shopper_matching_clusters_formed").record(count as f64);
    }
}

pub mod aggregator {
    pub fn aggregations_success() {
        ::metrics::counter!("shopper_aggregations_success_total").increment(1);
    }

    pub fn aggregations_failed() {
        ::metrics::counter!("shopper_aggregations_failed_total").increment(1);
    }

    pub fn offers_skipped_conversion() {
        ::metrics::counter!("shopper_offers_skipped_conversion_total").increment(1);
    }

    pub fn duration(secs: f64) {
        ::metrics::histogram!("shopper_aggregation_duration_seconds").record(secs);
    }
}
