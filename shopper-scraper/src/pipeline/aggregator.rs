use std::sync::Arc;
use std::time::{Duration, Instant};

use shopper_core::cache::ResultCache;
use shopper_core::common::error::AggregationError;
use shopper_core::domain::CanonicalProduct;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::apis::base::SiteAdapter;
use crate::config::ScraperConfig;
use crate::observability::metrics;
use crate::pipeline::matching::{cluster_offers, OfferCluster};
use crate::pipeline::normalize::{normalize_offer, normalize_title, RateTable};

/// Caller-supplied knobs for one aggregation.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    /// Restrict the fan-out to these site ids (case-insensitive).
    pub platforms: Option<Vec<String>>,
    /// Override the configured overall deadline for this call.
    pub timeout: Option<Duration>,
}

/// Orchestrates one query end to end: cache lookup, concurrent adapter
/// fan-out under a bounded deadline, normalization, clustering, derived
/// fields, and the cache write-back.
///
/// The cache handle is injected; the aggregator owns no global state and
/// holds offer data only for the duration of a single call.
pub struct Aggregator {
    adapters: Vec<Arc<dyn SiteAdapter>>,
    cache: Arc<dyn ResultCache>,
    rates: RateTable,
    base_currency: String,
    similarity_threshold: f64,
    cache_ttl: Duration,
    overall_timeout: Duration,
}

impl Aggregator {
    pub fn new(
        adapters: Vec<Arc<dyn SiteAdapter>>,
        cache: Arc<dyn ResultCache>,
        config: &ScraperConfig,
    ) -> Self {
        Self {
            adapters,
            cache,
            rates: config.rate_table(),
            base_currency: config.base_currency.clone(),
            similarity_threshold: config.similarity_threshold,
            cache_ttl: config.cache_ttl(),
            overall_timeout: config.overall_timeout(),
        }
    }

    /// Reconcile offers for `query` across all (selected) sites.
    ///
    /// Partial adapter failure is absorbed: the result carries whatever the
    /// surviving sites returned. Only when every attempted adapter fails does
    /// this surface `AggregationError::AllSourcesUnavailable`.
    #[instrument(skip(self, options))]
    pub async fn aggregate(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<CanonicalProduct>, AggregationError> {
        let started = Instant::now();
        let cache_key = self.cache_key(query, options);

        match self.cache.get(&cache_key).await {
            Ok(Some(value)) => match serde_json::from_value::<Vec<CanonicalProduct>>(value) {
                Ok(products) => {
                    metrics::cache::hit();
                    debug!(%cache_key, "serving aggregation from cache");
                    return Ok(apply_price_filters(products, options));
                }
                Err(err) => {
                    metrics::cache::degraded();
                    warn!(%cache_key, %err, "cached value undecodable, refetching");
                }
            },
            Ok(None) => metrics::cache::miss(),
            Err(err) => {
                metrics::cache::degraded();
                warn!(%cache_key, %err, "cache read failed, treating as miss");
            }
        }

        let adapters = self.select_adapters(options);
        if adapters.is_empty() {
            info!("platform filter matched no registered site, nothing to fetch");
            return Ok(Vec::new());
        }
        let attempted = adapters.len();

        let deadline =
            tokio::time::Instant::now() + options.timeout.unwrap_or(self.overall_timeout);
        let mut tasks = JoinSet::new();
        for adapter in adapters {
            let query = query.to_string();
            tasks.spawn(async move { (adapter.site_id(), adapter.fetch_listings(&query).await) });
        }

        // Join barrier: matching starts only once every fetch has settled
        // (success, failure, or deadline abandonment). Offers accumulate in
        // completion order, which is the arrival order the matcher sees.
        let mut raw_offers = Vec::new();
        let mut successes = 0usize;
        loop {
            let joined = match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(joined)) => joined,
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        in_flight = tasks.len(),
                        "aggregation deadline elapsed, abandoning in-flight fetches"
                    );
                    tasks.abort_all();
                    // Fetches that settled right at the deadline still hold
                    // results; collect them while the aborted tasks surface
                    // as cancelled join errors and count as failed.
                    while let Some(joined) = tasks.join_next().await {
                        if let Ok((site, Ok(offers))) = joined {
                            successes += 1;
                            debug!(site, count = offers.len(), "adapter fetch settled at the deadline");
                            raw_offers.extend(offers);
                        }
                    }
                    break;
                }
            };
            match joined {
                Ok((site, Ok(offers))) => {
                    successes += 1;
                    debug!(site, count = offers.len(), "adapter fetch succeeded");
                    raw_offers.extend(offers);
                }
                Ok((site, Err(err))) => {
                    warn!(site, %err, "adapter fetch failed, contributing zero offers");
                }
                Err(join_err) => {
                    warn!(%join_err, "adapter task aborted");
                }
            }
        }

        if successes == 0 {
            metrics::aggregator::aggregations_failed();
            warn!(attempted, "every adapter failed, aggregation unavailable");
            return Err(AggregationError::AllSourcesUnavailable {
                query: query.to_string(),
            });
        }

        let mut normalized = Vec::with_capacity(raw_offers.len());
        for raw in raw_offers {
            match normalize_offer(raw, &self.rates, &self.base_currency) {
                Ok(offer) => normalized.push(offer),
                Err(err) => {
                    metrics::aggregator::offers_skipped_conversion();
                    warn!(%err, "skipping offer with unconvertible price");
                }
            }
        }

        let clusters = cluster_offers(normalized, self.similarity_threshold);
        let products: Vec<CanonicalProduct> =
            clusters.into_iter().filter_map(build_product).collect();

        // Write-back is best effort: a failed put leaves the result uncached
        match serde_json::to_value(&products) {
            Ok(value) => {
                if let Err(err) = self.cache.put(&cache_key, value, self.cache_ttl).await {
                    metrics::cache::degraded();
                    warn!(%cache_key, %err, "cache write failed, result stays uncached");
                }
            }
            Err(err) => warn!(%err, "failed to serialize products for caching"),
        }

        metrics::aggregator::aggregations_success();
        metrics::aggregator::duration(started.elapsed().as_secs_f64());
        info!(
            products = products.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "aggregation complete"
        );
        Ok(apply_price_filters(products, options))
    }

    /// Cache key from the normalized query. The platform filter is part of
    /// the key so a restricted fetch never serves an unrestricted lookup.
    /// Price filters are applied after retrieval and stay out of the key.
    fn cache_key(&self, query: &str, options: &SearchOptions) -> String {
        let mut key = format!("search:{}", normalize_title(query));
        if let Some(platforms) = &options.platforms {
            let mut ids: Vec<String> = platforms.iter().map(|p| p.to_lowercase()).collect();
            ids.sort();
            key.push_str(":platforms=");
            key.push_str(&ids.join("+"));
        }
        key
    }

    fn select_adapters(&self, options: &SearchOptions) -> Vec<Arc<dyn SiteAdapter>> {
        match &options.platforms {
            Some(platforms) => self
                .adapters
                .iter()
                .filter(|adapter| {
                    platforms
                        .iter()
                        .any(|p| p.eq_ignore_ascii_case(adapter.site_id()))
                })
                .cloned()
                .collect(),
            None => self.adapters.clone(),
        }
    }
}

/// Derive the canonical product for one cluster: title from the first-seen
/// offer, price range over the base-currency prices, best offer strictly
/// lowest with ties to the earliest arrival.
fn build_product(cluster: OfferCluster) -> Option<CanonicalProduct> {
    let first = cluster.offers.first()?;
    let canonical_title = first.product_title.clone();

    let mut min_price = f64::INFINITY;
    let mut max_price = f64::NEG_INFINITY;
    let mut best = 0usize;
    for (index, offer) in cluster.offers.iter().enumerate() {
        let price = offer.price_in_base_currency;
        if price < min_price {
            min_price = price;
        }
        if price > max_price {
            max_price = price;
        }
        if price < cluster.offers[best].price_in_base_currency {
            best = index;
        }
    }

    Some(CanonicalProduct {
        id: Uuid::new_v4(),
        canonical_title,
        min_price,
        max_price,
        best_offer: cluster.offers[best].clone(),
        offers: cluster.offers,
        sentiment: None,
    })
}

/// Drop products whose price range falls outside the requested bounds:
/// `min_price` is a floor on the cheapest offer, `max_price` a ceiling on
/// the most expensive one.
fn apply_price_filters(
    products: Vec<CanonicalProduct>,
    options: &SearchOptions,
) -> Vec<CanonicalProduct> {
    products
        .into_iter()
        .filter(|p| options.min_price.map_or(true, |floor| p.min_price >= floor))
        .filter(|p| options.max_price.map_or(true, |ceiling| p.max_price <= ceiling))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shopper_core::domain::NormalizedOffer;

    fn offer(site: &str, price: f64) -> NormalizedOffer {
        NormalizedOffer {
            site: site.to_string(),
            product_title: "iPhone 15 Pro".to_string(),
            normalized_title: "iphone15pro".to_string(),
            price,
            currency: "INR".to_string(),
            price_in_base_currency: price,
            url: format!("https://{site}.example/p"),
            fetched_at: Utc::now(),
        }
    }

    fn cluster(prices: &[f64]) -> OfferCluster {
        OfferCluster {
            representative: "iphone15pro".to_string(),
            offers: prices
                .iter()
                .enumerate()
                .map(|(i, p)| offer(&format!("site{i}"), *p))
                .collect(),
        }
    }

    #[test]
    fn best_offer_is_strictly_lowest_price() {
        let product = build_product(cluster(&[79999.0, 78999.0, 80500.0])).unwrap();
        assert_eq!(product.best_offer.price_in_base_currency, 78999.0);
        assert_eq!(product.min_price, 78999.0);
        assert_eq!(product.max_price, 80500.0);
    }

    #[test]
    fn best_offer_price_tie_goes_to_earliest_arrival() {
        let product = build_product(cluster(&[78999.0, 78999.0])).unwrap();
        assert_eq!(product.best_offer.site, "site0");
    }

    #[test]
    fn canonical_title_comes_from_first_offer() {
        let mut c = cluster(&[100.0, 90.0]);
        c.offers[0].product_title = "iPhone 15 Pro".to_string();
        c.offers[1].product_title = "iphone15pro".to_string();
        let product = build_product(c).unwrap();
        assert_eq!(product.canonical_title, "iPhone 15 Pro");
    }

    #[test]
    fn price_filters_drop_out_of_range_products() {
        let products = vec![
            build_product(cluster(&[100.0, 200.0])).unwrap(),
            build_product(cluster(&[500.0, 900.0])).unwrap(),
        ];
        let options = SearchOptions {
            min_price: Some(150.0),
            max_price: Some(1000.0),
            ..Default::default()
        };
        let filtered = apply_price_filters(products, &options);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].min_price, 500.0);
    }
}
