use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use shopper_core::cache::{InMemoryCache, ResultCache};
use shopper_core::common::error::{AggregationError, CacheError};
use shopper_core::domain::RawOffer;
use shopper_scraper::apis::base::SiteAdapter;
use shopper_scraper::common::error::{FetchError, FetchResult};
use shopper_scraper::config::ScraperConfig;
use shopper_scraper::{Aggregator, SearchOptions};

struct MockAdapter {
    site: &'static str,
    offers: Vec<RawOffer>,
    fail: bool,
    delay: Duration,
    calls: Arc<AtomicUsize>,
}

impl MockAdapter {
    fn returning(site: &'static str, offers: Vec<RawOffer>) -> Self {
        Self {
            site,
            offers,
            fail: false,
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn failing(site: &'static str) -> Self {
        Self {
            site,
            offers: Vec::new(),
            fail: true,
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait::async_trait]
impl SiteAdapter for MockAdapter {
    fn site_id(&self) -> &'static str {
        self.site
    }

    async fn fetch_listings(&self, _query: &str) -> FetchResult<Vec<RawOffer>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(FetchError::Network {
                message: "connection refused".to_string(),
            });
        }
        Ok(self.offers.clone())
    }
}

/// Cache whose backend is permanently down, for the degradation paths.
struct FailingCache;

#[async_trait::async_trait]
impl ResultCache for FailingCache {
    async fn get(&self, _key: &str) -> Result<Option<Value>, CacheError> {
        Err(CacheError::Backend {
            message: "cache offline".to_string(),
        })
    }

    async fn put(&self, _key: &str, _value: Value, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Backend {
            message: "cache offline".to_string(),
        })
    }
}

fn offer(site: &str, title: &str, price: f64) -> RawOffer {
    RawOffer {
        site: site.to_string(),
        product_title: title.to_string(),
        price,
        currency: "INR".to_string(),
        url: format!("https://{}.example/{}", site.to_lowercase(), price),
        fetched_at: Utc::now(),
    }
}

fn test_config() -> ScraperConfig {
    ScraperConfig {
        request_delay_ms: 0,
        request_jitter_ms: 0,
        overall_timeout_secs: 5,
        ..Default::default()
    }
}

fn aggregator_with(adapters: Vec<Arc<dyn SiteAdapter>>, config: &ScraperConfig) -> Aggregator {
    let cache: Arc<dyn ResultCache> = Arc::new(InMemoryCache::new());
    Aggregator::new(adapters, cache, config)
}

#[tokio::test]
async fn offers_for_one_product_reconcile_across_sites() {
    let adapters: Vec<Arc<dyn SiteAdapter>> = vec![
        Arc::new(MockAdapter::returning(
            "amazon",
            vec![offer("Amazon", "iPhone 15 Pro", 79999.0)],
        )),
        Arc::new(MockAdapter::returning(
            "flipkart",
            vec![
                offer("Flipkart", "iphone15pro", 78999.0),
                offer("Flipkart", "Samsung Galaxy S24", 74999.0),
            ],
        )),
    ];
    let config = test_config();
    let aggregator = aggregator_with(adapters, &config);

    let products = aggregator
        .aggregate("iphone 15 pro", &SearchOptions::default())
        .await
        .unwrap();

    assert_eq!(products.len(), 2);
    let iphone = products
        .iter()
        .find(|p| p.offers.len() == 2)
        .expect("the two iPhone offers should share one product");
    assert_eq!(iphone.best_offer.price_in_base_currency, 78999.0);
    assert_eq!(iphone.min_price, 78999.0);
    assert_eq!(iphone.max_price, 79999.0);
}

#[tokio::test]
async fn partial_adapter_failure_returns_survivors() {
    let adapters: Vec<Arc<dyn SiteAdapter>> = vec![
        Arc::new(MockAdapter::failing("amazon")),
        Arc::new(MockAdapter::failing("flipkart")),
        Arc::new(MockAdapter::returning(
            "ebay",
            vec![offer("Ebay", "iPhone 15 Pro", 81000.0)],
        )),
    ];
    let config = test_config();
    let aggregator = aggregator_with(adapters, &config);

    let products = aggregator
        .aggregate("iphone 15 pro", &SearchOptions::default())
        .await
        .unwrap();

    assert_eq!(products.len(), 1);
    assert_eq!(products[0].offers.len(), 1);
    assert_eq!(products[0].offers[0].site, "Ebay");
}

#[tokio::test]
async fn all_sources_down_is_an_error_not_an_empty_result() {
    let adapters: Vec<Arc<dyn SiteAdapter>> = vec![
        Arc::new(MockAdapter::failing("amazon")),
        Arc::new(MockAdapter::failing("flipkart")),
    ];
    let config = test_config();
    let aggregator = aggregator_with(adapters, &config);

    let err = aggregator
        .aggregate("iphone 15 pro", &SearchOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AggregationError::AllSourcesUnavailable { .. }
    ));
}

#[tokio::test]
async fn empty_successful_fetches_are_a_success_with_no_products() {
    let adapters: Vec<Arc<dyn SiteAdapter>> =
        vec![Arc::new(MockAdapter::returning("amazon", Vec::new()))];
    let config = test_config();
    let aggregator = aggregator_with(adapters, &config);

    let products = aggregator
        .aggregate("definitely unknown product", &SearchOptions::default())
        .await
        .unwrap();
    assert!(products.is_empty());
}

#[tokio::test]
async fn second_lookup_is_served_from_cache() {
    let adapter = MockAdapter::returning("amazon", vec![offer("Amazon", "iPhone 15 Pro", 79999.0)]);
    let calls = adapter.call_counter();
    let config = test_config();
    let aggregator = aggregator_with(vec![Arc::new(adapter)], &config);

    let first = aggregator
        .aggregate("iphone 15 pro", &SearchOptions::default())
        .await
        .unwrap();
    let second = aggregator
        .aggregate("iphone 15 pro", &SearchOptions::default())
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(first.len(), second.len());
    assert_eq!(second[0].best_offer.price_in_base_currency, 79999.0);
}

#[tokio::test]
async fn expired_cache_entry_triggers_a_fresh_aggregation() {
    let adapter = MockAdapter::returning("amazon", vec![offer("Amazon", "iPhone 15 Pro", 79999.0)]);
    let calls = adapter.call_counter();
    let config = ScraperConfig {
        cache_ttl_secs: 1,
        ..test_config()
    };
    let aggregator = aggregator_with(vec![Arc::new(adapter)], &config);

    aggregator
        .aggregate("iphone 15 pro", &SearchOptions::default())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(1100)).await;
    aggregator
        .aggregate("iphone 15 pro", &SearchOptions::default())
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2, "stale entry must not be served");
}

#[tokio::test]
async fn deadline_excludes_slow_adapter_but_keeps_fast_results() {
    let adapters: Vec<Arc<dyn SiteAdapter>> = vec![
        Arc::new(
            MockAdapter::returning("amazon", vec![offer("Amazon", "iPhone 15 Pro", 79999.0)])
                .with_delay(Duration::from_millis(10)),
        ),
        Arc::new(
            MockAdapter::returning("flipkart", vec![offer("Flipkart", "iphone15pro", 70000.0)])
                .with_delay(Duration::from_secs(30)),
        ),
    ];
    let config = test_config();
    let aggregator = aggregator_with(adapters, &config);

    let options = SearchOptions {
        timeout: Some(Duration::from_millis(300)),
        ..Default::default()
    };
    let products = aggregator.aggregate("iphone 15 pro", &options).await.unwrap();

    assert_eq!(products.len(), 1);
    assert_eq!(products[0].offers.len(), 1);
    assert_eq!(products[0].offers[0].site, "Amazon");
}

#[tokio::test]
async fn cache_backend_errors_degrade_to_miss_behavior() {
    let adapter = MockAdapter::returning("amazon", vec![offer("Amazon", "iPhone 15 Pro", 79999.0)]);
    let calls = adapter.call_counter();
    let config = test_config();
    let aggregator = Aggregator::new(vec![Arc::new(adapter)], Arc::new(FailingCache), &config);

    // A failing get is a miss, not an aggregation failure
    let first = aggregator
        .aggregate("iphone 15 pro", &SearchOptions::default())
        .await
        .unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].best_offer.price_in_base_currency, 79999.0);

    // The failed put left nothing cached, so the next call fetches again
    let second = aggregator
        .aggregate("iphone 15 pro", &SearchOptions::default())
        .await
        .unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn all_adapters_timing_out_is_all_sources_unavailable() {
    let adapters: Vec<Arc<dyn SiteAdapter>> = vec![
        Arc::new(
            MockAdapter::returning("amazon", vec![offer("Amazon", "iPhone 15 Pro", 79999.0)])
                .with_delay(Duration::from_secs(30)),
        ),
        Arc::new(
            MockAdapter::returning("flipkart", vec![offer("Flipkart", "iphone15pro", 78999.0)])
                .with_delay(Duration::from_secs(30)),
        ),
    ];
    let config = test_config();
    let aggregator = aggregator_with(adapters, &config);

    let options = SearchOptions {
        timeout: Some(Duration::from_millis(200)),
        ..Default::default()
    };
    let err = aggregator
        .aggregate("iphone 15 pro", &options)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AggregationError::AllSourcesUnavailable { .. }
    ));
}

#[tokio::test]
async fn platform_filter_restricts_the_fan_out() {
    let amazon = MockAdapter::returning("amazon", vec![offer("Amazon", "iPhone 15 Pro", 79999.0)]);
    let flipkart =
        MockAdapter::returning("flipkart", vec![offer("Flipkart", "iphone15pro", 78999.0)]);
    let amazon_calls = amazon.call_counter();
    let flipkart_calls = flipkart.call_counter();
    let config = test_config();
    let aggregator = aggregator_with(vec![Arc::new(amazon), Arc::new(flipkart)], &config);

    let options = SearchOptions {
        platforms: Some(vec!["Flipkart".to_string()]),
        ..Default::default()
    };
    let products = aggregator.aggregate("iphone 15 pro", &options).await.unwrap();

    assert_eq!(amazon_calls.load(Ordering::SeqCst), 0);
    assert_eq!(flipkart_calls.load(Ordering::SeqCst), 1);
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].offers[0].site, "Flipkart");
}

#[tokio::test]
async fn filtered_fetch_never_serves_an_unfiltered_lookup() {
    let amazon = MockAdapter::returning("amazon", vec![offer("Amazon", "iPhone 15 Pro", 79999.0)]);
    let flipkart =
        MockAdapter::returning("flipkart", vec![offer("Flipkart", "iphone15pro", 78999.0)]);
    let amazon_calls = amazon.call_counter();
    let flipkart_calls = flipkart.call_counter();
    let config = test_config();
    let aggregator = aggregator_with(vec![Arc::new(amazon), Arc::new(flipkart)], &config);

    let filtered = SearchOptions {
        platforms: Some(vec!["flipkart".to_string()]),
        ..Default::default()
    };
    aggregator.aggregate("iphone 15 pro", &filtered).await.unwrap();
    assert_eq!(amazon_calls.load(Ordering::SeqCst), 0);
    assert_eq!(flipkart_calls.load(Ordering::SeqCst), 1);

    // The restricted result is keyed separately: the unfiltered lookup must
    // fan out to every site, not replay the one-site cache entry.
    let products = aggregator
        .aggregate("iphone 15 pro", &SearchOptions::default())
        .await
        .unwrap();
    assert_eq!(amazon_calls.load(Ordering::SeqCst), 1);
    assert_eq!(flipkart_calls.load(Ordering::SeqCst), 2);
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].offers.len(), 2);
}

#[tokio::test]
async fn unknown_platform_filter_yields_empty_success() {
    let adapter = MockAdapter::returning("amazon", vec![offer("Amazon", "iPhone 15 Pro", 79999.0)]);
    let config = test_config();
    let aggregator = aggregator_with(vec![Arc::new(adapter)], &config);

    let options = SearchOptions {
        platforms: Some(vec!["ebay".to_string()]),
        ..Default::default()
    };
    let products = aggregator.aggregate("iphone 15 pro", &options).await.unwrap();
    assert!(products.is_empty());
}

#[tokio::test]
async fn offers_without_a_known_exchange_rate_are_skipped() {
    let mut usd_offer = offer("Amazon", "iPhone 15 Pro", 999.0);
    usd_offer.currency = "USD".to_string();
    let adapters: Vec<Arc<dyn SiteAdapter>> = vec![Arc::new(MockAdapter::returning(
        "amazon",
        vec![usd_offer, offer("Amazon", "iPhone 15 Pro", 79999.0)],
    ))];
    // Default config has no USD->INR rate
    let config = test_config();
    let aggregator = aggregator_with(adapters, &config);

    let products = aggregator
        .aggregate("iphone 15 pro", &SearchOptions::default())
        .await
        .unwrap();

    assert_eq!(products.len(), 1);
    assert_eq!(products[0].offers.len(), 1);
    assert_eq!(products[0].offers[0].price_in_base_currency, 79999.0);
}
