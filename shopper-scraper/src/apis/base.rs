use std::time::{Duration, Instant};

use shopper_core::domain::RawOffer;
use tracing::{info, instrument, warn};

use crate::common::error::{FetchError, FetchResult};
use crate::config::ScraperConfig;
use crate::observability::metrics;

/// One retail platform's listing source. Adapters are independent: a failure
/// here never aborts sibling adapters, the aggregator just records zero
/// offers from this site.
#[async_trait::async_trait]
pub trait SiteAdapter: Send + Sync {
    /// Stable site id (also the CLI/config spelling)
    fn site_id(&self) -> &'static str;

    /// Fetch listing pages for a query and extract raw offers
    async fn fetch_listings(&self, query: &str) -> FetchResult<Vec<RawOffer>>;
}

/// Site-specific extraction rules: where to search and how to pull raw
/// offers out of a listing page. Purely mechanical; no I/O.
pub trait ListingParser: Send + Sync {
    fn site_id(&self) -> &'static str;

    /// Build the search URL for a query
    fn search_url(&self, query: &str) -> String;

    /// Extract raw offers from a fetched listing page
    fn parse_listings(&self, body: &str) -> FetchResult<Vec<RawOffer>>;
}

/// Base adapter that implements `SiteAdapter` over a site-specific parser:
/// politeness pause, identified HTTP GET with a per-request timeout, then
/// delegation to the parser.
pub struct BaseAdapter {
    client: reqwest::Client,
    parser: Box<dyn ListingParser>,
    user_agent: String,
    request_delay: Duration,
    request_jitter: Duration,
    request_timeout: Duration,
}

impl BaseAdapter {
    pub fn new(parser: Box<dyn ListingParser>, config: &ScraperConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            parser,
            user_agent: config.user_agent.clone(),
            request_delay: Duration::from_millis(config.request_delay_ms),
            request_jitter: Duration::from_millis(config.request_jitter_ms),
            request_timeout: config.request_timeout(),
        }
    }

    /// Fixed politeness delay plus random jitter before each request.
    async fn politeness_pause(&self) {
        let jitter_ms = if self.request_jitter.as_millis() > 0 {
            use rand::Rng;
            // Draw before awaiting: thread_rng is not held across await points
            rand::thread_rng().gen_range(0..=self.request_jitter.as_millis() as u64)
        } else {
            0
        };
        let pause = self.request_delay + Duration::from_millis(jitter_ms);
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }
}

#[async_trait::async_trait]
impl SiteAdapter for BaseAdapter {
    fn site_id(&self) -> &'static str {
        self.parser.site_id()
    }

    #[instrument(skip(self))]
    async fn fetch_listings(&self, query: &str) -> FetchResult<Vec<RawOffer>> {
        self.politeness_pause().await;

        let url = self.parser.search_url(query);
        let site = self.site_id();
        let started = Instant::now();

        let result = async {
            let resp = self
                .client
                .get(&url)
                .header(reqwest::header::USER_AGENT, &self.user_agent)
                .timeout(self.request_timeout)
                .send()
                .await?
                .error_for_status()?;
            let body = resp.text().await?;
            if body.trim().is_empty() {
                return Err(FetchError::Parse {
                    message: format!("empty listing page from {url}"),
                });
            }
            self.parser.parse_listings(&body)
        }
        .await;

        metrics::adapters::fetch_duration(site, started.elapsed().as_secs_f64());
        match &result {
            Ok(offers) => {
                metrics::adapters::fetch_success(site);
                metrics::adapters::offers_extracted(site, offers.len());
                info!("Fetched {} offers from {}", offers.len(), site);
            }
            Err(err) => {
                metrics::adapters::fetch_error(site);
                warn!("Fetch from {} failed: {}", site, err);
            }
        }
        result
    }
}
