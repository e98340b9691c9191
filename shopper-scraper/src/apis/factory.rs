use std::sync::Arc;

use crate::apis::base::{BaseAdapter, SiteAdapter};
use crate::apis::parsers::{AmazonParser, FlipkartParser};
use crate::common::constants::{ALL_SITES, AMAZON_SITE, FLIPKART_SITE};
use crate::config::ScraperConfig;

/// Factory function to create a site adapter by id.
pub fn create_adapter(site_id: &str, config: &ScraperConfig) -> Option<Arc<dyn SiteAdapter>> {
    match site_id {
        AMAZON_SITE => Some(Arc::new(BaseAdapter::new(
            Box::new(AmazonParser::new()),
            config,
        ))),
        FLIPKART_SITE => Some(Arc::new(BaseAdapter::new(
            Box::new(FlipkartParser::new()),
            config,
        ))),
        _ => None,
    }
}

/// All registered adapters, in registration order.
pub fn create_all_adapters(config: &ScraperConfig) -> Vec<Arc<dyn SiteAdapter>> {
    ALL_SITES
        .iter()
        .filter_map(|site_id| create_adapter(site_id, config))
        .collect()
}
