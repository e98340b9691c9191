use chrono::Utc;
use scraper::{Html, Selector};
use shopper_core::domain::RawOffer;
use tracing::debug;

use super::{parse_price_text, query_to_plus};
use crate::apis::base::ListingParser;
use crate::common::constants::{FLIPKART_SITE, FLIPKART_SITE_NAME};
use crate::common::error::FetchResult;

const BASE_URL: &str = "https://www.flipkart.com";

/// Extraction rules for Flipkart search result pages.
pub struct FlipkartParser;

impl FlipkartParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FlipkartParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ListingParser for FlipkartParser {
    fn site_id(&self) -> &'static str {
        FLIPKART_SITE
    }

    fn search_url(&self, query: &str) -> String {
        format!("{BASE_URL}/search?q={}", query_to_plus(query))
    }

    fn parse_listings(&self, body: &str) -> FetchResult<Vec<RawOffer>> {
        let document = Html::parse_document(body);
        let item_sel = Selector::parse("._1AtVbE").unwrap();
        let title_sel = Selector::parse("._4rR01T").unwrap();
        let price_sel = Selector::parse("._30jeq3").unwrap();
        let link_sel = Selector::parse("a._1fQZEK").unwrap();

        let mut offers = Vec::new();
        for item in document.select(&item_sel) {
            let title = item
                .select(&title_sel)
                .next()
                .map(|el| el.text().collect::<String>().trim().to_string());
            let price = item
                .select(&price_sel)
                .next()
                .and_then(|el| parse_price_text(&el.text().collect::<String>()));
            let href = item
                .select(&link_sel)
                .next()
                .and_then(|el| el.value().attr("href"));

            let (Some(title), Some(price), Some(href)) = (title, price, href) else {
                continue;
            };
            if title.is_empty() {
                continue;
            }

            offers.push(RawOffer {
                site: FLIPKART_SITE_NAME.to_string(),
                product_title: title,
                price,
                currency: "INR".to_string(),
                url: format!("{BASE_URL}{href}"),
                fetched_at: Utc::now(),
            });
        }

        debug!("Extracted {} offers from Flipkart listing page", offers.len());
        Ok(offers)
    }
}
