/// Site id constants to keep adapter names consistent across the codebase
// Site ids (used in CLI, config, and the adapter factory)
pub const AMAZON_SITE: &str = "amazon";
pub const FLIPKART_SITE: &str = "flipkart";

// Display names (used on emitted offers)
pub const AMAZON_SITE_NAME: &str = "Amazon";
pub const FLIPKART_SITE_NAME: &str = "Flipkart";

/// All site ids known to the adapter factory, in registration order.
pub const ALL_SITES: &[&str] = &[AMAZON_SITE, FLIPKART_SITE];
