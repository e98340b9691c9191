pub mod amazon;
pub mod flipkart;

pub use amazon::AmazonParser;
pub use flipkart::FlipkartParser;

use once_cell::sync::Lazy;
use regex::Regex;

static PRICE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9][0-9,]*(?:\.[0-9]+)?").expect("price regex is valid")
});

/// Pull a numeric price out of listing text like "₹79,999" or "1,28,900.00".
/// Returns `None` when no digits are present; callers skip such items.
pub(crate) fn parse_price_text(text: &str) -> Option<f64> {
    let m = PRICE_RE.find(text)?;
    m.as_str().replace(',', "").parse::<f64>().ok()
}

/// Encode a query the way the retail sites' search endpoints expect:
/// whitespace runs become a single `+`.
pub(crate) fn query_to_plus(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join("+")
}
