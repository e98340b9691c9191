use std::collections::HashMap;

use shopper_core::common::error::ConversionError;
use shopper_core::domain::{NormalizedOffer, RawOffer};

/// Canonicalize a title into the match key used for similarity comparison.
///
/// Lower-cases and keeps only `[a-z0-9]`: whitespace, hyphens, underscores
/// and all punctuation are removed entirely. Pure and idempotent — applying
/// it to its own output is a no-op.
pub fn normalize_title(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Human-readable canonical form: trimmed, with internal whitespace runs
/// collapsed to single spaces. This is what gets stored as a product title;
/// matching never uses it.
pub fn display_title(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Pluggable exchange-rate lookup. Single-currency deployments leave it
/// empty and rely on the identity fast path.
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    rates: HashMap<(String, String), f64>,
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, from: &str, to: &str, rate: f64) {
        self.rates
            .insert((from.to_uppercase(), to.to_uppercase()), rate);
    }

    /// Convert `value` from one currency to another. Identity when the
    /// currencies match (case-insensitive); otherwise a table lookup that
    /// fails with `ConversionError::UnknownRate` for unseen pairs.
    pub fn convert(&self, value: f64, from: &str, to: &str) -> Result<f64, ConversionError> {
        if from.eq_ignore_ascii_case(to) {
            return Ok(value);
        }
        let key = (from.to_uppercase(), to.to_uppercase());
        match self.rates.get(&key) {
            Some(rate) => Ok(value * rate),
            None => Err(ConversionError::UnknownRate {
                from: from.to_string(),
                to: to.to_string(),
            }),
        }
    }
}

/// Derive a `NormalizedOffer` from a raw one: compute the match key and the
/// price in the base currency. A missing exchange rate fails this offer
/// alone; callers skip it and keep processing the batch.
pub fn normalize_offer(
    raw: RawOffer,
    rates: &RateTable,
    base_currency: &str,
) -> Result<NormalizedOffer, ConversionError> {
    let price_in_base_currency = rates.convert(raw.price, &raw.currency, base_currency)?;
    Ok(NormalizedOffer {
        normalized_title: normalize_title(&raw.product_title),
        product_title: display_title(&raw.product_title),
        site: raw.site,
        price: raw.price,
        currency: raw.currency,
        price_in_base_currency,
        url: raw.url,
        fetched_at: raw.fetched_at,
    })
}
