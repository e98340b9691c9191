use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A listing as extracted by one site adapter. Ephemeral: created per fetch,
/// discarded once matched into a canonical product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawOffer {
    pub site: String,
    pub product_title: String,
    pub price: f64,
    pub currency: String,
    pub url: String,
    pub fetched_at: DateTime<Utc>,
}

/// A raw offer after title canonicalization and currency conversion.
///
/// `normalized_title` is the whitespace-stripped match key and is a pure
/// function of `product_title`; `price_in_base_currency` is always >= 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedOffer {
    pub site: String,
    pub product_title: String,
    pub normalized_title: String,
    pub price: f64,
    pub currency: String,
    pub price_in_base_currency: f64,
    pub url: String,
    pub fetched_at: DateTime<Utc>,
}

/// Review sentiment counts supplied by the external reviews collaborator.
/// The core never computes these, it only carries them.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SentimentSummary {
    pub positive: u32,
    pub negative: u32,
    pub neutral: u32,
}

/// The reconciled, cross-site representation of one physical product.
///
/// `id` is a transient in-memory handle; durable identifiers are assigned by
/// the persistence layer. `offers` reflects arrival order from the adapters,
/// which is not stable across runs — consumers should rely on set membership
/// and `best_offer`, not position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalProduct {
    pub id: Uuid,
    pub canonical_title: String,
    pub offers: Vec<NormalizedOffer>,
    pub min_price: f64,
    pub max_price: f64,
    pub best_offer: NormalizedOffer,
    pub sentiment: Option<SentimentSummary>,
}

impl CanonicalProduct {
    /// Attach a precomputed sentiment summary to this product.
    pub fn with_sentiment(mut self, sentiment: SentimentSummary) -> Self {
        self.sentiment = Some(sentiment);
        self
    }
}
