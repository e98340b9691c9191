use shopper_core::domain::NormalizedOffer;
use tracing::debug;

use crate::observability::metrics;

/// Similarity score in `[0, 100]` between two match keys, based on the
/// normalized Levenshtein ratio. Inputs are expected to already be in
/// `normalize_title` form; the score is exact-match 100, disjoint 0.
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b) * 100.0
}

/// A group of offers resolved to the same physical product.
///
/// The representative is the founding offer's match key; every member scored
/// at or above the threshold against it when it joined.
#[derive(Debug, Clone)]
pub struct OfferCluster {
    pub representative: String,
    pub offers: Vec<NormalizedOffer>,
}

/// Greedy single-pass clustering over offers in arrival order.
///
/// Each offer is scored against the representative of every existing cluster
/// and joins the best-scoring one at or above `threshold`; exact score ties
/// go to the earliest-created cluster. With no qualifying cluster the offer
/// founds a new one.
///
/// Deliberately order-sensitive: adapter completion order feeds arrival
/// order, so clustering at the threshold boundary can differ across runs.
/// There is no transitive merging of clusters that later prove similar.
pub fn cluster_offers(offers: Vec<NormalizedOffer>, threshold: f64) -> Vec<OfferCluster> {
    let offer_count = offers.len();
    let mut clusters: Vec<OfferCluster> = Vec::new();

    for offer in offers {
        let mut best: Option<(usize, f64)> = None;
        for (index, cluster) in clusters.iter().enumerate() {
            let score = similarity(&offer.normalized_title, &cluster.representative);
            if score < threshold {
                continue;
            }
            // Strict > keeps the earliest cluster on exact ties
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((index, score)),
            }
        }

        match best {
            Some((index, score)) => {
                debug!(
                    title = %offer.normalized_title,
                    cluster = index,
                    score,
                    "offer joined existing cluster"
                );
                clusters[index].offers.push(offer);
            }
            None => {
                debug!(title = %offer.normalized_title, "offer founded new cluster");
                clusters.push(OfferCluster {
                    representative: offer.normalized_title.clone(),
                    offers: vec![offer],
                });
            }
        }
    }

    metrics::matching::offers_clustered(offer_count);
    metrics::matching::clusters_formed(clusters.len());
    clusters
}
