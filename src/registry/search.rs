use crate::matcher::{content_words, jaccard};
use crate::models::Claim;
use crate::registry::engine::ClaimRegistry;

/// Keyword search over the registry, ranked by content-word overlap with the
/// query. Zero-overlap claims are dropped.
pub fn search(registry: &ClaimRegistry, query: &str) -> Vec<(Claim, f32)> {
    let query_words = content_words(query);
    if query_words.is_empty() {
        return Vec::new();
    }
    let mut hits: Vec<(Claim, f32)> = registry
        .all_claims()
        .into_iter()
        .filter_map(|claim| {
            let score = jaccard(&query_words, &content_words(&claim.normalized_text));
            if score > 0.0 {
                Some((claim, score))
            } else {
                None
            }
        })
        .collect();
    hits.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.id.cmp(&b.0.id)));
    hits
}
