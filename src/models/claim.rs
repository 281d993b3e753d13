use crate::models::ids::{ClaimId, SourceId};
use crate::numeric::NumericValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimKind {
    Statistic,
    Fact,
    Attribution,
    Event,
    Comparison,
}

/// An atomic factual statement bound to exactly one source and one verbatim
/// supporting excerpt. Immutable once stored, except for explicit
/// administrative correction through the registry WAL.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,
    pub source_id: SourceId,
    pub text: String,
    pub normalized_text: String,
    pub kind: ClaimKind,
    pub numbers: Vec<NumericValue>,
    /// Verbatim excerpt from the source's extracted text.
    pub excerpt: String,
    /// Approximate character offset of the excerpt in the extracted text.
    pub location: Option<usize>,
    /// Dedup identity over (normalized text, source id). Stable across
    /// corrections.
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correction_note: Option<String>,
}

/// A proposed claim that has not yet passed the registry's excerpt gate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CandidateClaim {
    pub source_id: SourceId,
    pub text: String,
    pub kind: ClaimKind,
    pub numbers: Vec<NumericValue>,
    pub excerpt: String,
}

/// Lowercase and collapse whitespace so cosmetic differences do not defeat
/// dedup or text matching.
pub fn normalize_claim_text(text: &str) -> String {
    text.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn claim_content_hash(normalized_text: &str, source_id: SourceId) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized_text.as_bytes());
    hasher.update(b"\x1f");
    hasher.update(source_id.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

impl CandidateClaim {
    pub fn content_hash(&self) -> String {
        claim_content_hash(&normalize_claim_text(&self.text), self.source_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_collapses_case_and_whitespace() {
        assert_eq!(
            normalize_claim_text("  Revenue  GREW\n12%  "),
            "revenue grew 12%"
        );
    }

    #[test]
    fn hash_distinguishes_sources() {
        let norm = normalize_claim_text("revenue grew 12%");
        assert_ne!(
            claim_content_hash(&norm, SourceId(1)),
            claim_content_hash(&norm, SourceId(2))
        );
    }

    #[test]
    fn hash_is_stable_under_cosmetic_difference() {
        let a = claim_content_hash(&normalize_claim_text("Revenue grew 12%"), SourceId(1));
        let b = claim_content_hash(&normalize_claim_text("revenue  grew 12%"), SourceId(1));
        assert_eq!(a, b);
    }
}
