//! Oracle-path claim extraction. The oracle proposes; the verbatim-quote
//! check and the registry's excerpt gate dispose.

use crate::models::{CandidateClaim, SourceId};
use crate::pipeline::traits::SemanticOracle;
use crate::registry::locate_excerpt;
use std::time::Duration;
use tracing::warn;

/// Ask the oracle for candidate claims over unstructured source text. A
/// malformed response fails the whole call; a candidate whose quote is not
/// verbatim in the source is dropped while the rest are kept.
pub async fn oracle_candidates(
    oracle: &dyn SemanticOracle,
    source_id: SourceId,
    source_text: &str,
    timeout: Duration,
) -> anyhow::Result<Vec<CandidateClaim>> {
    let proposed = tokio::time::timeout(timeout, oracle.extract_candidates(source_text))
        .await
        .map_err(|_| anyhow::anyhow!("oracle extraction timed out for {source_id}"))??;

    let mut candidates = Vec::new();
    for candidate in proposed {
        if locate_excerpt(source_text, &candidate.quote).is_none() {
            warn!(
                source = %source_id,
                quote = %candidate.quote,
                "dropping oracle candidate: quote is not verbatim in source"
            );
            continue;
        }
        candidates.push(CandidateClaim {
            source_id,
            text: candidate.text,
            kind: candidate.kind,
            numbers: candidate.numbers,
            excerpt: candidate.quote,
        });
    }
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClaimKind;
    use crate::pipeline::mock::MockOracle;
    use crate::pipeline::traits::OracleCandidate;

    #[tokio::test]
    async fn non_verbatim_quotes_are_dropped_individually() {
        let oracle = MockOracle::default().with_candidates(vec![
            OracleCandidate {
                text: "Revenue grew 12%".into(),
                kind: ClaimKind::Statistic,
                numbers: Vec::new(),
                entities: vec!["Acme".into()],
                quote: "Revenue grew 12% in fiscal 2025".into(),
                location_hint: None,
            },
            OracleCandidate {
                text: "Margins collapsed".into(),
                kind: ClaimKind::Fact,
                numbers: Vec::new(),
                entities: Vec::new(),
                quote: "this sentence is invented".into(),
                location_hint: None,
            },
        ]);

        let out = oracle_candidates(
            &oracle,
            SourceId(1),
            "Revenue grew 12% in fiscal 2025, the company said.",
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].excerpt, "Revenue grew 12% in fiscal 2025");
    }
}
