//! Deterministic oracle used offline and in tests. Its default answers are
//! deliberately conservative: nothing is supported, nothing is computable,
//! so verification never passes on the oracle's say-so without real wiring.

use crate::numeric::NumericValue;
use crate::pipeline::traits::{OracleCandidate, OracleJudgment, SemanticOracle};
use async_trait::async_trait;

#[derive(Clone, Debug, Default)]
pub struct MockOracle {
    supported: bool,
    confidence: f32,
    candidates: Vec<OracleCandidate>,
    computed_value: Option<f64>,
}

impl MockOracle {
    pub fn supporting(confidence: f32) -> Self {
        Self {
            supported: true,
            confidence,
            ..Self::default()
        }
    }

    pub fn with_candidates(mut self, candidates: Vec<OracleCandidate>) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn with_computed_value(mut self, value: f64) -> Self {
        self.computed_value = Some(value);
        self
    }
}

#[async_trait]
impl SemanticOracle for MockOracle {
    async fn judge(
        &self,
        _statement: &str,
        _claim_text: &str,
        excerpt: &str,
    ) -> anyhow::Result<OracleJudgment> {
        Ok(OracleJudgment {
            supported: self.supported,
            confidence: self.confidence,
            supporting_quote: if self.supported {
                Some(excerpt.to_string())
            } else {
                None
            },
            reason: "mock oracle".to_string(),
        })
    }

    async fn extract_candidates(
        &self,
        _source_text: &str,
    ) -> anyhow::Result<Vec<OracleCandidate>> {
        Ok(self.candidates.clone())
    }

    async fn compute_value(
        &self,
        _claimed: &NumericValue,
        _statement: &str,
        _source_text: &str,
    ) -> anyhow::Result<Option<f64>> {
        Ok(self.computed_value)
    }
}

/// An oracle that always errors, for exercising unavailability paths.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnavailableOracle;

#[async_trait]
impl SemanticOracle for UnavailableOracle {
    async fn judge(
        &self,
        _statement: &str,
        _claim_text: &str,
        _excerpt: &str,
    ) -> anyhow::Result<OracleJudgment> {
        anyhow::bail!("oracle unavailable")
    }

    async fn extract_candidates(
        &self,
        _source_text: &str,
    ) -> anyhow::Result<Vec<OracleCandidate>> {
        anyhow::bail!("oracle unavailable")
    }

    async fn compute_value(
        &self,
        _claimed: &NumericValue,
        _statement: &str,
        _source_text: &str,
    ) -> anyhow::Result<Option<f64>> {
        anyhow::bail!("oracle unavailable")
    }
}
