use crate::models::ClaimKind;
use crate::numeric::NumericValue;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A semantic judgment with the full required contract. Responses that could
/// not supply `supported`, `confidence`, or `reason` never construct this
/// type; they surface as errors and become `ORACLE_UNAVAILABLE`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OracleJudgment {
    pub supported: bool,
    pub confidence: f32,
    /// Verbatim quote from the candidate evidence. A judgment without one is
    /// a valid response but never a match.
    pub supporting_quote: Option<String>,
    pub reason: String,
}

/// A claim proposed by the oracle extraction path, before the registry's
/// excerpt gate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OracleCandidate {
    pub text: String,
    pub kind: ClaimKind,
    pub numbers: Vec<NumericValue>,
    pub entities: Vec<String>,
    /// Must be verbatim from the source text or the candidate is dropped.
    pub quote: String,
    pub location_hint: Option<String>,
}

/// External semantic judgment capability. Non-deterministic and slow;
/// every call site applies a timeout and treats failure as a non-answer,
/// never as a pass.
#[async_trait]
pub trait SemanticOracle: Send + Sync {
    /// Does the candidate claim (with its excerpt) support the statement?
    async fn judge(
        &self,
        statement: &str,
        claim_text: &str,
        excerpt: &str,
    ) -> anyhow::Result<OracleJudgment>;

    /// Propose claims for source text too unstructured for patterns.
    async fn extract_candidates(&self, source_text: &str)
        -> anyhow::Result<Vec<OracleCandidate>>;

    /// Compute the value the source implies for a claimed number, if the
    /// source carries computable data for it.
    async fn compute_value(
        &self,
        claimed: &NumericValue,
        statement: &str,
        source_text: &str,
    ) -> anyhow::Result<Option<f64>>;
}
