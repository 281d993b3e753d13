use crate::models::ids::RunId;
use crate::models::verify::{Issue, StageStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    Integrity,
    Binding,
    Semantic,
    Numeric,
}

impl StageId {
    /// The fixed execution order.
    pub const SEQUENCE: [StageId; 4] = [
        StageId::Integrity,
        StageId::Binding,
        StageId::Semantic,
        StageId::Numeric,
    ];
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StageId::Integrity => "integrity",
            StageId::Binding => "binding",
            StageId::Semantic => "semantic",
            StageId::Numeric => "numeric",
        };
        write!(f, "{s}")
    }
}

/// Output of one pipeline stage. The hash covers the stage name, its
/// canonical inputs and outputs, and the previous stage's hash; `duration_ms`
/// is operator telemetry and is excluded so re-runs reproduce hashes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: StageId,
    pub status: StageStatus,
    pub issues: Vec<Issue>,
    pub hash: String,
    pub duration_ms: u64,
}

/// Overall status is ordered so a publish gate can compare against a floor.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallStatus {
    Failed = 0,
    Incomplete = 1,
    NeedsReview = 2,
    Verified = 3,
}

impl OverallStatus {
    /// FAILED if any stage failed; else NEEDS_REVIEW if any warned; else
    /// VERIFIED when every stage passed; else INCOMPLETE.
    pub fn derive(stages: &[StageResult]) -> Self {
        if stages.iter().any(|s| s.status == StageStatus::Fail) {
            OverallStatus::Failed
        } else if stages.iter().any(|s| s.status == StageStatus::Warn) {
            OverallStatus::NeedsReview
        } else if !stages.is_empty() && stages.iter().all(|s| s.status == StageStatus::Pass) {
            OverallStatus::Verified
        } else {
            OverallStatus::Incomplete
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OverallStatus::Failed => "FAILED",
            OverallStatus::Incomplete => "INCOMPLETE",
            OverallStatus::NeedsReview => "NEEDS_REVIEW",
            OverallStatus::Verified => "VERIFIED",
        };
        write!(f, "{s}")
    }
}

/// Which tool build produced a record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunStamp {
    pub tool: String,
    pub version: String,
}

impl RunStamp {
    pub fn current() -> Self {
        Self {
            tool: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// The final artifact of a verification run. Produced fresh each run;
/// earlier records are superseded, never mutated.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub stages: Vec<StageResult>,
    pub chain_hash: String,
    pub overall: OverallStatus,
    pub blocking_issues: Vec<Issue>,
    pub stamp: RunStamp,
}

impl VerificationRecord {
    pub fn blocking_issue_count(&self) -> usize {
        self.blocking_issues.len()
    }
}

/// Decides whether a record's status clears publication.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct PublishGate {
    pub min_status: OverallStatus,
}

impl Default for PublishGate {
    fn default() -> Self {
        Self {
            min_status: OverallStatus::Verified,
        }
    }
}

impl PublishGate {
    pub fn allow(&self, status: OverallStatus) -> bool {
        status >= self.min_status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::verify::IssueCode;

    fn stage(id: StageId, status: StageStatus) -> StageResult {
        StageResult {
            stage: id,
            status,
            issues: Vec::new(),
            hash: String::new(),
            duration_ms: 0,
        }
    }

    #[test]
    fn all_pass_is_verified() {
        let stages: Vec<StageResult> = StageId::SEQUENCE
            .iter()
            .map(|s| stage(*s, StageStatus::Pass))
            .collect();
        assert_eq!(OverallStatus::derive(&stages), OverallStatus::Verified);
    }

    #[test]
    fn any_fail_wins() {
        let stages = vec![
            stage(StageId::Integrity, StageStatus::Fail),
            stage(StageId::Binding, StageStatus::Skipped),
        ];
        assert_eq!(OverallStatus::derive(&stages), OverallStatus::Failed);
    }

    #[test]
    fn warn_without_fail_needs_review() {
        let stages = vec![
            stage(StageId::Integrity, StageStatus::Pass),
            stage(StageId::Semantic, StageStatus::Warn),
        ];
        assert_eq!(OverallStatus::derive(&stages), OverallStatus::NeedsReview);
    }

    #[test]
    fn skipped_without_fail_is_incomplete() {
        let stages = vec![
            stage(StageId::Integrity, StageStatus::Pass),
            stage(StageId::Binding, StageStatus::Skipped),
        ];
        assert_eq!(OverallStatus::derive(&stages), OverallStatus::Incomplete);
    }

    #[test]
    fn default_gate_only_clears_verified() {
        let gate = PublishGate::default();
        assert!(gate.allow(OverallStatus::Verified));
        assert!(!gate.allow(OverallStatus::NeedsReview));
        assert!(!gate.allow(OverallStatus::Failed));

        let lenient = PublishGate {
            min_status: OverallStatus::NeedsReview,
        };
        assert!(lenient.allow(OverallStatus::NeedsReview));
        assert!(!lenient.allow(OverallStatus::Incomplete));
    }

    #[test]
    fn record_counts_blocking_issues() {
        let record = VerificationRecord {
            run_id: RunId::new(),
            started_at: Utc::now(),
            stages: Vec::new(),
            chain_hash: String::new(),
            overall: OverallStatus::Failed,
            blocking_issues: vec![Issue::blocking(IssueCode::HashMismatch, "drift")],
            stamp: RunStamp::current(),
        };
        assert_eq!(record.blocking_issue_count(), 1);
    }
}
