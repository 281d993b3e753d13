use crate::models::ids::{ClaimId, SourceId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of resolving one document statement against the registry.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Verified,
    Unverified,
    Mismatch,
    Skipped,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    DirectReference,
    TextMatch,
    NumericMatch,
    KeywordOverlap,
    OracleJudgment,
    None,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatchResult {
    pub statement_line: usize,
    pub statement_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_id: Option<ClaimId>,
    pub strategy: MatchStrategy,
    pub confidence: f32,
    pub verdict: Verdict,
    pub reason: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pass,
    Warn,
    Fail,
    Skipped,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Blocking,
    Warning,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    HashMismatch,
    FabricationSignature,
    UrlMismatch,
    OrphanCitation,
    Mismatch,
    Unverified,
    NumericDiscrepancy,
    NumericUncited,
    NumericUncomputable,
    OracleUnavailable,
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IssueCode::HashMismatch => "HASH_MISMATCH",
            IssueCode::FabricationSignature => "FABRICATION_SIGNATURE",
            IssueCode::UrlMismatch => "URL_MISMATCH",
            IssueCode::OrphanCitation => "ORPHAN_CITATION",
            IssueCode::Mismatch => "MISMATCH",
            IssueCode::Unverified => "UNVERIFIED",
            IssueCode::NumericDiscrepancy => "NUMERIC_DISCREPANCY",
            IssueCode::NumericUncited => "NUMERIC_UNCITED",
            IssueCode::NumericUncomputable => "NUMERIC_UNCOMPUTABLE",
            IssueCode::OracleUnavailable => "ORACLE_UNAVAILABLE",
        };
        write!(f, "{s}")
    }
}

/// One defect found by a stage, with enough context to drive a fix without
/// re-deriving the problem.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Issue {
    pub code: IssueCode,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<SourceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub found: Option<String>,
    pub detail: String,
}

impl Issue {
    pub fn blocking(code: IssueCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            severity: Severity::Blocking,
            source_id: None,
            statement: None,
            expected: None,
            found: None,
            detail: detail.into(),
        }
    }

    pub fn warning(code: IssueCode, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::blocking(code, detail)
        }
    }

    pub fn with_source(mut self, id: SourceId) -> Self {
        self.source_id = Some(id);
        self
    }

    pub fn with_statement(mut self, text: impl Into<String>) -> Self {
        self.statement = Some(text.into());
        self
    }

    pub fn with_expected_found(
        mut self,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        self.expected = Some(expected.into());
        self.found = Some(found.into());
        self
    }

    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Blocking
    }
}

/// Derive a stage status from its issue list.
pub fn status_from_issues(issues: &[Issue]) -> StageStatus {
    if issues.iter().any(Issue::is_blocking) {
        StageStatus::Fail
    } else if !issues.is_empty() {
        StageStatus::Warn
    } else {
        StageStatus::Pass
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocking_issue_fails_the_stage() {
        let issues = vec![
            Issue::warning(IssueCode::Unverified, "no candidate met threshold"),
            Issue::blocking(IssueCode::HashMismatch, "hash drift"),
        ];
        assert_eq!(status_from_issues(&issues), StageStatus::Fail);
    }

    #[test]
    fn warnings_alone_warn() {
        let issues = vec![Issue::warning(IssueCode::OracleUnavailable, "timeout")];
        assert_eq!(status_from_issues(&issues), StageStatus::Warn);
    }

    #[test]
    fn no_issues_pass() {
        assert_eq!(status_from_issues(&[]), StageStatus::Pass);
    }

    #[test]
    fn issue_codes_serialize_screaming() {
        let json = serde_json::to_string(&IssueCode::NumericDiscrepancy).unwrap();
        assert_eq!(json, "\"NUMERIC_DISCREPANCY\"");
    }
}
