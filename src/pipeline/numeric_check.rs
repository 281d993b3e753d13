//! Numeric stage: every quantitative assertion in the document checked
//! against the cited source's data, pattern-based first with the oracle as
//! fallback. Missing data is a warning; a computed disagreement blocks.

use crate::config::VerifyConfig;
use crate::evidence::EvidenceStore;
use crate::extract::extract_numbers;
use crate::models::{DocumentStatement, Issue, IssueCode, SourceId};
use crate::numeric::{Comparison, NumericValue, Unit};
use crate::pipeline::traits::SemanticOracle;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NumericInput {
    pub claims: Vec<NumericClaimRef>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NumericClaimRef {
    pub statement_line: usize,
    pub claimed: NumericValue,
    pub cited_sources: Vec<SourceId>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckOutcome {
    /// The number sits in a sentence with no citation at all.
    Uncited,
    /// No cited source carries computable data for this claim.
    Uncomputable,
    Pass { source: SourceId, comparison: Comparison },
    Discrepancy { source: SourceId, comparison: Comparison },
    OracleFailed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NumericCheck {
    pub statement_line: usize,
    pub statement_text: String,
    pub claimed: NumericValue,
    pub result: CheckOutcome,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NumericReport {
    pub checks: Vec<NumericCheck>,
    pub issues: Vec<Issue>,
}

pub async fn run(
    statements: &[DocumentStatement],
    store: Arc<dyn EvidenceStore>,
    oracle: Arc<dyn SemanticOracle>,
    config: Arc<VerifyConfig>,
) -> anyhow::Result<(NumericInput, NumericReport)> {
    let mut work: Vec<(DocumentStatement, NumericValue)> = Vec::new();
    for statement in statements {
        for number in &statement.numbers {
            work.push((statement.clone(), number.clone()));
        }
    }

    let input = NumericInput {
        claims: work
            .iter()
            .map(|(s, n)| NumericClaimRef {
                statement_line: s.line,
                claimed: n.clone(),
                cited_sources: s.cited_sources(),
            })
            .collect(),
    };

    let semaphore = Arc::new(Semaphore::new(config.worker_limit.max(1)));
    let mut set = JoinSet::new();
    for (idx, (statement, claimed)) in work.iter().cloned().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let store = Arc::clone(&store);
        let oracle = Arc::clone(&oracle);
        let config = Arc::clone(&config);
        set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore");
            let check = check_one(&statement, claimed, &store, &oracle, &config).await;
            (idx, check)
        });
    }

    let mut slots: Vec<Option<NumericCheck>> = vec![None; work.len()];
    while let Some(joined) = set.join_next().await {
        let (idx, check) = joined.context("numeric worker panicked")?;
        slots[idx] = Some(check);
    }

    let mut checks = Vec::with_capacity(slots.len());
    let mut issues = Vec::new();
    for slot in slots {
        let check = slot.expect("every numeric claim produced a check");
        if let Some(issue) = issue_for(&check, &config) {
            issues.push(issue);
        }
        checks.push(check);
    }

    debug!(checks = checks.len(), issues = issues.len(), "numeric stage done");
    Ok((input, NumericReport { checks, issues }))
}

async fn check_one(
    statement: &DocumentStatement,
    claimed: NumericValue,
    store: &Arc<dyn EvidenceStore>,
    oracle: &Arc<dyn SemanticOracle>,
    config: &VerifyConfig,
) -> NumericCheck {
    let cited = statement.cited_sources();
    let base = |result: CheckOutcome| NumericCheck {
        statement_line: statement.line,
        statement_text: statement.text.clone(),
        claimed: claimed.clone(),
        result,
    };

    if cited.is_empty() {
        return base(CheckOutcome::Uncited);
    }

    // Pattern comparison against each cited source's extracted numbers; the
    // first source carrying unit-compatible data decides.
    for source_id in &cited {
        let Ok(text) = store.extracted_text(*source_id) else {
            continue;
        };
        let candidates: Vec<NumericValue> = extract_numbers(&text)
            .into_iter()
            .filter(|n| n.unit.compatible(&claimed.unit))
            .collect();
        if candidates.is_empty() {
            continue;
        }
        let computed = candidates
            .iter()
            .map(|n| n.value)
            .min_by(|a, b| {
                (claimed.value - a).abs().total_cmp(&(claimed.value - b).abs())
            })
            .expect("non-empty candidates");
        let comparison = config.tolerance.compare(&claimed, computed);
        return if comparison.within_tolerance {
            base(CheckOutcome::Pass {
                source: *source_id,
                comparison,
            })
        } else {
            base(CheckOutcome::Discrepancy {
                source: *source_id,
                comparison,
            })
        };
    }

    // No pattern-extractable data anywhere; ask the oracle to compute from
    // the first cited source's full text.
    let source_id = cited[0];
    let Ok(text) = store.extracted_text(source_id) else {
        return base(CheckOutcome::Uncomputable);
    };
    match tokio::time::timeout(
        config.oracle_timeout,
        oracle.compute_value(&claimed, &statement.text, &text),
    )
    .await
    {
        Ok(Ok(Some(computed))) => {
            let comparison = config.tolerance.compare(&claimed, computed);
            if comparison.within_tolerance {
                base(CheckOutcome::Pass {
                    source: source_id,
                    comparison,
                })
            } else {
                base(CheckOutcome::Discrepancy {
                    source: source_id,
                    comparison,
                })
            }
        }
        Ok(Ok(None)) => base(CheckOutcome::Uncomputable),
        Ok(Err(_)) | Err(_) => base(CheckOutcome::OracleFailed),
    }
}

fn issue_for(check: &NumericCheck, _config: &VerifyConfig) -> Option<Issue> {
    match &check.result {
        CheckOutcome::Pass { .. } => None,
        CheckOutcome::Uncited => Some(
            Issue::warning(
                IssueCode::NumericUncited,
                format!("quantitative assertion {} has no citation", describe(&check.claimed)),
            )
            .with_statement(check.statement_text.clone()),
        ),
        CheckOutcome::Uncomputable => Some(
            Issue::warning(
                IssueCode::NumericUncomputable,
                format!(
                    "no cited source carries computable data for {}",
                    describe(&check.claimed)
                ),
            )
            .with_statement(check.statement_text.clone()),
        ),
        CheckOutcome::OracleFailed => Some(
            Issue::warning(IssueCode::OracleUnavailable, "numeric oracle check failed")
                .with_statement(check.statement_text.clone()),
        ),
        CheckOutcome::Discrepancy { source, comparison } => {
            let relative = comparison
                .discrepancy_relative
                .map(|r| format!(", {:.1}% relative", r * 100.0))
                .unwrap_or_default();
            Some(
                Issue::blocking(
                    IssueCode::NumericDiscrepancy,
                    format!(
                        "claimed {} but source data computes to {} (discrepancy {:.2}{relative})",
                        comparison.claimed, comparison.computed, comparison.discrepancy
                    ),
                )
                .with_source(*source)
                .with_statement(check.statement_text.clone())
                .with_expected_found(
                    comparison.computed.to_string(),
                    comparison.claimed.to_string(),
                ),
            )
        }
    }
}

fn describe(value: &NumericValue) -> String {
    match &value.unit {
        Unit::Percent => format!("{}%", value.value),
        Unit::PercentagePoint => format!("{} percentage points", value.value),
        Unit::Currency { symbol } => format!("{symbol}{}", value.value),
        Unit::Count { noun } => format!("{} {noun}", value.value),
        _ => value.value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::{fixtures, FsEvidenceStore};
    use crate::pipeline::mock::MockOracle;
    use crate::scanner;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    async fn run_stage(doc: &str, source_text: &str, oracle: MockOracle) -> NumericReport {
        let dir = TempDir::new().unwrap();
        let at = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
        fixtures::write_capture(
            dir.path(),
            SourceId(1),
            "https://one.example/report",
            at,
            b"raw",
            source_text,
        );
        let statements = scanner::scan_units(doc);
        let (_input, report) = run(
            &statements,
            Arc::new(FsEvidenceStore::new(dir.path())),
            Arc::new(oracle),
            Arc::new(VerifyConfig::default()),
        )
        .await
        .unwrap();
        report
    }

    #[tokio::test]
    async fn matching_percentage_passes() {
        let report = run_stage(
            "Adoption reached 58% last year [S001].",
            "Survey data shows adoption of 58% across the cohort.",
            MockOracle::default(),
        )
        .await;
        assert_eq!(report.checks.len(), 1);
        assert!(matches!(report.checks[0].result, CheckOutcome::Pass { .. }));
        assert!(report.issues.is_empty());
    }

    #[tokio::test]
    async fn four_point_drift_fails_relative_tolerance() {
        let report = run_stage(
            "Adoption reached 62% last year [S001].",
            "Survey data shows adoption of 58% across the cohort.",
            MockOracle::default(),
        )
        .await;
        let CheckOutcome::Discrepancy { comparison, .. } = &report.checks[0].result else {
            panic!("expected discrepancy");
        };
        assert!((comparison.discrepancy - 4.0).abs() < 1e-9);
        let issue = &report.issues[0];
        assert_eq!(issue.code, IssueCode::NumericDiscrepancy);
        assert!(issue.is_blocking());
        assert_eq!(issue.expected.as_deref(), Some("58"));
        assert_eq!(issue.found.as_deref(), Some("62"));
    }

    #[tokio::test]
    async fn uncited_numbers_warn_only() {
        let report = run_stage(
            "Adoption reached 62% last year.",
            "irrelevant",
            MockOracle::default(),
        )
        .await;
        assert!(matches!(report.checks[0].result, CheckOutcome::Uncited));
        assert!(!report.issues[0].is_blocking());
        assert_eq!(report.issues[0].code, IssueCode::NumericUncited);
    }

    #[tokio::test]
    async fn oracle_fallback_computes_when_patterns_cannot() {
        let report = run_stage(
            "Adoption reached 62% last year [S001].",
            "The cohort had 580 adopters among 1000 respondents overall.",
            MockOracle::default().with_computed_value(58.0),
        )
        .await;
        // 580/1000 respondents is count-unit data, incompatible with a
        // percent claim, so the pattern path defers to the oracle.
        let CheckOutcome::Discrepancy { comparison, .. } = &report.checks[0].result else {
            panic!("expected discrepancy via oracle, got {:?}", report.checks[0].result);
        };
        assert_eq!(comparison.computed, 58.0);
    }

    #[tokio::test]
    async fn no_computable_data_is_a_warning() {
        let report = run_stage(
            "Adoption reached 60% last year [S001].",
            "Qualitative commentary with no figures at all.",
            MockOracle::default(),
        )
        .await;
        assert!(matches!(report.checks[0].result, CheckOutcome::Uncomputable));
        assert_eq!(report.issues[0].code, IssueCode::NumericUncomputable);
        assert!(!report.issues[0].is_blocking());
    }
}
