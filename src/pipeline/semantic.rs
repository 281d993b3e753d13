//! Semantic stage: every document statement resolved against the registry.
//! Statements are independent, so matching fans out over a bounded worker
//! pool; oracle adjudication is the only suspending step.

use crate::config::VerifyConfig;
use crate::matcher::Matcher;
use crate::models::{
    DocumentStatement, Issue, IssueCode, MatchResult, MatchStrategy, Severity, Verdict,
};
use crate::pipeline::traits::SemanticOracle;
use crate::registry::{locate_excerpt, ClaimRegistry};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SemanticInput {
    pub statements: Vec<DocumentStatement>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SemanticReport {
    pub matches: Vec<MatchResult>,
    pub issues: Vec<Issue>,
}

pub async fn run(
    statements: &[DocumentStatement],
    registry: Arc<ClaimRegistry>,
    oracle: Arc<dyn SemanticOracle>,
    config: Arc<VerifyConfig>,
) -> anyhow::Result<(SemanticInput, SemanticReport)> {
    let input = SemanticInput {
        statements: statements.to_vec(),
    };

    let semaphore = Arc::new(Semaphore::new(config.worker_limit.max(1)));
    let mut set = JoinSet::new();

    for (idx, statement) in statements.iter().cloned().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let registry = Arc::clone(&registry);
        let oracle = Arc::clone(&oracle);
        let config = Arc::clone(&config);
        set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore");
            let (result, issues) = match_one(&statement, &registry, &oracle, &config).await;
            (idx, result, issues)
        });
    }

    let mut slots: Vec<Option<(MatchResult, Vec<Issue>)>> = vec![None; statements.len()];
    while let Some(joined) = set.join_next().await {
        let (idx, result, issues) = joined.context("semantic worker panicked")?;
        slots[idx] = Some((result, issues));
    }

    // Re-ordered by statement index so output is deterministic regardless of
    // completion order.
    let mut matches = Vec::with_capacity(slots.len());
    let mut issues = Vec::new();
    for slot in slots {
        let (result, mut slot_issues) = slot.expect("every statement produced a result");
        matches.push(result);
        issues.append(&mut slot_issues);
    }

    debug!(statements = matches.len(), issues = issues.len(), "semantic stage done");
    Ok((input, SemanticReport { matches, issues }))
}

async fn match_one(
    statement: &DocumentStatement,
    registry: &ClaimRegistry,
    oracle: &Arc<dyn SemanticOracle>,
    config: &VerifyConfig,
) -> (MatchResult, Vec<Issue>) {
    let matcher = Matcher::new(registry, config);
    let outcome = matcher.match_statement(statement);
    let mut result = outcome.result;
    let mut issues = Vec::new();

    // Scoring could not decide; let the oracle adjudicate the best rejected
    // candidate under a timeout. A timeout or failure is a non-match.
    if result.verdict == Verdict::Unverified {
        if let Some(candidate) = outcome.runner_up {
            match tokio::time::timeout(
                config.oracle_timeout,
                oracle.judge(&statement.text, &candidate.text, &candidate.excerpt),
            )
            .await
            {
                Ok(Ok(judgment)) => {
                    let quote_ok = judgment
                        .supporting_quote
                        .as_deref()
                        .is_some_and(|q| locate_excerpt(&candidate.excerpt, q).is_some()
                            || locate_excerpt(&candidate.text, q).is_some());
                    if judgment.supported
                        && quote_ok
                        && judgment.confidence >= config.oracle_confidence_floor
                    {
                        let cited = statement.cited_sources().contains(&candidate.source_id);
                        result = MatchResult {
                            statement_line: statement.line,
                            statement_text: statement.text.clone(),
                            claim_id: Some(candidate.id),
                            strategy: MatchStrategy::OracleJudgment,
                            confidence: judgment.confidence,
                            verdict: if cited {
                                Verdict::Verified
                            } else {
                                Verdict::Mismatch
                            },
                            reason: judgment.reason,
                        };
                    }
                }
                Ok(Err(err)) => {
                    issues.push(
                        Issue::warning(
                            IssueCode::OracleUnavailable,
                            format!("oracle judgment failed: {err}"),
                        )
                        .with_statement(statement.text.clone()),
                    );
                }
                Err(_) => {
                    issues.push(
                        Issue::warning(
                            IssueCode::OracleUnavailable,
                            "oracle judgment timed out",
                        )
                        .with_statement(statement.text.clone()),
                    );
                }
            }
        }
    }

    match result.verdict {
        Verdict::Unverified => {
            issues.push(
                Issue::warning(
                    IssueCode::Unverified,
                    "no registry claim supports this statement; reword, find a source, or remove",
                )
                .with_statement(statement.text.clone()),
            );
        }
        Verdict::Mismatch => {
            let severity = if config.mismatch_blocking {
                Severity::Blocking
            } else {
                Severity::Warning
            };
            let mut issue = Issue {
                severity,
                ..Issue::blocking(
                    IssueCode::Mismatch,
                    format!(
                        "statement matches claim {} from an uncited source",
                        result
                            .claim_id
                            .map(|id| id.to_string())
                            .unwrap_or_else(|| "?".into())
                    ),
                )
            };
            issue.statement = Some(statement.text.clone());
            if let Some(claim_id) = result.claim_id {
                if let Some(claim) = registry.find_by_id(claim_id) {
                    issue.source_id = Some(claim.source_id);
                }
            }
            issues.push(issue);
        }
        Verdict::Verified | Verdict::Skipped => {}
    }

    (result, issues)
}
