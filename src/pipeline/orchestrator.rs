//! Fixed-order verification state machine: Integrity → Binding → Semantic →
//! Numeric. Later stages assume earlier ones held (binding trusts hashes the
//! integrity stage already checked), so a failed stage skips the rest unless
//! the run is configured for diagnostics.

use crate::config::VerifyConfig;
use crate::error::VerifyError;
use crate::evidence::EvidenceStore;
use crate::models::{
    status_from_issues, Issue, OverallStatus, RunId, RunStamp, SourceCatalog, SourceId,
    StageId, StageResult, StageStatus, VerificationRecord,
};
use crate::pipeline::hash_chain::{chain_hash, skipped_stage_hash, stage_hash, CHAIN_GENESIS};
use crate::pipeline::traits::SemanticOracle;
use crate::pipeline::{binding, integrity, numeric_check, semantic};
use crate::registry::ClaimRegistry;
use crate::scanner;
use chrono::Utc;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

pub struct Pipeline {
    pub catalog: SourceCatalog,
    pub store: Arc<dyn EvidenceStore>,
    pub registry: Arc<ClaimRegistry>,
    pub oracle: Arc<dyn SemanticOracle>,
    pub config: Arc<VerifyConfig>,
}

impl Pipeline {
    /// Run the full pipeline over a finished document. Always yields a
    /// record, including for failed runs; only malformed input aborts before
    /// the first stage. Dropping the future discards all partial results;
    /// nothing is persisted until the caller writes the returned record.
    pub async fn run(&self, document: &str) -> anyhow::Result<VerificationRecord> {
        if document.trim().is_empty() {
            return Err(VerifyError::EmptyDocument.into());
        }
        if self.catalog.is_empty() {
            return Err(VerifyError::EmptyCatalog.into());
        }

        let started_at = Utc::now();
        let statements = scanner::scan(document);
        let all_units = scanner::scan_units(document);
        let referenced = self.referenced_sources(&statements);

        info!(
            statements = statements.len(),
            sources = referenced.len(),
            "starting verification run"
        );

        let mut stages: Vec<StageResult> = Vec::with_capacity(StageId::SEQUENCE.len());
        let mut prev_hash = CHAIN_GENESIS.to_string();
        let mut halted = false;

        for stage in StageId::SEQUENCE {
            if halted {
                let hash = skipped_stage_hash(stage, &prev_hash);
                prev_hash = hash.clone();
                stages.push(StageResult {
                    stage,
                    status: StageStatus::Skipped,
                    issues: Vec::new(),
                    hash,
                    duration_ms: 0,
                });
                continue;
            }

            let started = Instant::now();
            let (hash, issues) = match stage {
                StageId::Integrity => {
                    let (input, report) =
                        integrity::run(&self.catalog, self.store.as_ref(), &referenced);
                    (
                        stage_hash(stage, &input, &report, &prev_hash),
                        report.issues,
                    )
                }
                StageId::Binding => {
                    let (input, report) = binding::run(
                        &statements,
                        &self.catalog,
                        &self.registry,
                        self.store.as_ref(),
                    );
                    (
                        stage_hash(stage, &input, &report, &prev_hash),
                        report.issues,
                    )
                }
                StageId::Semantic => {
                    let (input, report) = semantic::run(
                        &statements,
                        Arc::clone(&self.registry),
                        Arc::clone(&self.oracle),
                        Arc::clone(&self.config),
                    )
                    .await?;
                    (
                        stage_hash(stage, &input, &report, &prev_hash),
                        report.issues,
                    )
                }
                StageId::Numeric => {
                    let (input, report) = numeric_check::run(
                        &all_units,
                        Arc::clone(&self.store),
                        Arc::clone(&self.oracle),
                        Arc::clone(&self.config),
                    )
                    .await?;
                    (
                        stage_hash(stage, &input, &report, &prev_hash),
                        report.issues,
                    )
                }
            };

            let status = status_from_issues(&issues);
            if status == StageStatus::Fail && self.config.stop_on_fail {
                halted = true;
            }
            prev_hash = hash.clone();
            stages.push(StageResult {
                stage,
                status,
                issues,
                hash,
                duration_ms: started.elapsed().as_millis() as u64,
            });
        }

        let chain = chain_hash(stages.iter().map(|s| s.hash.as_str()));
        let overall = OverallStatus::derive(&stages);
        let blocking_issues: Vec<Issue> = stages
            .iter()
            .flat_map(|s| s.issues.iter())
            .filter(|i| i.is_blocking())
            .cloned()
            .collect();

        info!(%overall, blocking = blocking_issues.len(), "verification run finished");

        Ok(VerificationRecord {
            run_id: RunId::new(),
            started_at,
            stages,
            chain_hash: chain,
            overall,
            blocking_issues,
            stamp: RunStamp::current(),
        })
    }

    /// Sources in play: cited directly, or owning a directly cited claim.
    fn referenced_sources(
        &self,
        statements: &[crate::models::DocumentStatement],
    ) -> Vec<SourceId> {
        let mut out: BTreeSet<SourceId> = BTreeSet::new();
        for statement in statements {
            out.extend(statement.cited_sources());
            for claim_id in statement.cited_claims() {
                if let Some(claim) = self.registry.find_by_id(claim_id) {
                    out.insert(claim.source_id);
                }
            }
        }
        out.into_iter().collect()
    }
}

/// Persist a record under `dir`, named by run id. Earlier records are left
/// in place; a run supersedes, never rewrites.
pub fn persist_record(record: &VerificationRecord, dir: impl AsRef<Path>) -> std::io::Result<PathBuf> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.json", record.run_id));
    let file = fs::File::create(&path)?;
    serde_json::to_writer_pretty(file, record)?;
    Ok(path)
}
