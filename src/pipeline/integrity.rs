//! Integrity stage: recomputes evidence hashes and screens for fabrication
//! signatures. A registry entry can look structurally valid while having
//! been fabricated by summarizing several sources as one; each heuristic
//! here targets a distinct fingerprint of that.

use crate::evidence::EvidenceStore;
use crate::models::{
    Issue, IssueCode, SourceCatalog, SourceId, SourceKind, SourceRecord,
};
use crate::pipeline::hash_chain::sha256_hex;
use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

/// Openers typical of synthesized rather than captured content.
const SYNTHESIS_OPENERS: [&str; 6] = [
    "based on multiple sources",
    "this document synthesizes",
    "compiled from",
    "synthesis of",
    "aggregated from",
    "this summary combines",
];

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IntegrityInput {
    pub sources: Vec<IntegritySourceRef>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IntegritySourceRef {
    pub id: SourceId,
    pub recorded_hash: String,
    pub url: Url,
    pub retrieved_at: DateTime<Utc>,
    pub kind: SourceKind,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub checked: Vec<SourceId>,
    pub issues: Vec<Issue>,
}

pub fn run(
    catalog: &SourceCatalog,
    store: &dyn EvidenceStore,
    referenced: &[SourceId],
) -> (IntegrityInput, IntegrityReport) {
    let input = IntegrityInput {
        sources: referenced
            .iter()
            .filter_map(|id| catalog.get(*id))
            .map(|r| IntegritySourceRef {
                id: r.id,
                recorded_hash: r.sha256_hex.clone(),
                url: r.url.clone(),
                retrieved_at: r.retrieved_at,
                kind: r.kind,
            })
            .collect(),
    };

    let mut issues = Vec::new();
    let mut checked = Vec::new();

    for id in referenced {
        let Some(record) = catalog.get(*id) else {
            // Missing catalog entries are the binding stage's orphan case.
            continue;
        };
        checked.push(*id);
        check_source(record, store, &mut issues);
    }

    debug!(checked = checked.len(), issues = issues.len(), "integrity stage done");
    (input, IntegrityReport { checked, issues })
}

fn check_source(record: &SourceRecord, store: &dyn EvidenceStore, issues: &mut Vec<Issue>) {
    if let Some(mark) = &record.invalid {
        issues.push(
            Issue::blocking(
                IssueCode::FabricationSignature,
                format!("source previously marked invalid: {}", mark.reason),
            )
            .with_source(record.id),
        );
    }

    match store.load(record.id) {
        Ok(evidence) => {
            let recomputed = sha256_hex(&evidence.raw);
            if recomputed != record.sha256_hex {
                issues.push(
                    Issue::blocking(
                        IssueCode::HashMismatch,
                        "raw evidence content does not match its recorded hash",
                    )
                    .with_source(record.id)
                    .with_expected_found(record.sha256_hex.clone(), recomputed),
                );
            }
            if let Some(opener) = synthesis_opener(&evidence.text) {
                issues.push(
                    Issue::blocking(
                        IssueCode::FabricationSignature,
                        format!("evidence text opens with synthesis language: {opener:?}"),
                    )
                    .with_source(record.id),
                );
            }
        }
        Err(err) => {
            issues.push(
                Issue::blocking(
                    IssueCode::HashMismatch,
                    format!("raw evidence could not be loaded: {err}"),
                )
                .with_source(record.id),
            );
        }
    }

    if whole_hour_capture(record.retrieved_at) {
        issues.push(
            Issue::blocking(
                IssueCode::FabricationSignature,
                format!(
                    "capture timestamp {} falls exactly on a whole hour",
                    record.retrieved_at.to_rfc3339()
                ),
            )
            .with_source(record.id),
        );
    }

    if bare_host(&record.url) {
        issues.push(
            Issue::blocking(
                IssueCode::FabricationSignature,
                format!("recorded URL {} is a bare host, not a document", record.url),
            )
            .with_source(record.id),
        );
    }

    if matches!(record.kind, SourceKind::Synthesized | SourceKind::Aggregate) {
        issues.push(
            Issue::blocking(
                IssueCode::FabricationSignature,
                format!("source type {:?} is a synthesized/aggregate type", record.kind),
            )
            .with_source(record.id),
        );
    }
}

/// Real automated captures essentially never land on :00:00.000 exactly.
fn whole_hour_capture(at: DateTime<Utc>) -> bool {
    at.minute() == 0 && at.second() == 0 && at.timestamp_subsec_nanos() == 0
}

fn bare_host(url: &Url) -> bool {
    matches!(url.path(), "" | "/") && url.query().is_none()
}

fn synthesis_opener(text: &str) -> Option<&'static str> {
    let head = text.trim_start().to_lowercase();
    SYNTHESIS_OPENERS.iter().copied().find(|o| head.starts_with(o))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::{fixtures, FsEvidenceStore};
    use chrono::TimeZone;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn record(id: SourceId, url: &str, at: DateTime<Utc>, hash: &str) -> SourceRecord {
        SourceRecord {
            id,
            url: Url::parse(url).unwrap(),
            retrieved_at: at,
            sha256_hex: hash.to_string(),
            raw_path: Path::new("raw.html").into(),
            text_path: Path::new("text.txt").into(),
            kind: SourceKind::Page,
            invalid: None,
        }
    }

    fn ordinary_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap()
    }

    #[test]
    fn clean_source_passes() {
        let dir = TempDir::new().unwrap();
        let at = ordinary_time();
        let meta = fixtures::write_capture(
            dir.path(),
            SourceId(1),
            "https://example.com/report",
            at,
            b"raw bytes",
            "Plain captured article text.",
        );
        let catalog = SourceCatalog::new(vec![record(
            SourceId(1),
            "https://example.com/report",
            at,
            &meta.sha256_hex,
        )]);
        let store = FsEvidenceStore::new(dir.path());

        let (_input, report) = run(&catalog, &store, &[SourceId(1)]);
        assert!(report.issues.is_empty());
        assert_eq!(report.checked, vec![SourceId(1)]);
    }

    #[test]
    fn tampered_raw_content_is_a_hash_mismatch() {
        let dir = TempDir::new().unwrap();
        let at = ordinary_time();
        let meta = fixtures::write_capture(
            dir.path(),
            SourceId(1),
            "https://example.com/report",
            at,
            b"original bytes",
            "Article text.",
        );
        // Tamper after capture.
        fs::write(dir.path().join("S001").join("raw.html"), b"replaced").unwrap();

        let catalog = SourceCatalog::new(vec![record(
            SourceId(1),
            "https://example.com/report",
            at,
            &meta.sha256_hex,
        )]);
        let store = FsEvidenceStore::new(dir.path());

        let (_input, report) = run(&catalog, &store, &[SourceId(1)]);
        let issue = &report.issues[0];
        assert_eq!(issue.code, IssueCode::HashMismatch);
        assert!(issue.is_blocking());
        assert_eq!(issue.source_id, Some(SourceId(1)));
        assert!(issue.expected.is_some() && issue.found.is_some());
    }

    #[test]
    fn whole_hour_capture_is_flagged() {
        let dir = TempDir::new().unwrap();
        let at = Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap();
        let meta = fixtures::write_capture(
            dir.path(),
            SourceId(1),
            "https://example.com/report",
            at,
            b"raw",
            "Article text.",
        );
        let catalog = SourceCatalog::new(vec![record(
            SourceId(1),
            "https://example.com/report",
            at,
            &meta.sha256_hex,
        )]);
        let store = FsEvidenceStore::new(dir.path());

        let (_input, report) = run(&catalog, &store, &[SourceId(1)]);
        assert!(report
            .issues
            .iter()
            .any(|i| i.code == IssueCode::FabricationSignature && i.detail.contains("whole hour")));
    }

    #[test]
    fn synthesis_opener_bare_host_and_kind_are_flagged() {
        let dir = TempDir::new().unwrap();
        let at = ordinary_time();
        let meta = fixtures::write_capture(
            dir.path(),
            SourceId(1),
            "https://example.com/",
            at,
            b"raw",
            "Compiled from several industry reports, this overview...",
        );
        let mut rec = record(SourceId(1), "https://example.com/", at, &meta.sha256_hex);
        rec.kind = SourceKind::Aggregate;
        let catalog = SourceCatalog::new(vec![rec]);
        let store = FsEvidenceStore::new(dir.path());

        let (_input, report) = run(&catalog, &store, &[SourceId(1)]);
        let codes: Vec<_> = report.issues.iter().map(|i| i.code).collect();
        assert_eq!(
            codes
                .iter()
                .filter(|c| **c == IssueCode::FabricationSignature)
                .count(),
            3
        );
        assert!(report.issues.iter().all(Issue::is_blocking));
    }

    #[test]
    fn invalid_marked_source_blocks() {
        let dir = TempDir::new().unwrap();
        let at = ordinary_time();
        let meta = fixtures::write_capture(
            dir.path(),
            SourceId(1),
            "https://example.com/report",
            at,
            b"raw",
            "Article text.",
        );
        let mut catalog = SourceCatalog::new(vec![record(
            SourceId(1),
            "https://example.com/report",
            at,
            &meta.sha256_hex,
        )]);
        catalog.mark_invalid(SourceId(1), "hash drift seen in earlier run");
        let store = FsEvidenceStore::new(dir.path());

        let (_input, report) = run(&catalog, &store, &[SourceId(1)]);
        assert!(report
            .issues
            .iter()
            .any(|i| i.detail.contains("previously marked invalid")));
    }
}
