use crate::error::RegistryError;
use crate::evidence::EvidenceStore;
use crate::models::claim::{normalize_claim_text, CandidateClaim, Claim};
use crate::models::ids::{ClaimId, SourceId};
use crate::registry::index::ClaimIndex;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum OpKind {
    InsertClaim { claim: Claim },
    Correct { correction: Correction },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OpLog {
    pub op_id: Uuid,
    pub kind: OpKind,
    pub created_at: DateTime<Utc>,
}

/// Administrative amendment to a stored claim. Applied on replay in WAL
/// order; the claim's dedup identity is untouched.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Correction {
    pub claim_id: ClaimId,
    pub corrected_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Clone, Debug)]
pub enum AddOutcome {
    Added(Claim),
    /// An identical (text, source) pair already exists; the stored entry is
    /// returned instead of inserting.
    Duplicate(Claim),
}

impl AddOutcome {
    pub fn claim(&self) -> &Claim {
        match self {
            AddOutcome::Added(c) | AddOutcome::Duplicate(c) => c,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, AddOutcome::Duplicate(_))
    }
}

struct Inner {
    index: ClaimIndex,
    wal: BufWriter<File>,
    next_id: ClaimId,
}

/// Append-only, deduplicated claim store backed by a JSONL WAL.
///
/// The check-then-insert sequence serializes behind one registry-wide mutex
/// so concurrent extractions cannot register the same claim twice.
pub struct ClaimRegistry {
    store: Arc<dyn EvidenceStore>,
    inner: Mutex<Inner>,
}

impl ClaimRegistry {
    pub fn open(
        wal_path: impl AsRef<Path>,
        store: Arc<dyn EvidenceStore>,
    ) -> Result<Self, RegistryError> {
        let wal_path = wal_path.as_ref();
        let mut index = ClaimIndex::default();
        if wal_path.exists() {
            replay(wal_path, &mut index)?;
        }
        let next_id = index.max_id().map(|id| id.next()).unwrap_or(ClaimId(1));
        let file = OpenOptions::new().create(true).append(true).open(wal_path)?;
        Ok(Self {
            store,
            inner: Mutex::new(Inner {
                index,
                wal: BufWriter::new(file),
                next_id,
            }),
        })
    }

    /// Register a candidate claim. The supporting excerpt must be present in
    /// the source's extracted text (whitespace-normalized) or the candidate
    /// is rejected; this is the gate against fabricated claims.
    pub fn add_claim(&self, candidate: CandidateClaim) -> Result<AddOutcome, RegistryError> {
        let text = self.store.extracted_text(candidate.source_id)?;
        let location = locate_excerpt(&text, &candidate.excerpt).ok_or(
            RegistryError::ExcerptNotFound {
                source_id: candidate.source_id,
            },
        )?;

        let normalized_text = normalize_claim_text(&candidate.text);
        let content_hash = candidate.content_hash();

        let mut inner = self.inner.lock().expect("registry lock");
        if let Some(existing) = inner.index.by_content_hash(&content_hash) {
            return Ok(AddOutcome::Duplicate(existing.clone()));
        }

        let claim = Claim {
            id: inner.next_id,
            source_id: candidate.source_id,
            text: candidate.text,
            normalized_text,
            kind: candidate.kind,
            numbers: candidate.numbers,
            excerpt: candidate.excerpt,
            location: Some(location),
            content_hash,
            created_at: Utc::now(),
            correction_note: None,
        };
        inner.next_id = inner.next_id.next();

        // Durable before visible: the WAL line lands before the index entry.
        let op = OpLog {
            op_id: Uuid::new_v4(),
            kind: OpKind::InsertClaim {
                claim: claim.clone(),
            },
            created_at: Utc::now(),
        };
        write_op(&mut inner.wal, &op)?;
        inner.index.insert(claim.clone());
        Ok(AddOutcome::Added(claim))
    }

    pub fn correct(&self, correction: Correction) -> Result<Claim, RegistryError> {
        let mut inner = self.inner.lock().expect("registry lock");
        if inner.index.get(correction.claim_id).is_none() {
            return Err(RegistryError::UnknownClaim(correction.claim_id));
        }
        let op = OpLog {
            op_id: Uuid::new_v4(),
            kind: OpKind::Correct {
                correction: correction.clone(),
            },
            created_at: Utc::now(),
        };
        write_op(&mut inner.wal, &op)?;
        apply_correction(&mut inner.index, &correction);
        Ok(inner
            .index
            .get(correction.claim_id)
            .cloned()
            .expect("corrected claim present"))
    }

    pub fn find_by_id(&self, id: ClaimId) -> Option<Claim> {
        self.inner.lock().expect("registry lock").index.get(id).cloned()
    }

    pub fn find_by_source(&self, source_id: SourceId) -> Vec<Claim> {
        self.inner
            .lock()
            .expect("registry lock")
            .index
            .by_source(source_id)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn find_by_numeric_value(&self, value: f64, tolerance: f64) -> Vec<Claim> {
        self.inner
            .lock()
            .expect("registry lock")
            .index
            .by_numeric_value(value, tolerance)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn all_claims(&self) -> Vec<Claim> {
        self.inner
            .lock()
            .expect("registry lock")
            .index
            .all()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("registry lock").index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn write_op(wal: &mut BufWriter<File>, op: &OpLog) -> Result<(), RegistryError> {
    let line = serde_json::to_string(op)?;
    wal.write_all(line.as_bytes())?;
    wal.write_all(b"\n")?;
    wal.flush()?;
    Ok(())
}

fn replay(path: &Path, index: &mut ClaimIndex) -> Result<(), RegistryError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let op: OpLog = match serde_json::from_str(&line) {
            Ok(v) => v,
            // A torn trailing line from a crashed writer is skipped.
            Err(_) => continue,
        };
        match op.kind {
            OpKind::InsertClaim { claim } => index.insert(claim),
            OpKind::Correct { correction } => apply_correction(index, &correction),
        }
    }
    Ok(())
}

fn apply_correction(index: &mut ClaimIndex, correction: &Correction) {
    if let Some(claim) = index.get_mut(correction.claim_id) {
        claim.text = correction.corrected_text.clone();
        claim.normalized_text = normalize_claim_text(&correction.corrected_text);
        claim.correction_note = correction.note.clone();
    }
}

/// Find the excerpt in the extracted text, exactly or after whitespace
/// normalization on both sides. Returns an approximate character offset.
pub fn locate_excerpt(text: &str, excerpt: &str) -> Option<usize> {
    let excerpt = excerpt.trim();
    if excerpt.is_empty() {
        return None;
    }
    if let Some(pos) = text.find(excerpt) {
        return Some(pos);
    }
    let collapsed_text = collapse_ws(text);
    let collapsed_excerpt = collapse_ws(excerpt);
    collapsed_text.find(&collapsed_excerpt)
}

fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::{fixtures, FsEvidenceStore};
    use crate::models::{ClaimKind, SourceId};
    use crate::numeric::{NumericValue, Unit};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn registry_with_source(text: &str) -> (TempDir, ClaimRegistry) {
        let dir = TempDir::new().unwrap();
        let at = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
        fixtures::write_capture(
            dir.path(),
            SourceId(1),
            "https://example.com/report",
            at,
            b"raw",
            text,
        );
        let store = Arc::new(FsEvidenceStore::new(dir.path()));
        let registry = ClaimRegistry::open(dir.path().join("registry.wal"), store).unwrap();
        (dir, registry)
    }

    fn candidate(text: &str, excerpt: &str) -> CandidateClaim {
        CandidateClaim {
            source_id: SourceId(1),
            text: text.to_string(),
            kind: ClaimKind::Statistic,
            numbers: vec![NumericValue::new(12.0, Unit::Percent, text)],
            excerpt: excerpt.to_string(),
        }
    }

    #[test]
    fn add_then_duplicate_returns_existing() {
        let (_dir, registry) =
            registry_with_source("Revenue grew 12% in fiscal 2025, the company said.");

        let first = registry
            .add_claim(candidate("Revenue grew 12%", "Revenue grew 12% in fiscal 2025"))
            .unwrap();
        assert!(!first.is_duplicate());
        assert_eq!(registry.len(), 1);

        let second = registry
            .add_claim(candidate("Revenue  GREW 12%", "Revenue grew 12% in fiscal 2025"))
            .unwrap();
        assert!(second.is_duplicate());
        assert_eq!(second.claim().id, first.claim().id);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn excerpt_not_in_source_is_rejected() {
        let (_dir, registry) = registry_with_source("Nothing quantitative here.");
        let err = registry
            .add_claim(candidate("Revenue grew 12%", "Revenue grew 12% in fiscal 2025"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::ExcerptNotFound { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn excerpt_matches_across_whitespace() {
        let (_dir, registry) =
            registry_with_source("Revenue grew\n    12% in fiscal 2025, the company said.");
        let outcome = registry
            .add_claim(candidate("Revenue grew 12%", "Revenue grew 12% in fiscal 2025"))
            .unwrap();
        assert!(outcome.claim().location.is_some());
    }

    #[test]
    fn wal_replay_restores_claims_and_ids() {
        let dir = TempDir::new().unwrap();
        let at = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
        fixtures::write_capture(
            dir.path(),
            SourceId(1),
            "https://example.com/report",
            at,
            b"raw",
            "Revenue grew 12% in fiscal 2025. Headcount reached 900 employees.",
        );
        let store: Arc<dyn EvidenceStore> = Arc::new(FsEvidenceStore::new(dir.path()));
        let wal = dir.path().join("registry.wal");

        let first_id = {
            let registry = ClaimRegistry::open(&wal, Arc::clone(&store)).unwrap();
            registry
                .add_claim(candidate("Revenue grew 12%", "Revenue grew 12% in fiscal 2025"))
                .unwrap()
                .claim()
                .id
        };

        let reopened = ClaimRegistry::open(&wal, store).unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.find_by_id(first_id).unwrap().id, first_id);
        assert_eq!(reopened.find_by_source(SourceId(1)).len(), 1);
        assert!(reopened.find_by_source(SourceId(2)).is_empty());

        let next = reopened
            .add_claim(CandidateClaim {
                source_id: SourceId(1),
                text: "Headcount reached 900".into(),
                kind: ClaimKind::Statistic,
                numbers: vec![NumericValue::new(
                    900.0,
                    Unit::Count {
                        noun: "employees".into(),
                    },
                    "900 employees",
                )],
                excerpt: "Headcount reached 900 employees".into(),
            })
            .unwrap();
        assert_eq!(next.claim().id, first_id.next());
    }

    #[test]
    fn correction_amends_text_with_audit_note() {
        let (_dir, registry) =
            registry_with_source("Revenue grew 12% in fiscal 2025, the company said.");
        let id = registry
            .add_claim(candidate("Revenue grew 12%", "Revenue grew 12% in fiscal 2025"))
            .unwrap()
            .claim()
            .id;

        let corrected = registry
            .correct(Correction {
                claim_id: id,
                corrected_text: "Revenue grew 12% in fiscal 2025".into(),
                note: Some("expanded truncated text".into()),
            })
            .unwrap();
        assert_eq!(corrected.text, "Revenue grew 12% in fiscal 2025");
        assert!(corrected.correction_note.is_some());

        let missing = registry.correct(Correction {
            claim_id: ClaimId(99),
            corrected_text: "x".into(),
            note: None,
        });
        assert!(matches!(missing, Err(RegistryError::UnknownClaim(_))));
    }

    #[test]
    fn numeric_lookup_respects_tolerance() {
        let (_dir, registry) =
            registry_with_source("Revenue grew 12% in fiscal 2025, the company said.");
        registry
            .add_claim(candidate("Revenue grew 12%", "Revenue grew 12% in fiscal 2025"))
            .unwrap();

        assert_eq!(registry.find_by_numeric_value(12.0, 0.01).len(), 1);
        assert_eq!(registry.find_by_numeric_value(12.1, 0.01).len(), 1);
        assert!(registry.find_by_numeric_value(14.0, 0.01).is_empty());
    }
}
