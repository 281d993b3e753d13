use crate::models::ids::SourceId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use url::Url;

/// What kind of capture produced a source. Synthesized and Aggregate entries
/// are fabrication signatures, not real captures.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Page,
    Pdf,
    Dataset,
    Synthesized,
    Aggregate,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InvalidMark {
    pub reason: String,
    pub marked_at: DateTime<Utc>,
}

/// One captured piece of evidence. Immutable after capture: the recorded hash
/// and raw content never change, and entries are never deleted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceRecord {
    pub id: SourceId,
    pub url: Url,
    pub retrieved_at: DateTime<Utc>,
    pub sha256_hex: String,
    pub raw_path: PathBuf,
    pub text_path: PathBuf,
    pub kind: SourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid: Option<InvalidMark>,
}

impl SourceRecord {
    pub fn is_invalid(&self) -> bool {
        self.invalid.is_some()
    }
}

/// The registry of captured sources, keyed by sequential id.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SourceCatalog {
    records: BTreeMap<SourceId, SourceRecord>,
}

impl SourceCatalog {
    pub fn new(records: Vec<SourceRecord>) -> Self {
        Self {
            records: records.into_iter().map(|r| (r.id, r)).collect(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = File::open(path)?;
        let records: Vec<SourceRecord> = serde_json::from_reader(file)?;
        Ok(Self::new(records))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let file = File::create(path)?;
        let records: Vec<&SourceRecord> = self.records.values().collect();
        serde_json::to_writer_pretty(file, &records)?;
        Ok(())
    }

    pub fn get(&self, id: SourceId) -> Option<&SourceRecord> {
        self.records.get(&id)
    }

    pub fn contains(&self, id: SourceId) -> bool {
        self.records.contains_key(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceRecord> {
        self.records.values()
    }

    /// Sources found invalid are flagged in place, never removed.
    pub fn mark_invalid(&mut self, id: SourceId, reason: impl Into<String>) -> bool {
        match self.records.get_mut(&id) {
            Some(record) => {
                record.invalid = Some(InvalidMark {
                    reason: reason.into(),
                    marked_at: Utc::now(),
                });
                true
            }
            None => false,
        }
    }
}
