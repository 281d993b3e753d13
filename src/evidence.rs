//! Read-side access to captured evidence.
//!
//! Capture itself is an external collaborator; this module only loads what it
//! produced. A capture directory holds one subdirectory per source id with a
//! `meta.json` plus the raw and extracted-text files it names.

use crate::error::EvidenceError;
use crate::models::ids::SourceId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use url::Url;

/// Capture-time metadata recorded next to the content files.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvidenceMeta {
    pub url: Url,
    pub retrieved_at: DateTime<Utc>,
    pub sha256_hex: String,
    pub raw_file: String,
    pub text_file: String,
}

/// A fully loaded capture: metadata plus content.
#[derive(Clone, Debug)]
pub struct CapturedEvidence {
    pub source_id: SourceId,
    pub url: Url,
    pub retrieved_at: DateTime<Utc>,
    pub sha256_hex: String,
    pub raw: Vec<u8>,
    pub text: String,
}

/// Reads are read-only and freely concurrent; implementations must not
/// mutate captures.
pub trait EvidenceStore: Send + Sync {
    fn meta(&self, id: SourceId) -> Result<EvidenceMeta, EvidenceError>;
    fn load(&self, id: SourceId) -> Result<CapturedEvidence, EvidenceError>;

    fn extracted_text(&self, id: SourceId) -> Result<String, EvidenceError> {
        Ok(self.load(id)?.text)
    }
}

pub struct FsEvidenceStore {
    root: PathBuf,
}

impl FsEvidenceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn source_dir(&self, id: SourceId) -> PathBuf {
        self.root.join(id.to_string())
    }

    fn read_meta(&self, id: SourceId) -> Result<EvidenceMeta, EvidenceError> {
        let path = self.source_dir(id).join("meta.json");
        if !path.exists() {
            return Err(EvidenceError::MissingSource(id));
        }
        let raw = fs::read_to_string(&path)?;
        serde_json::from_str(&raw).map_err(|e| EvidenceError::MalformedMeta {
            source_id: id,
            detail: e.to_string(),
        })
    }
}

impl EvidenceStore for FsEvidenceStore {
    fn meta(&self, id: SourceId) -> Result<EvidenceMeta, EvidenceError> {
        self.read_meta(id)
    }

    fn extracted_text(&self, id: SourceId) -> Result<String, EvidenceError> {
        let meta = self.read_meta(id)?;
        Ok(fs::read_to_string(self.source_dir(id).join(&meta.text_file))?)
    }

    fn load(&self, id: SourceId) -> Result<CapturedEvidence, EvidenceError> {
        let meta = self.read_meta(id)?;
        let dir = self.source_dir(id);
        let raw = fs::read(dir.join(&meta.raw_file))?;
        let text = fs::read_to_string(dir.join(&meta.text_file))?;
        Ok(CapturedEvidence {
            source_id: id,
            url: meta.url,
            retrieved_at: meta.retrieved_at,
            sha256_hex: meta.sha256_hex,
            raw,
            text,
        })
    }
}

#[cfg(test)]
pub mod fixtures {
    //! On-disk capture fixtures shared by unit and integration tests.

    use super::*;
    use sha2::{Digest, Sha256};
    use std::path::Path;

    pub fn write_capture(
        root: &Path,
        id: SourceId,
        url: &str,
        retrieved_at: DateTime<Utc>,
        raw: &[u8],
        text: &str,
    ) -> EvidenceMeta {
        let dir = root.join(id.to_string());
        fs::create_dir_all(&dir).unwrap();
        let mut hasher = Sha256::new();
        hasher.update(raw);
        let meta = EvidenceMeta {
            url: Url::parse(url).unwrap(),
            retrieved_at,
            sha256_hex: format!("{:x}", hasher.finalize()),
            raw_file: "raw.html".into(),
            text_file: "text.txt".into(),
        };
        fs::write(dir.join("raw.html"), raw).unwrap();
        fs::write(dir.join("text.txt"), text).unwrap();
        fs::write(
            dir.join("meta.json"),
            serde_json::to_string_pretty(&meta).unwrap(),
        )
        .unwrap();
        meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn loads_what_capture_wrote() {
        let dir = TempDir::new().unwrap();
        let at = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
        fixtures::write_capture(
            dir.path(),
            SourceId(1),
            "https://example.com/report",
            at,
            b"<html>raw</html>",
            "Revenue grew 12% in 2025.",
        );

        let store = FsEvidenceStore::new(dir.path());
        let loaded = store.load(SourceId(1)).unwrap();
        assert_eq!(loaded.url.as_str(), "https://example.com/report");
        assert_eq!(loaded.retrieved_at, at);
        assert_eq!(loaded.raw, b"<html>raw</html>");
        assert_eq!(loaded.text, "Revenue grew 12% in 2025.");

        let meta = store.meta(SourceId(1)).unwrap();
        assert_eq!(meta.sha256_hex, loaded.sha256_hex);
    }

    #[test]
    fn missing_source_is_a_typed_error() {
        let dir = TempDir::new().unwrap();
        let store = FsEvidenceStore::new(dir.path());
        match store.load(SourceId(9)) {
            Err(EvidenceError::MissingSource(id)) => assert_eq!(id, SourceId(9)),
            other => panic!("expected MissingSource, got {other:?}"),
        }
    }
}
