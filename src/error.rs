use crate::models::ids::{ClaimId, SourceId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvidenceError {
    #[error("no captured evidence for source {0}")]
    MissingSource(SourceId),

    #[error("evidence metadata for {source_id} is malformed: {detail}")]
    MalformedMeta { source_id: SourceId, detail: String },

    #[error("io error reading evidence: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("supporting excerpt not found in source {source_id} extracted text")]
    ExcerptNotFound { source_id: SourceId },

    #[error("claim not found: {0}")]
    UnknownClaim(ClaimId),

    #[error("registry wal error: {0}")]
    Wal(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Evidence(#[from] EvidenceError),
}

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("document is empty; nothing to verify")]
    EmptyDocument,

    #[error("source catalog is empty or missing")]
    EmptyCatalog,

    #[error("malformed input: {0}")]
    Input(String),

    #[error(transparent)]
    Evidence(#[from] EvidenceError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
