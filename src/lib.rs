//! Claim verification pipeline.
//!
//! Verifies that the cited assertions in a generated report are genuinely
//! supported by previously captured source evidence, and emits a chained,
//! tamper-evident verification record.

pub mod config;
pub mod error;
pub mod evidence;
pub mod extract;
pub mod matcher;
pub mod models;
pub mod numeric;
pub mod pipeline;
pub mod registry;
pub mod scanner;
pub mod urlnorm;

pub use config::VerifyConfig;
pub use error::{EvidenceError, RegistryError, VerifyError};
pub use evidence::{CapturedEvidence, EvidenceMeta, EvidenceStore, FsEvidenceStore};
pub use models::{
    Claim, ClaimId, OverallStatus, PublishGate, SourceCatalog, SourceId, VerificationRecord,
};
pub use pipeline::{LlmOracle, MockOracle, Pipeline, SemanticOracle};
pub use registry::ClaimRegistry;
