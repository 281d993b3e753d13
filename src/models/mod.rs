pub mod claim;
pub mod ids;
pub mod record;
pub mod source;
pub mod statement;
pub mod verify;

pub use claim::{claim_content_hash, normalize_claim_text, CandidateClaim, Claim, ClaimKind};
pub use ids::{ClaimId, RunId, SourceId};
pub use record::{
    OverallStatus, PublishGate, RunStamp, StageId, StageResult, VerificationRecord,
};
pub use source::{InvalidMark, SourceCatalog, SourceKind, SourceRecord};
pub use statement::{Citation, DocumentStatement};
pub use verify::{
    status_from_issues, Issue, IssueCode, MatchResult, MatchStrategy, Severity, StageStatus,
    Verdict,
};
