use crate::models::ids::{ClaimId, SourceId};
use crate::numeric::NumericValue;
use serde::{Deserialize, Serialize};

/// One citation marker attached to a statement. `[S001]` and `[S001](url)`
/// reference a source; `[C0001]` references a registry claim directly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Citation {
    Source {
        id: SourceId,
        #[serde(skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    Claim {
        id: ClaimId,
    },
}

/// A citation-bearing sentence from the finished document. Recomputed on each
/// scan; never persisted on its own.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentStatement {
    /// Statement text with citation markup stripped.
    pub text: String,
    /// 1-based line the statement starts on.
    pub line: usize,
    pub citations: Vec<Citation>,
    pub numbers: Vec<NumericValue>,
}

impl DocumentStatement {
    pub fn cited_sources(&self) -> Vec<SourceId> {
        self.citations
            .iter()
            .filter_map(|c| match c {
                Citation::Source { id, .. } => Some(*id),
                Citation::Claim { .. } => None,
            })
            .collect()
    }

    pub fn cited_claims(&self) -> Vec<ClaimId> {
        self.citations
            .iter()
            .filter_map(|c| match c {
                Citation::Claim { id } => Some(*id),
                Citation::Source { .. } => None,
            })
            .collect()
    }

    pub fn has_citations(&self) -> bool {
        !self.citations.is_empty()
    }
}
