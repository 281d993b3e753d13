pub mod engine;
pub mod index;
pub mod search;

pub use engine::{locate_excerpt, AddOutcome, ClaimRegistry, Correction, OpKind, OpLog};
pub use index::ClaimIndex;
pub use search::search;
