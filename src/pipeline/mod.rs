pub mod binding;
pub mod hash_chain;
pub mod integrity;
pub mod mock;
pub mod numeric_check;
pub mod oracle_llm;
pub mod orchestrator;
pub mod semantic;
pub mod traits;

pub use hash_chain::{chain_hash, sha256_hex, stage_hash, CHAIN_GENESIS};
pub use mock::{MockOracle, UnavailableOracle};
pub use oracle_llm::LlmOracle;
pub use orchestrator::{persist_record, Pipeline};
pub use traits::{OracleCandidate, OracleJudgment, SemanticOracle};
