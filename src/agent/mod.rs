//! Taxonomy-maintenance agent: analyze → propose → (auto-approve) → execute
//! (SPEC_FULL §4.5).

pub mod analyzer;
pub mod orchestrator;
pub mod proposer;
pub mod reorganizer;

pub use analyzer::{AnalysisResult, Analyzer};
pub use orchestrator::{Orchestrator, OrchestratorMode};
pub use proposer::Proposer;
pub use reorganizer::{AgentError, ReorganizeOutcome, Reorganizer};
