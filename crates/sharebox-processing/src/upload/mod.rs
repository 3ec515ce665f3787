//! Upload pipeline orchestration.

pub mod orchestrator;
pub mod stage;

pub use orchestrator::{OrchestratorSettings, UploadOrchestrator};
pub use stage::UploadStage;
