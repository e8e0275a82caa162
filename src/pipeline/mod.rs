pub mod orchestrator;
pub mod scan;
pub mod state;

pub use orchestrator::AttemptOrchestrator;
pub use scan::ScanPipeline;
pub use state::{OrchestratorState, ScanConfig, ScanSummary, MAX_ATTEMPTS};
