pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod generator;
pub mod llm;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use error::AnalysisError;
pub use generator::chat::ChatAssistant;
pub use generator::orchestrator::{AnalysisPhase, StagedAnalysisState, StagedOrchestrator};
pub use generator::workflow::launch;
pub use llm::client::LLMClient;
pub use types::{AnalysisResult, CompanyProfile, Dimension};
