pub mod chat;
pub mod context;
pub mod orchestrator;
pub mod outlet;
pub mod prompts;
pub mod session;
pub mod stages;
pub mod workflow;
