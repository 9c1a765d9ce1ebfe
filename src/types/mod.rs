pub mod analysis;
pub mod chat;
pub mod profile;

pub use analysis::{AnalysisResult, Dimension};
pub use chat::{ChatMessage, ChatRole};
pub use profile::{CompanyProfile, FundingStage, RevenueRecord};
