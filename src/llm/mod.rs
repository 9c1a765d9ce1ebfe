pub mod client;
pub mod parser;

pub use client::{CallProgress, LLMClient, ProgressSink};
pub use parser::ResponseParser;
