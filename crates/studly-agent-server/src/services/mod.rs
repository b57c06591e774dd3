pub mod conversation;
pub mod gemini;
pub mod llm_service;
pub mod orchestrator;
pub mod prompts;
pub mod summarizer;

pub use gemini::GeminiService;
pub use llm_service::LlmProvider;
pub use orchestrator::RequestOrchestrator;
pub use summarizer::{LlmSummarizer, Summarizer};
