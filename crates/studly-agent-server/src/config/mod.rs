pub mod settings;

pub use settings::{
    AgentConfig, GeminiConfig, HistoryConfig, PromptsConfig, RequestConfig, ServerConfig, Settings,
};
