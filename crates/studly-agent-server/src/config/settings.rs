use anyhow::{bail, Result};
use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::services::prompts;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub gemini: GeminiConfig,
    pub history: HistoryConfig,
    pub request: RequestConfig,
    pub prompts: PromptsConfig,
    pub agent: AgentConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
    pub max_retries: u32,
}

/// History trimming and summarization knobs handed to the core as plain values.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct HistoryConfig {
    pub cap_turns: usize,
    pub enable_summarization: bool,
    pub summary_threshold: usize,
    pub enable_history_cache: bool,
}

impl HistoryConfig {
    /// Each turn is one user message plus one agent message.
    pub fn cap_messages(&self) -> usize {
        self.cap_turns * 2
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            cap_turns: 4,
            enable_summarization: true,
            summary_threshold: 8,
            enable_history_cache: true,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RequestConfig {
    pub timeout_seconds: u64,
}

impl RequestConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PromptsConfig {
    pub study_plan_prompt: String,
    pub summary_instruction: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AgentConfig {
    pub name: String,
    pub description: String,
    pub version: String,
}

/// Unprefixed variables used by existing deployments, mapped onto keys.
const FLAT_ENV_OVERRIDES: &[(&str, &str)] = &[
    ("HISTORY_CAP_TURNS", "history.cap_turns"),
    ("ENABLE_SUMMARIZATION", "history.enable_summarization"),
    ("SUMMARY_THRESHOLD", "history.summary_threshold"),
    ("ENABLE_HISTORY_CACHE", "history.enable_history_cache"),
    ("REQUEST_TIMEOUT_SECONDS", "request.timeout_seconds"),
    ("GEMINI_API_KEY", "gemini.api_key"),
    ("GEMINI_MODEL", "gemini.model"),
    ("HOST", "server.host"),
    ("PORT", "server.port"),
];

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut builder = Self::defaults()?
            .add_source(File::with_name("config/settings").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            );

        for (var, key) in FLAT_ENV_OVERRIDES {
            builder = builder.set_override_option(*key, std::env::var(var).ok())?;
        }

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Built-in defaults only: no file, no environment, no validation.
    pub fn from_defaults() -> Result<Self> {
        Ok(Self::defaults()?.build()?.try_deserialize()?)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let history = HistoryConfig::default();
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000)?
            .set_default("gemini.api_key", "")?
            .set_default(
                "gemini.base_url",
                "https://generativelanguage.googleapis.com/v1beta/openai",
            )?
            .set_default("gemini.model", "gemini-2.5-flash")?
            .set_default("gemini.temperature", 0.3)?
            .set_default("gemini.timeout_seconds", 30)?
            .set_default("gemini.max_retries", 3)?
            .set_default("history.cap_turns", history.cap_turns as i64)?
            .set_default("history.enable_summarization", history.enable_summarization)?
            .set_default("history.summary_threshold", history.summary_threshold as i64)?
            .set_default("history.enable_history_cache", history.enable_history_cache)?
            .set_default("request.timeout_seconds", 6)?
            .set_default("prompts.study_plan_prompt", prompts::STUDY_PLAN_PROMPT)?
            .set_default("prompts.summary_instruction", prompts::SUMMARY_INSTRUCTION)?
            .set_default("agent.name", "Studly")?
            .set_default("agent.description", prompts::AGENT_DESCRIPTION)?
            .set_default("agent.version", "1.0")
    }

    fn validate(&self) -> Result<()> {
        if self.gemini.api_key.trim().is_empty() {
            bail!("GEMINI_API_KEY is not set");
        }
        if self.request.timeout_seconds == 0 {
            bail!("request.timeout_seconds must be greater than zero");
        }
        Ok(())
    }
}
