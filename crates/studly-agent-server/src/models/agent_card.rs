use serde::{Deserialize, Serialize};

use crate::config::AgentConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    pub streaming: bool,
    pub push_notifications: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSkill {
    pub name: String,
    pub description: String,
}

/// Discovery document served at `/.well-known/agent.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCard {
    pub name: String,
    pub description: String,
    pub url: String,
    pub version: String,
    pub capabilities: AgentCapabilities,
    pub skills: Vec<AgentSkill>,
}

impl AgentCard {
    pub fn new(agent: &AgentConfig, url: impl Into<String>) -> Self {
        Self {
            name: agent.name.clone(),
            description: agent.description.clone(),
            url: url.into(),
            version: agent.version.clone(),
            capabilities: AgentCapabilities {
                streaming: false,
                push_notifications: false,
            },
            skills: vec![AgentSkill {
                name: "generate_study_plan".to_string(),
                description: "Creates personalized study plans based on user input.".to_string(),
            }],
        }
    }
}
