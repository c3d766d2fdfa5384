use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::AssistantError;

/// Explicit assistant configuration. Constructed once and handed to the
/// components that need it; nothing reads the environment behind the
/// caller's back.
///
/// Recognized environment keys (via [`AssistantConfig::from_env`]):
/// `GROQ_API_KEY`, `CHATBOT_MODEL`, `GITHUB_TOKEN`, `GITHUB_USERNAME`,
/// `GITHUB_REPOS` (comma-separated), `OWNER_NAME`, `OWNER_TITLE`,
/// `RESPONSE_TEMPERATURE`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    pub groq_api_key: String,
    pub model: String,
    pub github_token: String,
    pub github_username: String,
    pub github_repos: Vec<String>,
    pub owner_name: String,
    pub owner_title: String,
    pub temperature: f32,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            groq_api_key: String::new(),
            model: "llama3-8b-8192".to_string(),
            github_token: String::new(),
            github_username: "DhrubaAgarwalla".to_string(),
            github_repos: vec![
                "NITS-Event-Managment".to_string(),
                "GitIQ".to_string(),
                "stellar-code-lab".to_string(),
            ],
            owner_name: "Dhruba Kumar Agarwalla".to_string(),
            owner_title: "AI-Orchestrated Full-Stack Developer".to_string(),
            temperature: 0.7,
        }
    }
}

impl AssistantConfig {
    /// Read recognized keys from the environment, falling back to defaults
    /// for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let github_repos = std::env::var("GITHUB_REPOS")
            .ok()
            .map(|v| {
                v.split(',')
                    .map(|r| r.trim().to_string())
                    .filter(|r| !r.is_empty())
                    .collect()
            })
            .unwrap_or(defaults.github_repos);

        Self {
            groq_api_key: std::env::var("GROQ_API_KEY").unwrap_or(defaults.groq_api_key),
            model: std::env::var("CHATBOT_MODEL").unwrap_or(defaults.model),
            github_token: std::env::var("GITHUB_TOKEN").unwrap_or(defaults.github_token),
            github_username: std::env::var("GITHUB_USERNAME").unwrap_or(defaults.github_username),
            github_repos,
            owner_name: std::env::var("OWNER_NAME").unwrap_or(defaults.owner_name),
            owner_title: std::env::var("OWNER_TITLE").unwrap_or(defaults.owner_title),
            temperature: std::env::var("RESPONSE_TEMPERATURE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.temperature),
        }
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("folio")
            .join("config.toml")
    }

    /// Load from the config file, falling back to defaults when the file is
    /// missing or unparsable.
    pub fn load() -> Self {
        let config_path = Self::config_path();
        if config_path.exists() {
            if let Ok(content) = std::fs::read_to_string(&config_path) {
                if let Ok(config) = toml::from_str(&content) {
                    return config;
                }
            }
        }
        Self::default()
    }

    pub fn save(&self) -> Result<(), AssistantError> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AssistantError::Config(e.to_string()))?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }
}
