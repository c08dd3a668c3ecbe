use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{DevDeskError, Result};

/// Top-level configuration for the DevDesk service.
///
/// Loaded from `~/.devdesk/config.toml` by default (`DEVDESK_CONFIG` env
/// overrides the path). Each section corresponds to one subsystem.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DevDeskConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub datasets: DatasetsConfig,
}

impl DevDeskConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DevDeskConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| DevDeskError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory for the SQLite database.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// HTTP listen port.
    pub port: u16,
    /// Requests per second allowed on authenticated endpoints.
    pub rate_limit_per_sec: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.devdesk/data".to_string(),
            log_level: "info".to_string(),
            port: 8000,
            rate_limit_per_sec: 100,
        }
    }
}

/// LLM service settings.
///
/// The API key is never stored in the config file; it is read from the
/// `OPENAI_API_KEY` environment variable. A missing key degrades the
/// assistant (knowledge-context-only answers) but never fails startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of the OpenAI-compatible service.
    pub base_url: String,
    /// Chat completion model name.
    pub model: String,
    /// Embedding model name.
    pub embedding_model: String,
    /// Maximum tokens per completion.
    pub max_tokens: u32,
    /// HTTP timeout for LLM round-trips, in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-3.5-turbo-16k".to_string(),
            embedding_model: "text-embedding-ada-002".to_string(),
            max_tokens: 1000,
            timeout_secs: 30,
        }
    }
}

/// Knowledge base settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// Directory containing markdown documentation files.
    pub kb_dir: String,
    /// Number of chunks to retrieve per query.
    pub top_k: usize,
    /// Maximum characters per chunk snippet in the LLM context.
    pub snippet_max_chars: usize,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            kb_dir: "kb".to_string(),
            top_k: 3,
            snippet_max_chars: 500,
        }
    }
}

/// Static dataset settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetsConfig {
    /// Directory containing employees.json, jira_tickets.json, and
    /// deployments.json.
    pub dir: String,
}

impl Default for DatasetsConfig {
    fn default() -> Self {
        Self {
            dir: "data".to_string(),
        }
    }
}
