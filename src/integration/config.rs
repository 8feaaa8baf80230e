//! Configuration for the integration layer
//!
//! Provides centralized configuration for all components. Values come from an
//! optional JSON file, then environment overrides. The API key is never
//! compiled in.

use crate::llm::{GatewayConfig, PromptConfig};
use crate::speech::NarratorConfig;
use crate::{ChatError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Gemini API key
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
/// Model override
pub const MODEL_ENV: &str = "FURIA_CHAT_MODEL";
/// Set to `1`/`true`/`yes` to disable spoken replies
pub const NO_AUDIO_ENV: &str = "FURIA_CHAT_NO_AUDIO";
/// Alternative config file location
pub const CONFIG_PATH_ENV: &str = "FURIA_CHAT_CONFIG";

/// Configuration for the complete application
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// AI gateway configuration
    pub gateway: GatewayConfig,

    /// Narration configuration
    pub narrator: NarratorConfig,

    /// Prompt templates
    pub prompts: PromptConfig,
}

impl ChatConfig {
    /// Load from the config file (if present) and the process environment
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .ok()
            .map(PathBuf::from)
            .or_else(Self::default_path);

        let mut config = match path {
            Some(path) if path.exists() => {
                info!("Loading configuration from {}", path.display());
                Self::from_file(&path)?
            }
            _ => {
                debug!("No configuration file, using defaults");
                Self::default()
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a JSON configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// `<config dir>/furia-chat/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("furia-chat").join("config.json"))
    }

    /// Apply environment overrides using `lookup` to read variables
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.gateway.api_key = Some(key);
        }

        if let Some(model) = lookup(MODEL_ENV).filter(|m| !m.trim().is_empty()) {
            self.gateway.model = model;
        }

        if let Some(flag) = lookup(NO_AUDIO_ENV) {
            if matches!(flag.trim().to_lowercase().as_str(), "1" | "true" | "yes") {
                self.narrator.enabled = false;
            }
        }
    }

    /// Set the gateway configuration
    pub fn with_gateway(mut self, gateway: GatewayConfig) -> Self {
        self.gateway = gateway;
        self
    }

    /// Set the narrator configuration
    pub fn with_narrator(mut self, narrator: NarratorConfig) -> Self {
        self.narrator = narrator;
        self
    }

    /// Set the prompt templates
    pub fn with_prompts(mut self, prompts: PromptConfig) -> Self {
        self.prompts = prompts;
        self
    }

    /// Disable audio output (text-only mode)
    pub fn without_audio(mut self) -> Self {
        self.narrator.enabled = false;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.gateway.has_api_key() {
            return Err(ChatError::ConfigError(format!(
                "Gemini API key is missing; set {} or add it to the config file",
                API_KEY_ENV
            )));
        }

        if self.gateway.model.trim().is_empty() {
            return Err(ChatError::ConfigError("Model name is required".to_string()));
        }

        if self.gateway.timeout_secs == 0 {
            return Err(ChatError::ConfigError(
                "Gateway timeout_secs must be at least 1".to_string(),
            ));
        }

        if self.narrator.enabled && self.narrator.command.trim().is_empty() {
            return Err(ChatError::ConfigError(
                "Narration command is required when audio is enabled".to_string(),
            ));
        }

        Ok(())
    }
}
