//! Configuration management for testforge
//!
//! Stores settings in ~/.config/testforge/config.json. Environment variables
//! take precedence over the config file for credentials so operators can run
//! without touching disk.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default provider endpoint (OpenAI-compatible chat completions).
const DEFAULT_PROVIDER_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Default model priority list. Most capable first; the gateway walks the
/// list sequentially on failure. Operators can reorder or replace this in
/// the config file without touching code.
fn default_model_priority() -> Vec<String> {
    [
        "gpt-4.1",
        "gpt-4o",
        "gpt-4.1-mini",
        "gpt-3.5-turbo",
        "gpt-3.5-turbo-16k",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_provider_url() -> String {
    DEFAULT_PROVIDER_URL.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Provider API key. `OPENAI_API_KEY` in the environment wins over this.
    pub provider_api_key: Option<String>,
    /// GitHub access token. `GITHUB_TOKEN` in the environment wins over this.
    pub github_token: Option<String>,
    /// Ordered list of model identifiers for the fallback loop.
    #[serde(default = "default_model_priority")]
    pub model_priority: Vec<String>,
    /// Chat-completions endpoint the text-generation calls go to.
    #[serde(default = "default_provider_url")]
    pub provider_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider_api_key: None,
            github_token: None,
            model_priority: default_model_priority(),
            provider_url: default_provider_url(),
        }
    }
}

impl Config {
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("testforge"))
    }

    fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.json"))
    }

    /// Load config from the default location, or return defaults.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load config from an explicit path. A corrupt file is backed up and
    /// replaced with defaults rather than aborting.
    pub fn load_from(path: &Path) -> Self {
        if let Ok(content) = fs::read_to_string(path) {
            match serde_json::from_str(&content) {
                Ok(config) => return config,
                Err(err) => {
                    preserve_corrupt_config(path, &content);
                    eprintln!(
                        "  Warning: Config file was corrupted ({}). A backup was saved and defaults were loaded.",
                        err
                    );
                }
            }
        }
        Self::default()
    }

    /// Save config to the default location.
    pub fn save(&self) -> Result<()> {
        let dir = Self::config_dir().context("Could not determine config directory")?;
        self.save_to(&dir.join("config.json"))
    }

    /// Save config to an explicit path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).context("Failed to create config directory")?;
        }
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).context("Failed to write config")?;
        Ok(())
    }

    /// Get the provider API key. Environment variable takes precedence.
    pub fn provider_api_key(&self) -> Option<String> {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.is_empty() {
                return Some(key);
            }
        }
        self.provider_api_key.clone()
    }

    /// Get the GitHub token. Environment variable takes precedence.
    pub fn github_token(&self) -> Option<String> {
        if let Ok(token) = std::env::var("GITHUB_TOKEN") {
            if !token.is_empty() {
                return Some(token);
            }
        }
        self.github_token.clone()
    }
}

/// Keep the unreadable file around for inspection instead of losing it.
fn preserve_corrupt_config(path: &Path, content: &str) {
    let backup = path.with_extension("json.corrupt");
    let _ = fs::write(backup, content);
}
