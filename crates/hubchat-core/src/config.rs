use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::state::Conversation;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Environment variable that overrides `base_url`.
pub const URL_ENV: &str = "HUBCHAT_URL";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub confirm_delete: bool,
    pub log_filter: Option<String>,
    /// Sidebar entries from earlier runs, most recent first. The backend has
    /// no listing endpoint, so the client keeps track of them.
    pub conversations: Vec<Conversation>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            confirm_delete: true,
            log_filter: None,
            conversations: Vec::new(),
        }
    }
}

impl Config {
    /// Load from the user config directory, then apply the environment override.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        if let Ok(url) = std::env::var(URL_ENV) {
            config.apply_url_override(&url);
        }
        Ok(config)
    }

    /// A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Store the sidebar in the user config file, leaving its other settings
    /// as written. Runtime overrides of `base_url` are never persisted.
    pub fn remember_conversations(conversations: Vec<Conversation>) -> Result<()> {
        Self::remember_conversations_in(&Self::config_path()?, conversations)
    }

    pub fn remember_conversations_in(path: &Path, conversations: Vec<Conversation>) -> Result<()> {
        let mut stored = Self::load_from(path)?;
        stored.conversations = conversations;
        stored.save_to(path)
    }

    /// Blank values are ignored.
    pub fn apply_url_override(&mut self, url: &str) {
        let url = url.trim();
        if !url.is_empty() {
            self.base_url = url.trim_end_matches('/').to_string();
        }
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

        Ok(config_dir.join("hubchat").join("config.json"))
    }
}
