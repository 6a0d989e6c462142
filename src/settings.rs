// src/settings.rs
// Client settings file (client.json) read by the SDK

use crate::client::Client;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Default number of results the controller returns per page
pub const DEFAULT_RESPONSE_LIMIT: u64 = 100;

/// Settings persisted in a client configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub username: String,
    #[serde(default = "default_ssl_verify")]
    pub ssl_verify: bool,
    #[serde(default)]
    pub controller: String,
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_response_limit")]
    pub response_limit: u64,
}

fn default_ssl_verify() -> bool {
    true
}

fn default_response_limit() -> u64 {
    DEFAULT_RESPONSE_LIMIT
}

impl Settings {
    pub fn new(controller: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            username: String::new(),
            ssl_verify: default_ssl_verify(),
            controller: controller.into(),
            token: token.into(),
            response_limit: DEFAULT_RESPONSE_LIMIT,
        }
    }

    /// Load settings from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&contents)?;
        if settings.controller.trim().is_empty() {
            return Err(Error::Config(format!(
                "{} does not name a controller",
                path.display()
            )));
        }
        debug!(path = %path.display(), controller = %settings.controller, "Loaded client settings");
        Ok(settings)
    }

    /// Write settings to a JSON file, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        debug!(path = %path.display(), "Saved client settings");
        Ok(())
    }

    /// Build an SDK client from these settings
    pub fn client(&self) -> Result<Client> {
        Client::from_settings(self)
    }
}
