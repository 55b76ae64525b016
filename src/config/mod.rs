//! Console configuration
//!
//! Loads endpoint settings from a TOML file; missing files fall back to the
//! local-development defaults. Command-line flags override file values.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default configuration file name
pub const CONFIG_FILE: &str = "console.toml";

/// Errors that can occur during config operations
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Endpoint settings for the console
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Base URL for REST endpoints
    pub base_api: String,
    /// WebSocket server URL
    pub websocket_url: String,
    /// Login path on the REST API
    pub login_endpoint: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            base_api: "http://localhost:3003".to_string(),
            websocket_url: "ws://localhost:3003/ws".to_string(),
            login_endpoint: "/iam/login".to_string(),
        }
    }
}

impl ConsoleConfig {
    /// Load configuration from a file, defaulting when it does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: ConsoleConfig = toml::from_str(&content)?;
        Ok(config)
    }
}
