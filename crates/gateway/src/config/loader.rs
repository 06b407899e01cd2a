use std::path::Path;
use thiserror::Error;

use super::types::ClientConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Host must not be empty")]
    EmptyHost,
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Load client configuration from a JSON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ClientConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Load configuration from a JSON string
pub fn load_config_from_str(json: &str) -> Result<ClientConfig, ConfigError> {
    let config: ClientConfig = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
}

/// Load the default embedded configuration
pub fn load_default_config() -> Result<ClientConfig, ConfigError> {
    let default_config = include_str!("client_config.json");
    load_config_from_str(default_config)
}

impl ClientConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.period == 0 {
            return Err(ConfigError::InvalidValue {
                field: "period",
                reason: "must be positive".to_string(),
            });
        }
        if self.ping_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ping_interval_ms",
                reason: "must be positive".to_string(),
            });
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "tick_interval_ms",
                reason: "must be positive".to_string(),
            });
        }
        if let Some(url) = &self.ws_url {
            let parsed = url::Url::parse(url).map_err(|e| ConfigError::InvalidValue {
                field: "ws_url",
                reason: e.to_string(),
            })?;
            if !matches!(parsed.scheme(), "ws" | "wss") {
                return Err(ConfigError::InvalidValue {
                    field: "ws_url",
                    reason: format!("unsupported scheme {}", parsed.scheme()),
                });
            }
        }
        Ok(())
    }
}
