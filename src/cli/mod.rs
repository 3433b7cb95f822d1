//! CLI support for appointment-agent.
//!
//! Config file handling for the binary: path expansion, command-line and
//! environment overrides, and a printable view with secrets masked.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::gateway::config::{CalendarProvider, GatewayConfig};

/// Default config file location.
pub const DEFAULT_CONFIG_PATH: &str = "~/.appointment-agent/config.json";

/// Expand tilde (~) in paths.
pub fn expand_path(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    if path_str.starts_with("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(&path_str[2..]);
        }
    }
    path.to_path_buf()
}

/// Values given on the command line or through the environment.
///
/// Each set value replaces the one from the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub api_key: Option<String>,
    pub calendar_id: Option<String>,
    pub access_token: Option<String>,
}

impl Overrides {
    pub fn apply(&self, config: &mut GatewayConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(key) = &self.api_key {
            config.model.api_key = Some(key.clone());
        }
        if let Some(id) = &self.calendar_id {
            config.calendar.calendar_id = id.clone();
        }
        if let Some(token) = &self.access_token {
            config.calendar.access_token = Some(token.clone());
            // a token only makes sense for the Google backend
            config.calendar.provider = CalendarProvider::Google;
        }
    }
}

/// Load the config at `path` (or defaults when absent) and apply overrides.
pub fn load_config(path: &Path, overrides: &Overrides) -> Result<GatewayConfig, ConfigError> {
    let mut config = GatewayConfig::load_or_default(expand_path(path))?;
    overrides.apply(&mut config);
    Ok(config)
}

/// Write a default config to `path`, refusing to overwrite an existing file.
pub fn init_config(path: &Path) -> Result<PathBuf, ConfigError> {
    let expanded = expand_path(path);
    if expanded.exists() {
        return Err(ConfigError::InvalidValue {
            key: "path".to_string(),
            reason: format!("{} already exists", expanded.display()),
        });
    }
    if let Some(parent) = expanded.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    }

    GatewayConfig::default().save(&expanded)?;
    Ok(expanded)
}

fn mask(secret: &mut Option<String>) {
    if let Some(value) = secret {
        *value = if value.chars().count() > 4 {
            format!("{}…", value.chars().take(4).collect::<String>())
        } else {
            "****".to_string()
        };
    }
}

/// Pretty JSON of `config` with credentials masked.
pub fn redacted(config: &GatewayConfig) -> Result<String, ConfigError> {
    let mut shown = config.clone();
    mask(&mut shown.model.api_key);
    mask(&mut shown.calendar.access_token);
    serde_json::to_string_pretty(&shown).map_err(|e| ConfigError::ParseError(e.to_string()))
}
