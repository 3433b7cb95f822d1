//! Gateway configuration.
//!
//! This module provides configuration management for the Gateway,
//! including server settings, calendar and model backends, the fixed
//! timezone and session limits.

use chrono::FixedOffset;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::error::ConfigError;

/// Gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Calendar backend configuration
    #[serde(default)]
    pub calendar: CalendarConfig,

    /// Language model configuration
    #[serde(default)]
    pub model: ModelConfig,

    /// The single zone all times are expressed in
    #[serde(default)]
    pub timezone: TimezoneConfig,

    /// Session configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
}

/// Which calendar backend to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarProvider {
    Google,
    Memory,
}

/// Calendar backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    #[serde(default = "default_calendar_provider")]
    pub provider: CalendarProvider,

    /// Calendar to query and write to
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,

    /// OAuth bearer token for the Google API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(default = "default_calendar_base_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

/// Which language model backend to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    Gemini,
}

/// Language model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model_provider")]
    pub provider: ModelProvider,

    /// Model name
    #[serde(default = "default_model_name")]
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_model_base_url")]
    pub base_url: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Tool rounds per chat turn before a final answer is forced
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

/// Timezone configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimezoneConfig {
    /// IANA name sent to the calendar API
    #[serde(default = "default_timezone_name")]
    pub name: String,

    /// Offset from UTC, `+HH:MM`
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,
}

/// Session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Idle time after which a conversation is forgotten
    #[serde(default = "default_session_timeout")]
    pub timeout_seconds: u64,

    /// Maximum remembered turns per conversation
    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_true() -> bool {
    true
}

fn default_calendar_provider() -> CalendarProvider {
    CalendarProvider::Google
}

fn default_calendar_id() -> String {
    "primary".to_string()
}

fn default_calendar_base_url() -> String {
    crate::calendar::google::DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_model_provider() -> ModelProvider {
    ModelProvider::Gemini
}

fn default_model_name() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_model_base_url() -> String {
    crate::agent::gemini::DEFAULT_BASE_URL.to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_iterations() -> usize {
    3
}

fn default_timezone_name() -> String {
    "Asia/Kolkata".to_string()
}

fn default_utc_offset() -> String {
    "+05:30".to_string()
}

fn default_session_timeout() -> u64 {
    3600 // 1 hour
}

fn default_max_history() -> usize {
    50
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            calendar: CalendarConfig::default(),
            model: ModelConfig::default(),
            timezone: TimezoneConfig::default(),
            session: SessionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: default_true(),
        }
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            provider: default_calendar_provider(),
            calendar_id: default_calendar_id(),
            access_token: None,
            base_url: default_calendar_base_url(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_model_provider(),
            model: default_model_name(),
            api_key: None,
            base_url: default_model_base_url(),
            temperature: default_temperature(),
            max_iterations: default_max_iterations(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl Default for TimezoneConfig {
    fn default() -> Self {
        Self {
            name: default_timezone_name(),
            utc_offset: default_utc_offset(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_session_timeout(),
            max_history: default_max_history(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl TimezoneConfig {
    /// Parse `utc_offset` into a chrono offset.
    pub fn offset(&self) -> Result<FixedOffset, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidValue {
            key: "timezone.utc_offset".to_string(),
            reason: reason.to_string(),
        };

        let pattern = Regex::new(r"^([+-])(\d{2}):?(\d{2})$")
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        let caps = pattern
            .captures(self.utc_offset.trim())
            .ok_or_else(|| invalid("expected +HH:MM or -HH:MM"))?;

        let hours: i32 = caps[2].parse().map_err(|_| invalid("bad hours"))?;
        let minutes: i32 = caps[3].parse().map_err(|_| invalid("bad minutes"))?;
        if minutes >= 60 {
            return Err(invalid("minutes must be below 60"));
        }
        let sign = if &caps[1] == "-" { -1 } else { 1 };

        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
            .ok_or_else(|| invalid("offset out of range"))
    }
}

impl GatewayConfig {
    /// Create a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        serde_json::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Load from `path` if it exists, otherwise start from defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::FileNotFound(path)) => {
                tracing::debug!("No config file at {}, using defaults", path);
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Save configuration to a JSON file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Note: port 0 is valid - it means "let the OS assign a port"

        self.timezone.offset()?;

        if self.calendar.calendar_id.trim().is_empty() {
            return Err(ConfigError::MissingRequired("calendar.calendar_id".to_string()));
        }

        if self.calendar.provider == CalendarProvider::Google
            && self.calendar.access_token.as_deref().map_or(true, str::is_empty)
        {
            return Err(ConfigError::MissingRequired("calendar.access_token".to_string()));
        }

        if self.model.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::MissingRequired("model.api_key".to_string()));
        }

        for (key, url) in [
            ("calendar.base_url", &self.calendar.base_url),
            ("model.base_url", &self.model.base_url),
        ] {
            reqwest::Url::parse(url).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        }

        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(ConfigError::InvalidValue {
                key: "model.temperature".to_string(),
                reason: "Temperature must be between 0.0 and 2.0".to_string(),
            });
        }

        if self.model.max_iterations == 0 {
            return Err(ConfigError::InvalidValue {
                key: "model.max_iterations".to_string(),
                reason: "At least one tool round is required".to_string(),
            });
        }

        if self.session.max_history == 0 {
            return Err(ConfigError::InvalidValue {
                key: "session.max_history".to_string(),
                reason: "History must hold at least one turn".to_string(),
            });
        }

        Ok(())
    }

    /// Get the server address string.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Create a configuration for testing.
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // OS will assign a port
                cors_enabled: true,
            },
            calendar: CalendarConfig {
                provider: CalendarProvider::Memory,
                ..Default::default()
            },
            model: ModelConfig {
                api_key: Some("test-key".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}
