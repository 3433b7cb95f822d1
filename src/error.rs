//! Error types for appointment-agent.
//!
//! This module defines all error types used throughout the system.

use thiserror::Error;

/// Main error type for appointment-agent operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Gateway errors
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Calendar backend errors
    #[error("Calendar error: {0}")]
    Calendar(#[from] CalendarError),

    /// Language model errors
    #[error("Language model error: {0}")]
    Llm(#[from] LlmError),

    /// Agent errors
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    /// Session errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for appointment-agent.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures a tool reports back to the conversation.
///
/// The `Display` text of every variant is phrased for the end user, since
/// the tool layer hands it to the model verbatim.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("{0}")]
    InvalidInputFormat(String),

    #[error("The requested start time {start} is in the past. Please choose a future time.")]
    InThePast { start: String },

    #[error("The end time {end} must be after the start time {start}.")]
    InvalidRange { start: String, end: String },

    #[error("The calendar returned a malformed busy interval: {0}")]
    MalformedInterval(String),

    #[error("There is no pending booking to confirm{}.", id_suffix(.0))]
    NoPendingBooking(Option<String>),

    #[error("Several bookings are waiting for confirmation ({}). Please say which booking id you mean.", .0.join(", "))]
    AmbiguousBooking(Vec<String>),

    #[error("Sorry, I couldn't reach the calendar: {0}")]
    ExternalCalendarFailure(String),

    #[error("Sorry, the language model could not answer: {0}")]
    LanguageModelFailure(String),
}

fn id_suffix(id: &Option<String>) -> String {
    match id {
        Some(id) => format!(" with id {}", id),
        None => String::new(),
    }
}

impl From<CalendarError> for ToolError {
    fn from(err: CalendarError) -> Self {
        match err {
            CalendarError::Malformed(reason) => ToolError::MalformedInterval(reason),
            other => ToolError::ExternalCalendarFailure(other.to_string()),
        }
    }
}

impl From<LlmError> for ToolError {
    fn from(err: LlmError) -> Self {
        ToolError::LanguageModelFailure(err.to_string())
    }
}

/// Errors related to the calendar backend.
#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Calendar API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed calendar response: {0}")]
    Malformed(String),

    #[error("Calendar authentication missing: {0}")]
    Auth(String),

    #[error("Invalid calendar configuration: {0}")]
    Config(String),
}

/// Errors related to the language model.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Model API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Model returned no candidates")]
    EmptyResponse,

    #[error("Invalid model response: {0}")]
    InvalidResponse(String),

    #[error("Invalid model configuration: {0}")]
    Config(String),
}

/// Errors that abort a chat turn.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Language model failure: {0}")]
    Model(#[from] LlmError),
}

/// Errors related to the Gateway.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Config error: {0}")]
    ConfigError(#[from] ConfigError),
}

/// Errors related to Sessions.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Invalid session id: {0}")]
    InvalidId(String),
}

/// Errors related to Configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid config value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Missing required config: {0}")]
    MissingRequired(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_pending_booking_message() {
        assert_eq!(
            ToolError::NoPendingBooking(None).to_string(),
            "There is no pending booking to confirm."
        );
        assert_eq!(
            ToolError::NoPendingBooking(Some("abc".to_string())).to_string(),
            "There is no pending booking to confirm with id abc."
        );
    }

    #[test]
    fn test_calendar_error_maps_to_tool_error() {
        let err: ToolError = CalendarError::Malformed("missing end".to_string()).into();
        assert!(matches!(err, ToolError::MalformedInterval(_)));

        let err: ToolError = CalendarError::Api { status: 403, message: "denied".to_string() }.into();
        assert!(matches!(err, ToolError::ExternalCalendarFailure(_)));
    }
}
