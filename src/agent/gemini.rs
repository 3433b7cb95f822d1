//! Gemini `generateContent` client.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::{debug, instrument};

use super::model::{ChatTurn, CompletionRequest, LanguageModel, ModelReply, ToolSpec};
use crate::error::LlmError;
use crate::gateway::config::ModelConfig;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Client for the Gemini API.
pub struct GeminiModel {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
}

impl GeminiModel {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
            temperature: 0.7,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Creates a client from the `model` config section.
    pub fn from_config(config: &ModelConfig) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| LlmError::Config("model.api_key is not set".to_string()))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            http,
            api_key: api_key.to_string(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

fn text_content(role: &str, text: &str) -> Value {
    json!({"role": role, "parts": [{"text": text}]})
}

/// Gemini wants function arguments as an object.
fn as_args(arguments: &Value) -> Value {
    match arguments {
        Value::Object(_) => arguments.clone(),
        Value::Null => json!({}),
        other => json!({"input": other}),
    }
}

fn to_content(turn: &ChatTurn) -> Value {
    match turn {
        ChatTurn::User { text } => text_content("user", text),
        ChatTurn::Assistant { text } => text_content("model", text),
        ChatTurn::ToolCall { name, arguments } => json!({
            "role": "model",
            "parts": [{"functionCall": {"name": name, "args": as_args(arguments)}}]
        }),
        ChatTurn::ToolResult { name, content } => json!({
            "role": "user",
            "parts": [{"functionResponse": {"name": name, "response": {"content": content}}}]
        }),
    }
}

fn to_declaration(tool: &ToolSpec) -> Value {
    let mut declaration = Map::new();
    declaration.insert("name".to_string(), json!(tool.name));
    declaration.insert("description".to_string(), json!(tool.description));

    // Gemini rejects object schemas without properties.
    let has_properties = tool
        .parameters
        .get("properties")
        .and_then(Value::as_object)
        .map_or(false, |p| !p.is_empty());
    if has_properties {
        declaration.insert("parameters".to_string(), tool.parameters.clone());
    }

    Value::Object(declaration)
}

/// Build the `generateContent` body.
pub fn build_request_body(request: &CompletionRequest, default_temperature: f32) -> Value {
    let mut body = Map::new();

    if let Some(system) = &request.system {
        body.insert(
            "systemInstruction".to_string(),
            json!({"parts": [{"text": system}]}),
        );
    }

    body.insert(
        "contents".to_string(),
        Value::Array(request.turns.iter().map(to_content).collect()),
    );

    if !request.tools.is_empty() {
        let declarations: Vec<Value> = request.tools.iter().map(to_declaration).collect();
        body.insert(
            "tools".to_string(),
            json!([{"functionDeclarations": declarations}]),
        );
    }

    body.insert(
        "generationConfig".to_string(),
        json!({"temperature": request.temperature.unwrap_or(default_temperature)}),
    );

    Value::Object(body)
}

/// Read the first candidate of a `generateContent` response.
///
/// A function call wins over any text parts next to it.
pub fn parse_response(body: &Value) -> Result<ModelReply, LlmError> {
    let candidate = match body
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
    {
        Some(candidate) => candidate,
        None => {
            if let Some(reason) = body
                .get("promptFeedback")
                .and_then(|f| f.get("blockReason"))
                .and_then(Value::as_str)
            {
                return Err(LlmError::InvalidResponse(format!("prompt blocked: {}", reason)));
            }
            return Err(LlmError::EmptyResponse);
        }
    };

    let parts = candidate
        .get("content")
        .and_then(|c| c.get("parts"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    if let Some(call) = parts.iter().find_map(|p| p.get("functionCall")) {
        let name = call
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| LlmError::InvalidResponse("functionCall without a name".to_string()))?;
        return Ok(ModelReply::ToolInvocation {
            name: name.to_string(),
            arguments: call.get("args").cloned().unwrap_or_else(|| json!({})),
        });
    }

    let text: Vec<&str> = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    if text.is_empty() {
        return Err(LlmError::EmptyResponse);
    }

    Ok(ModelReply::Text(text.join("")))
}

/// `error.message` of an error body, or the raw body when it is not JSON.
fn api_error_message(body: &str) -> String {
    let message = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        v.get("error")
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
    });
    match message {
        Some(message) => message,
        None if body.trim().is_empty() => "Unknown error".to_string(),
        None => body.trim().to_string(),
    }
}

#[async_trait]
impl LanguageModel for GeminiModel {
    fn name(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, request), fields(model = %self.model, turns = request.turns.len()))]
    async fn complete(&self, request: &CompletionRequest) -> Result<ModelReply, LlmError> {
        let body = build_request_body(request, self.temperature);

        debug!("Sending request to Gemini");

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await?;
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: api_error_message(&text),
            });
        }

        let response_body: Value = response.json().await?;

        debug!("Received successful response");

        parse_response(&response_body)
    }
}
