//! Language model capability.
//!
//! A model is given a system instruction, the conversation so far and the
//! declared tools, and answers with either text or a single tool
//! invocation.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LlmError;

/// One entry of conversation memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ChatTurn {
    User { text: String },
    Assistant { text: String },
    ToolCall { name: String, arguments: Value },
    ToolResult { name: String, content: String },
}

impl ChatTurn {
    pub fn user(text: &str) -> Self {
        ChatTurn::User { text: text.to_string() }
    }

    pub fn assistant(text: &str) -> Self {
        ChatTurn::Assistant { text: text.to_string() }
    }
}

/// A tool advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object
    pub parameters: Value,
}

/// Input to a completion.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub turns: Vec<ChatTurn>,
    /// Empty means the model must answer in text
    pub tools: Vec<ToolSpec>,
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    /// A single user prompt without tools.
    pub fn prompt(text: &str) -> Self {
        Self {
            turns: vec![ChatTurn::user(text)],
            ..Default::default()
        }
    }
}

/// What the model answered.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    Text(String),
    ToolInvocation { name: String, arguments: Value },
}

/// Trait that all language model backends must implement.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model name for logs.
    fn name(&self) -> &str;

    async fn complete(&self, request: &CompletionRequest) -> Result<ModelReply, LlmError>;
}

/// Model that replays queued replies in order.
///
/// Every request is recorded so callers can inspect what the model saw.
/// Once the queue is drained it answers with `EmptyResponse`.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<ModelReply>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<ModelReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        match self.requests.lock() {
            Ok(requests) => requests.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<ModelReply, LlmError> {
        match self.requests.lock() {
            Ok(mut requests) => requests.push(request.clone()),
            Err(poisoned) => poisoned.into_inner().push(request.clone()),
        }
        let next = match self.replies.lock() {
            Ok(mut replies) => replies.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        };
        next.ok_or(LlmError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_model_replays_in_order() {
        let model = ScriptedModel::new(vec![
            ModelReply::Text("first".to_string()),
            ModelReply::Text("second".to_string()),
        ]);

        let request = CompletionRequest::prompt("hi");
        assert_eq!(model.complete(&request).await.unwrap(), ModelReply::Text("first".to_string()));
        assert_eq!(model.complete(&request).await.unwrap(), ModelReply::Text("second".to_string()));
        assert!(matches!(model.complete(&request).await, Err(LlmError::EmptyResponse)));
        assert_eq!(model.requests().len(), 3);
    }

    #[test]
    fn test_chat_turn_serialization() {
        let turn = ChatTurn::user("book a call");
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "text": "book a call"}));
    }
}
