//! Conversational agent.
//!
//! The agent drives one chat turn: it hands the conversation and the tool
//! declarations to the language model, runs the tools the model asks for,
//! and returns the model's final text.
//!
//! ```text
//! message ──▶ shortcut? ──yes──▶ canned reply
//!                │ no
//!                ▼
//!        ┌──▶ complete ──text──▶ reply
//!        │       │ tool call
//!        │       ▼
//!        └── ToolBox::dispatch      (at most max_iterations rounds,
//!                                    then one completion without tools)
//! ```

use std::sync::Arc;

use regex::Regex;

use crate::error::AgentError;
use crate::gateway::session::ConversationSession;
use crate::tools::{ToolBox, ToolKind};

pub mod gemini;
pub mod model;
pub mod prompt;

pub use gemini::GeminiModel;
pub use model::{ChatTurn, CompletionRequest, LanguageModel, ModelReply, ScriptedModel, ToolSpec};

pub const GREETING: &str = "Hello! I'm your AI appointment booking assistant. I can help you check availability and book appointments on your Google Calendar. What would you like to do?";

pub const HELP: &str = "I can help you with:\n• Check availability for specific dates\n• Book appointments\n• Suggest time slots\n\nTry saying 'Check availability for today' or 'Book a meeting tomorrow at 2 PM'";

const ITERATION_LIMIT_REPLY: &str =
    "I wasn't able to finish that request. Could you rephrase it or break it into smaller steps?";

/// Canned reply for greetings and help requests.
pub fn shortcut(message: &str) -> Option<&'static str> {
    let matches = |pattern: &str| {
        Regex::new(pattern)
            .map(|re| re.is_match(message))
            .unwrap_or(false)
    };

    if matches(r"(?i)\b(hello|hi)\b") {
        Some(GREETING)
    } else if matches(r"(?i)\bhelp\b") {
        Some(HELP)
    } else {
        None
    }
}

/// Tool-calling chat agent.
pub struct Agent {
    tools: ToolBox,
    model: Arc<dyn LanguageModel>,
    temperature: f32,
    max_iterations: usize,
    max_history: usize,
}

impl Agent {
    pub fn new(tools: ToolBox, model: Arc<dyn LanguageModel>) -> Self {
        Self {
            tools,
            model,
            temperature: 0.7,
            max_iterations: 3,
            max_history: 50,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }

    pub fn tools(&self) -> &ToolBox {
        &self.tools
    }

    fn request(&self, session: &ConversationSession, with_tools: bool) -> CompletionRequest {
        let mut system = prompt::system_prompt(
            self.tools.now(),
            self.tools.timezone_name(),
            &session.bookings,
        );
        if !with_tools {
            system.push_str("\n\nTools are no longer available for this message. Answer the user directly with what you know.");
        }

        CompletionRequest {
            system: Some(system),
            turns: session.history.clone(),
            tools: if with_tools { ToolKind::specs() } else { Vec::new() },
            temperature: Some(self.temperature),
        }
    }

    /// Run one chat turn within `session`.
    pub async fn chat(
        &self,
        session: &mut ConversationSession,
        message: &str,
    ) -> Result<String, AgentError> {
        tracing::info!("Processing message in session {}", session.id);

        if let Some(reply) = shortcut(message) {
            session.push_turn(ChatTurn::user(message), self.max_history);
            session.push_turn(ChatTurn::assistant(reply), self.max_history);
            return Ok(reply.to_string());
        }

        session.push_turn(ChatTurn::user(message), self.max_history);

        for round in 0..self.max_iterations {
            let request = self.request(session, true);
            match self.model.complete(&request).await? {
                ModelReply::Text(text) => {
                    session.push_turn(ChatTurn::assistant(&text), self.max_history);
                    return Ok(text);
                }
                ModelReply::ToolInvocation { name, arguments } => {
                    tracing::debug!("Round {}: model called {}", round + 1, name);
                    let result = self
                        .tools
                        .dispatch(&name, &arguments, &mut session.bookings)
                        .await;
                    session.push_turn(
                        ChatTurn::ToolCall { name: name.clone(), arguments },
                        self.max_history,
                    );
                    session.push_turn(
                        ChatTurn::ToolResult { name, content: result },
                        self.max_history,
                    );
                }
            }
        }

        tracing::warn!(
            "Session {} reached {} tool rounds, asking for a final answer",
            session.id,
            self.max_iterations
        );

        let request = self.request(session, false);
        let text = match self.model.complete(&request).await? {
            ModelReply::Text(text) => text,
            ModelReply::ToolInvocation { name, .. } => {
                tracing::warn!("Model called {} after the tool limit", name);
                ITERATION_LIMIT_REPLY.to_string()
            }
        };
        session.push_turn(ChatTurn::assistant(&text), self.max_history);
        Ok(text)
    }
}
