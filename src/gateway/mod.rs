//! Gateway module for appointment-agent.
//!
//! The Gateway wires the calendar backend, the language model and the
//! agent together and owns the conversation sessions. The HTTP server is a
//! thin layer over `Gateway::process_message`.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                     Gateway                           │
//! │  ┌────────────┐  ┌────────────┐  ┌────────────┐      │
//! │  │  Session   │  │   Agent    │  │  ToolBox   │      │
//! │  │  Manager   │──│   loop     │──│            │      │
//! │  └────────────┘  └─────┬──────┘  └─────┬──────┘      │
//! │                        ↓               ↓              │
//! │               LanguageModel     CalendarBackend       │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod server;
pub mod session;

use std::sync::Arc;

use crate::agent::{Agent, GeminiModel, LanguageModel};
use crate::booking::BookingDesk;
use crate::calendar::{self, CalendarBackend};
use crate::error::{GatewayError, Result};
use crate::tools::{ToolBox, ToolCall};
use crate::types::{Clock, SystemClock};

pub use config::GatewayConfig;
pub use server::GatewayServer;
pub use session::{ConversationSession, SessionInfo, SessionManager, SessionManagerConfig};

/// Reply to one chat message.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatOutcome {
    pub session_id: String,
    pub response: String,
}

/// Main Gateway structure.
pub struct Gateway {
    config: GatewayConfig,
    agent: Agent,
    sessions: SessionManager,
}

impl Gateway {
    /// Build a gateway with the backends named in `config`.
    pub fn from_config(config: GatewayConfig) -> Result<Self> {
        config.validate().map_err(GatewayError::from)?;

        let tz = config.timezone.offset()?;
        let calendar = calendar::from_config(&config.calendar, tz, &config.timezone.name)?;
        let model: Arc<dyn LanguageModel> = Arc::new(GeminiModel::from_config(&config.model)?);

        Self::with_parts(config, calendar, model, Arc::new(SystemClock))
    }

    /// Build a gateway around explicit backends.
    pub fn with_parts(
        config: GatewayConfig,
        calendar: Arc<dyn CalendarBackend>,
        model: Arc<dyn LanguageModel>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let tz = config.timezone.offset()?;
        tracing::info!(
            "Gateway using calendar '{}', model '{}', zone {} ({})",
            calendar.name(),
            model.name(),
            config.timezone.name,
            tz
        );

        let tools = ToolBox::new(calendar, model.clone(), clock, tz, &config.timezone.name);
        let agent = Agent::new(tools, model)
            .with_temperature(config.model.temperature)
            .with_max_iterations(config.model.max_iterations)
            .with_max_history(config.session.max_history);
        let sessions = SessionManager::with_config(SessionManagerConfig::from(&config.session));

        Ok(Self {
            config,
            agent,
            sessions,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Process a chat message within the conversation `session_id`.
    ///
    /// The conversation stays locked for the whole turn, so messages of
    /// one conversation run one after another.
    pub async fn process_message(
        &self,
        session_id: Option<&str>,
        message: &str,
    ) -> Result<ChatOutcome> {
        self.sessions.cleanup_expired().await;

        let handle = self.sessions.get_or_create(session_id).await?;
        let mut session = handle.lock().await;

        let response = self.agent.chat(&mut session, message).await?;

        Ok(ChatOutcome {
            session_id: session.id.clone(),
            response,
        })
    }

    /// Free slots for a date, outside of any conversation.
    pub async fn availability(&self, date: &str) -> String {
        let mut desk = BookingDesk::new();
        self.agent
            .tools()
            .invoke(ToolCall::CheckAvailability { date: date.to_string() }, &mut desk)
            .await
    }

    /// Serve HTTP until the listener fails.
    pub async fn run(self) -> Result<()> {
        let server = GatewayServer::new(Arc::new(self));
        server.start().await.map_err(Into::into)
    }
}
