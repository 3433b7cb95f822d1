//! # appointment-agent
//!
//! Conversational appointment booking over a calendar.
//!
//! ## Overview
//!
//! A user chats with the assistant in natural language. A tool-calling
//! language model decides when to look up free slots, suggest times or park
//! a booking, and every booking waits for an explicit yes before it is
//! written to the calendar.
//!
//! ## Core Concepts
//!
//! - **Interval engine**: free slots of a day from its busy intervals
//! - **Booking desk**: per-conversation pending bookings addressed by id
//! - **Tools**: a closed set of typed operations the model can invoke
//! - **Agent**: the bounded tool loop driving one chat turn
//!
//! ## Example
//!
//! ```rust,ignore
//! use appointment_agent::{Gateway, GatewayConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GatewayConfig::load("config.json")?;
//!     let gateway = Gateway::from_config(config)?;
//!     gateway.run().await?;
//!     Ok(())
//! }
//! ```

pub mod types;
pub mod error;
pub mod calendar;
pub mod booking;
pub mod tools;
pub mod agent;
pub mod gateway;
pub mod cli;

// Re-export commonly used types
pub use types::{
    AppointmentRequest,
    BookingId,
    BusyInterval,
    Clock,
    EventReceipt,
    FreeInterval,
    LocalTime,
};
pub use error::{Error, Result};
pub use agent::{Agent, LanguageModel};
pub use booking::BookingDesk;
pub use calendar::CalendarBackend;
pub use gateway::{Gateway, GatewayConfig};
pub use tools::{ToolBox, ToolCall};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
