//! Calendar access for appointment-agent.
//!
//! The assistant only needs two things from a calendar: the busy intervals
//! of a time range, and a way to persist a new event. Both are expressed by
//! the `CalendarBackend` trait so that the Google Calendar client and the
//! in-process calendar are interchangeable.
//!
//! ## Backends
//!
//! | Backend | Provider key | Notes |
//! |---------|--------------|-------|
//! | Google Calendar v3 | `google` | bearer access token |
//! | In-memory | `memory` | local runs and tests |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::FixedOffset;

use crate::error::CalendarError;
use crate::gateway::config::{CalendarConfig, CalendarProvider};
use crate::types::{AppointmentRequest, BusyInterval, EventReceipt, LocalTime};

pub mod google;
pub mod intervals;
pub mod memory;

pub use google::GoogleCalendar;
pub use intervals::{compute_free_intervals, day_window, free_intervals, localize};
pub use memory::InMemoryCalendar;

/// Trait that all calendar backends must implement.
#[async_trait]
pub trait CalendarBackend: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Busy intervals overlapping `[start, end]`, confined to that range.
    ///
    /// A failed query is an error, never an empty list.
    async fn busy_intervals(
        &self,
        start: LocalTime,
        end: LocalTime,
    ) -> Result<Vec<BusyInterval>, CalendarError>;

    /// Persist an event.
    async fn create_event(&self, event: &AppointmentRequest) -> Result<EventReceipt, CalendarError>;
}

/// Build the backend selected by configuration.
pub fn from_config(
    config: &CalendarConfig,
    tz: FixedOffset,
    tz_name: &str,
) -> Result<Arc<dyn CalendarBackend>, CalendarError> {
    match config.provider {
        CalendarProvider::Google => {
            let calendar = GoogleCalendar::from_config(config, tz, tz_name)?;
            tracing::info!("Using Google calendar '{}'", config.calendar_id);
            Ok(Arc::new(calendar))
        }
        CalendarProvider::Memory => {
            tracing::warn!("Using in-memory calendar; events are not persisted");
            Ok(Arc::new(InMemoryCalendar::new()))
        }
    }
}
