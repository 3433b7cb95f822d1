//! Core types for appointment-agent.
//!
//! This module defines the fundamental types used throughout the system,
//! including time intervals, appointment requests, booking identifiers and
//! the clock every time-sensitive operation reads "now" from.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// An instant in the assistant's fixed local zone.
pub type LocalTime = DateTime<FixedOffset>;

/// A range already occupied on the calendar, half-open `[start, end)`.
///
/// Produced by the calendar backend. `start < end` is expected but not
/// enforced here; the interval engine rejects malformed values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: LocalTime,
    pub end: LocalTime,
}

impl BusyInterval {
    pub fn new(start: LocalTime, end: LocalTime) -> Self {
        Self { start, end }
    }

    /// Whether this interval shares any time with `[start, end)`.
    ///
    /// Touching endpoints do not count as an overlap.
    pub fn overlaps(&self, start: LocalTime, end: LocalTime) -> bool {
        self.start < end && self.end > start
    }
}

/// A range within a day not covered by any busy interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeInterval {
    pub start: LocalTime,
    pub end: LocalTime,
}

impl FreeInterval {
    pub fn new(start: LocalTime, end: LocalTime) -> Self {
        Self { start, end }
    }

    /// Render as `HH:MM AM - HH:MM PM`.
    pub fn display(&self) -> String {
        format!(
            "{} - {}",
            self.start.format("%I:%M %p"),
            self.end.format("%I:%M %p")
        )
    }
}

impl fmt::Display for FreeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// A validated-at-submission request to put an event on the calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentRequest {
    pub title: String,
    pub start_time: LocalTime,
    pub end_time: LocalTime,
    #[serde(default)]
    pub description: String,
}

impl AppointmentRequest {
    pub fn new(title: &str, start_time: LocalTime, end_time: LocalTime) -> Self {
        Self {
            title: title.to_string(),
            start_time,
            end_time,
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Human readable time span, e.g. `2026-10-15 from 02:00 PM to 03:00 PM`.
    pub fn span(&self) -> String {
        if self.start_time.date_naive() == self.end_time.date_naive() {
            format!(
                "{} from {} to {}",
                self.start_time.format("%Y-%m-%d"),
                self.start_time.format("%I:%M %p"),
                self.end_time.format("%I:%M %p")
            )
        } else {
            format!(
                "{} to {}",
                self.start_time.format("%Y-%m-%d %I:%M %p"),
                self.end_time.format("%Y-%m-%d %I:%M %p")
            )
        }
    }
}

/// Outcome of writing an event to the calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventReceipt {
    pub success: bool,
    pub event_id: Option<String>,
    pub event_link: Option<String>,
    pub message: String,
}

impl EventReceipt {
    pub fn created(event_id: &str, event_link: Option<String>) -> Self {
        Self {
            success: true,
            event_id: Some(event_id.to_string()),
            event_link,
            message: "Event created successfully!".to_string(),
        }
    }
}

/// Identifier handed out by `book_appointment` and referenced by
/// `confirm_booking`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookingId(Uuid);

impl BookingId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for BookingId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> LocalTime {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn test_overlap_ignores_touching_intervals() {
        let busy = BusyInterval::new(at("2026-10-15T09:00:00+05:30"), at("2026-10-15T10:00:00+05:30"));

        assert!(busy.overlaps(at("2026-10-15T09:30:00+05:30"), at("2026-10-15T11:00:00+05:30")));
        assert!(busy.overlaps(at("2026-10-15T08:00:00+05:30"), at("2026-10-15T12:00:00+05:30")));
        assert!(!busy.overlaps(at("2026-10-15T10:00:00+05:30"), at("2026-10-15T11:00:00+05:30")));
        assert!(!busy.overlaps(at("2026-10-15T08:00:00+05:30"), at("2026-10-15T09:00:00+05:30")));
    }

    #[test]
    fn test_free_interval_display() {
        let free = FreeInterval::new(at("2026-10-15T09:05:00+05:30"), at("2026-10-15T13:30:00+05:30"));
        assert_eq!(free.display(), "09:05 AM - 01:30 PM");
    }

    #[test]
    fn test_booking_id_parse() {
        let id = BookingId::generate();
        let parsed: BookingId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-an-id".parse::<BookingId>().is_err());
    }

    #[test]
    fn test_request_span() {
        let request = AppointmentRequest::new(
            "Dentist",
            at("2026-10-15T14:00:00+05:30"),
            at("2026-10-15T15:00:00+05:30"),
        );
        assert_eq!(request.span(), "2026-10-15 from 02:00 PM to 03:00 PM");
    }
}
