//! In-process calendar backend.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::CalendarBackend;
use crate::error::CalendarError;
use crate::types::{AppointmentRequest, BusyInterval, EventReceipt, LocalTime};

/// Calendar held entirely in memory.
///
/// Created events become busy time. Query and write counters let callers
/// observe whether the calendar was touched at all.
#[derive(Default)]
pub struct InMemoryCalendar {
    busy: RwLock<Vec<BusyInterval>>,
    events: RwLock<Vec<(String, AppointmentRequest)>>,
    queries: AtomicUsize,
    writes: AtomicUsize,
    unavailable: AtomicBool,
}

impl InMemoryCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with the given busy intervals.
    pub fn with_busy(busy: Vec<BusyInterval>) -> Self {
        Self {
            busy: RwLock::new(busy),
            ..Default::default()
        }
    }

    /// Make every subsequent call fail, as an unreachable API would.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of busy-interval queries served.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Number of event writes attempted.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Events created so far, oldest first.
    pub async fn events(&self) -> Vec<AppointmentRequest> {
        self.events.read().await.iter().map(|(_, e)| e.clone()).collect()
    }

    fn check_available(&self) -> Result<(), CalendarError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(CalendarError::Api {
                status: 503,
                message: "calendar unavailable".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CalendarBackend for InMemoryCalendar {
    fn name(&self) -> &str {
        "memory"
    }

    async fn busy_intervals(
        &self,
        start: LocalTime,
        end: LocalTime,
    ) -> Result<Vec<BusyInterval>, CalendarError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let busy = self.busy.read().await;
        Ok(busy
            .iter()
            .filter(|b| b.overlaps(start, end))
            .map(|b| BusyInterval::new(b.start.max(start), b.end.min(end)))
            .collect())
    }

    async fn create_event(&self, event: &AppointmentRequest) -> Result<EventReceipt, CalendarError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let id = format!("mem-{}", self.events.read().await.len() + 1);
        self.events.write().await.push((id.clone(), event.clone()));
        self.busy
            .write()
            .await
            .push(BusyInterval::new(event.start_time, event.end_time));

        tracing::debug!("Stored event {} '{}'", id, event.title);
        Ok(EventReceipt::created(&id, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn at(hm: &str) -> LocalTime {
        DateTime::parse_from_rfc3339(&format!("2026-10-15T{}:00+05:30", hm)).unwrap()
    }

    #[test]
    fn test_busy_intervals_are_clipped_to_range() {
        let calendar = InMemoryCalendar::with_busy(vec![
            BusyInterval::new(at("08:00"), at("10:00")),
            BusyInterval::new(at("12:00"), at("13:00")),
            BusyInterval::new(at("20:00"), at("21:00")),
        ]);

        let busy = tokio_test::block_on(calendar.busy_intervals(at("09:00"), at("17:00"))).unwrap();
        assert_eq!(
            busy,
            vec![
                BusyInterval::new(at("09:00"), at("10:00")),
                BusyInterval::new(at("12:00"), at("13:00")),
            ]
        );
        assert_eq!(calendar.query_count(), 1);
    }

    #[tokio::test]
    async fn test_created_event_becomes_busy() {
        let calendar = InMemoryCalendar::new();
        let request = AppointmentRequest::new("Standup", at("10:00"), at("10:30"));

        let receipt = calendar.create_event(&request).await.unwrap();
        assert!(receipt.success);
        assert_eq!(receipt.event_id.as_deref(), Some("mem-1"));

        let busy = calendar.busy_intervals(at("00:00"), at("23:59")).await.unwrap();
        assert_eq!(busy, vec![BusyInterval::new(at("10:00"), at("10:30"))]);
        assert_eq!(calendar.events().await, vec![request]);
    }

    #[tokio::test]
    async fn test_unavailable_calendar_errors() {
        let calendar = InMemoryCalendar::new();
        calendar.set_unavailable(true);

        assert!(calendar.busy_intervals(at("00:00"), at("23:59")).await.is_err());
        assert_eq!(calendar.query_count(), 1);
    }
}
