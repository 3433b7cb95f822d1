//! Pending-booking confirmation workflow.
//!
//! A booking request is never written straight to the calendar. It is
//! checked for clashes, parked on the conversation's `BookingDesk` under a
//! fresh `BookingId`, and only persisted once the user answers yes.
//!
//! ```text
//! book_appointment ──▶ submit ──▶ [pending: id → booking] ──▶ resolve ──▶ create_event
//!                                                              └─────▶ discard
//! ```

use chrono::{DateTime, Utc};

use crate::calendar::CalendarBackend;
use crate::error::ToolError;
use crate::types::{AppointmentRequest, BookingId, LocalTime};

/// A request accepted but not yet confirmed.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingBooking {
    pub id: BookingId,
    pub details: AppointmentRequest,
    /// Set when the slot overlapped existing busy time.
    pub requires_force_confirmation: bool,
    pub submitted_at: DateTime<Utc>,
}

/// Whether a submitted slot overlapped busy time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStatus {
    Clash,
    Clean,
}

/// Outcome of `BookingDesk::submit`.
#[derive(Debug, Clone)]
pub struct Submission {
    pub id: BookingId,
    pub status: SubmissionStatus,
    /// Confirmation prompt for the user
    pub message: String,
}

/// Bookings awaiting a yes/no answer within one conversation.
///
/// Entries are kept in submission order and addressed by id.
#[derive(Debug, Default, Clone)]
pub struct BookingDesk {
    pending: Vec<PendingBooking>,
}

/// Accepted affirmatives, compared case-insensitively.
const AFFIRMATIVES: [&str; 2] = ["yes", "y"];

impl BookingDesk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Outstanding bookings, oldest first.
    pub fn pending(&self) -> &[PendingBooking] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Validate a request, check it for clashes and park it.
    pub async fn submit(
        &mut self,
        request: AppointmentRequest,
        now: LocalTime,
        calendar: &dyn CalendarBackend,
    ) -> Result<Submission, ToolError> {
        if request.start_time >= request.end_time {
            return Err(ToolError::InvalidRange {
                start: request.start_time.format("%Y-%m-%d %I:%M %p").to_string(),
                end: request.end_time.format("%Y-%m-%d %I:%M %p").to_string(),
            });
        }
        if request.start_time < now {
            return Err(ToolError::InThePast {
                start: request.start_time.format("%Y-%m-%d %I:%M %p").to_string(),
            });
        }

        let busy = calendar
            .busy_intervals(request.start_time, request.end_time)
            .await?;
        let clash = busy
            .iter()
            .any(|b| b.overlaps(request.start_time, request.end_time));

        let id = BookingId::generate();
        let message = if clash {
            format!(
                "'{}' on {} clashes with an existing event. Do you want to book it anyway? Reply yes or no (booking id {}).",
                request.title,
                request.span(),
                id
            )
        } else {
            format!(
                "Please confirm booking '{}' on {}. Reply yes or no (booking id {}).",
                request.title,
                request.span(),
                id
            )
        };

        tracing::info!(
            "Booking {} submitted for '{}' (clash: {})",
            id,
            request.title,
            clash
        );

        self.pending.push(PendingBooking {
            id,
            details: request,
            requires_force_confirmation: clash,
            submitted_at: now.with_timezone(&Utc),
        });

        Ok(Submission {
            id,
            status: if clash { SubmissionStatus::Clash } else { SubmissionStatus::Clean },
            message,
        })
    }

    /// Answer a pending booking.
    ///
    /// Without an id the single outstanding booking is meant; with several
    /// outstanding the answer is ambiguous and nothing is removed.
    pub async fn resolve(
        &mut self,
        id: Option<BookingId>,
        answer: &str,
        calendar: &dyn CalendarBackend,
    ) -> Result<String, ToolError> {
        let index = match id {
            Some(id) => self
                .pending
                .iter()
                .position(|p| p.id == id)
                .ok_or_else(|| ToolError::NoPendingBooking(Some(id.to_string())))?,
            None => match self.pending.len() {
                0 => return Err(ToolError::NoPendingBooking(None)),
                1 => 0,
                _ => {
                    return Err(ToolError::AmbiguousBooking(
                        self.pending.iter().map(|p| p.id.to_string()).collect(),
                    ))
                }
            },
        };

        let booking = self.pending.remove(index);
        let answer = answer.trim().to_lowercase();

        if !AFFIRMATIVES.contains(&answer.as_str()) {
            tracing::info!("Booking {} cancelled", booking.id);
            return Ok(format!(
                "Okay, I cancelled the booking for '{}'.",
                booking.details.title
            ));
        }

        if booking.requires_force_confirmation {
            tracing::warn!("Booking {} confirmed despite a clash", booking.id);
        }

        let receipt = calendar
            .create_event(&booking.details)
            .await
            .map_err(|e| ToolError::ExternalCalendarFailure(e.to_string()))?;
        tracing::info!(
            "Booking {} resolved (success: {}, event: {:?})",
            booking.id,
            receipt.success,
            receipt.event_id
        );
        Ok(receipt.message)
    }
}
