//! System instruction sent with every tool-enabled completion.

use crate::booking::BookingDesk;
use crate::types::LocalTime;

const GUIDELINES: &str = "You are a helpful AI assistant that helps users book appointments on their Google Calendar.

Your capabilities:
1. Check calendar availability for specific dates
2. Suggest available time slots
3. Book appointments with user confirmation
4. Handle natural language requests conversationally

Guidelines:
- Always be polite and conversational
- Confirm details before booking
- Ask for clarification when needed
- Provide clear available time slots
- Handle date parsing naturally (today, tomorrow, specific dates)
- For booking, always confirm: title, date, time, and duration

When booking appointments:
- Always confirm all details with the user first
- Ask for a title/purpose for the appointment
- Clarify the duration if not specified (default to 1 hour)
- Show available time slots before booking
- book_appointment only records a pending booking and returns a booking id
- When the user answers yes or no, call confirm_booking with that answer and the booking id
- Pass times to book_appointment as YYYY-MM-DDTHH:MM:SS in the user's local time";

/// Build the system instruction for one turn.
pub fn system_prompt(now: LocalTime, tz_name: &str, bookings: &BookingDesk) -> String {
    let mut prompt = format!(
        "{}\n\nThe current local time is {} ({}, UTC{}).",
        GUIDELINES,
        now.format("%A, %Y-%m-%d %H:%M"),
        tz_name,
        now.offset()
    );

    if bookings.is_empty() {
        prompt.push_str("\nThere are no bookings waiting for confirmation.");
    } else {
        prompt.push_str("\nBookings waiting for confirmation:");
        for pending in bookings.pending() {
            prompt.push_str(&format!(
                "\n- {}: '{}' on {}{}",
                pending.id,
                pending.details.title,
                pending.details.span(),
                if pending.requires_force_confirmation {
                    " (clashes with an existing event)"
                } else {
                    ""
                }
            ));
        }
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::InMemoryCalendar;
    use crate::types::AppointmentRequest;
    use chrono::DateTime;

    fn at(s: &str) -> LocalTime {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn test_prompt_mentions_current_time() {
        let prompt = system_prompt(at("2026-10-14T13:15:00+05:30"), "Asia/Kolkata", &BookingDesk::new());
        assert!(prompt.contains("Wednesday, 2026-10-14 13:15 (Asia/Kolkata, UTC+05:30)"));
        assert!(prompt.contains("no bookings waiting"));
    }

    #[tokio::test]
    async fn test_prompt_lists_pending_bookings() {
        let calendar = InMemoryCalendar::new();
        let mut desk = BookingDesk::new();
        let submission = desk
            .submit(
                AppointmentRequest::new("Dentist", at("2026-10-15T14:00:00+05:30"), at("2026-10-15T15:00:00+05:30")),
                at("2026-10-14T13:15:00+05:30"),
                &calendar,
            )
            .await
            .unwrap();

        let prompt = system_prompt(at("2026-10-14T13:15:00+05:30"), "Asia/Kolkata", &desk);
        assert!(prompt.contains(&format!(
            "- {}: 'Dentist' on 2026-10-15 from 02:00 PM to 03:00 PM",
            submission.id
        )));
    }
}
