//! Tools the agent can call.
//!
//! The set of tools is closed: every invocation coming back from the model
//! is decoded into a `ToolCall` variant with typed arguments before it runs,
//! and dispatch is a plain `match`.
//!
//! | Tool | Arguments |
//! |------|-----------|
//! | `check_availability` | `date` |
//! | `suggest_suitable_time` | `date`, `query` |
//! | `book_appointment` | `title`, `start_time`, `end_time`, `description` |
//! | `confirm_booking` | `answer`, `booking_id` |
//! | `get_current_date` | none |
//!
//! Tools never fail structurally. Every `ToolError` is turned into the text
//! the model relays to the user.

use std::sync::Arc;

use chrono::FixedOffset;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::agent::model::{CompletionRequest, LanguageModel, ModelReply, ToolSpec};
use crate::booking::BookingDesk;
use crate::calendar::{compute_free_intervals, day_window, CalendarBackend};
use crate::error::ToolError;
use crate::types::{AppointmentRequest, BookingId, Clock, LocalTime};

pub mod dates;

use dates::{format_timestamp, parse_date_token, parse_instant};

/// The tools known to the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    CheckAvailability,
    SuggestSuitableTime,
    BookAppointment,
    ConfirmBooking,
    GetCurrentDate,
}

impl ToolKind {
    pub const ALL: [ToolKind; 5] = [
        ToolKind::CheckAvailability,
        ToolKind::SuggestSuitableTime,
        ToolKind::BookAppointment,
        ToolKind::ConfirmBooking,
        ToolKind::GetCurrentDate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::CheckAvailability => "check_availability",
            ToolKind::SuggestSuitableTime => "suggest_suitable_time",
            ToolKind::BookAppointment => "book_appointment",
            ToolKind::ConfirmBooking => "confirm_booking",
            ToolKind::GetCurrentDate => "get_current_date",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            ToolKind::CheckAvailability => {
                "Check available time slots for a specific date. Input: date in YYYY-MM-DD format, 'today', or 'tomorrow'."
            }
            ToolKind::SuggestSuitableTime => {
                "Suggest a suitable time for a task on a date, taking existing events into account. Input: date and a description of the task."
            }
            ToolKind::BookAppointment => {
                "Request a booking. Input: title, start_time, end_time (ISO 8601, local time) and optional description. Returns a booking id that must be confirmed with confirm_booking."
            }
            ToolKind::ConfirmBooking => {
                "Confirm or cancel a pending booking. Input: the user's answer ('yes' or 'no') and the booking id returned by book_appointment."
            }
            ToolKind::GetCurrentDate => "Get the current date and time",
        }
    }

    /// JSON schema of the arguments object.
    pub fn parameters(&self) -> Value {
        match self {
            ToolKind::CheckAvailability => json!({
                "type": "object",
                "properties": {
                    "date": {"type": "string", "description": "YYYY-MM-DD, 'today' or 'tomorrow'"}
                },
                "required": ["date"]
            }),
            ToolKind::SuggestSuitableTime => json!({
                "type": "object",
                "properties": {
                    "date": {"type": "string", "description": "YYYY-MM-DD, 'today' or 'tomorrow'"},
                    "query": {"type": "string", "description": "What the user wants to schedule"}
                },
                "required": ["date", "query"]
            }),
            ToolKind::BookAppointment => json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string"},
                    "start_time": {"type": "string", "description": "YYYY-MM-DDTHH:MM:SS"},
                    "end_time": {"type": "string", "description": "YYYY-MM-DDTHH:MM:SS"},
                    "description": {"type": "string"}
                },
                "required": ["title", "start_time", "end_time"]
            }),
            ToolKind::ConfirmBooking => json!({
                "type": "object",
                "properties": {
                    "answer": {"type": "string", "description": "'yes' or 'no'"},
                    "booking_id": {"type": "string"}
                },
                "required": ["answer"]
            }),
            ToolKind::GetCurrentDate => json!({
                "type": "object",
                "properties": {}
            }),
        }
    }

    pub fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }

    /// Declarations for every tool.
    pub fn specs() -> Vec<ToolSpec> {
        Self::ALL.iter().map(ToolKind::spec).collect()
    }
}

/// Arguments of `suggest_suitable_time`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SuggestArgs {
    pub date: String,
    pub query: String,
}

fn default_title() -> String {
    "Appointment".to_string()
}

/// Arguments of `book_appointment`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BookingArgs {
    #[serde(default = "default_title")]
    pub title: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub description: String,
}

/// Arguments of `confirm_booking`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConfirmArgs {
    #[serde(alias = "input")]
    pub answer: String,
    #[serde(default)]
    pub booking_id: Option<String>,
}

/// A decoded tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    CheckAvailability { date: String },
    SuggestSuitableTime(SuggestArgs),
    BookAppointment(BookingArgs),
    ConfirmBooking(ConfirmArgs),
    GetCurrentDate,
}

/// A bare string argument, or one field of an arguments object.
fn text_arg(arguments: &Value, field: &str) -> Option<String> {
    match arguments {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map
            .get(field)
            .or_else(|| map.get("input"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

/// An arguments object, possibly sent as a JSON-encoded string.
fn struct_arg<T: DeserializeOwned>(arguments: &Value, hint: &str) -> Result<T, ToolError> {
    let parsed = match arguments {
        Value::String(s) => serde_json::from_str(s),
        other => serde_json::from_value(other.clone()),
    };
    parsed.map_err(|e| ToolError::InvalidInputFormat(format!("{} ({})", hint, e)))
}

impl ToolCall {
    pub fn kind(&self) -> ToolKind {
        match self {
            ToolCall::CheckAvailability { .. } => ToolKind::CheckAvailability,
            ToolCall::SuggestSuitableTime(_) => ToolKind::SuggestSuitableTime,
            ToolCall::BookAppointment(_) => ToolKind::BookAppointment,
            ToolCall::ConfirmBooking(_) => ToolKind::ConfirmBooking,
            ToolCall::GetCurrentDate => ToolKind::GetCurrentDate,
        }
    }

    /// Decode a model invocation.
    pub fn from_invocation(name: &str, arguments: &Value) -> Result<Self, ToolError> {
        let kind = ToolKind::from_name(name).ok_or_else(|| {
            ToolError::InvalidInputFormat(format!(
                "Unknown tool '{}'. Available tools: {}.",
                name,
                ToolKind::ALL.map(|k| k.name()).join(", ")
            ))
        })?;

        match kind {
            ToolKind::CheckAvailability => text_arg(arguments, "date")
                .map(|date| ToolCall::CheckAvailability { date })
                .ok_or_else(|| {
                    ToolError::InvalidInputFormat(
                        "Please provide a date in YYYY-MM-DD format, or use 'today' or 'tomorrow'.".to_string(),
                    )
                }),
            ToolKind::SuggestSuitableTime => struct_arg(
                arguments,
                "Please provide the date and a description of the task.",
            )
            .map(ToolCall::SuggestSuitableTime),
            ToolKind::BookAppointment => struct_arg(
                arguments,
                "Please provide appointment details in proper format.",
            )
            .map(ToolCall::BookAppointment),
            ToolKind::ConfirmBooking => match arguments {
                Value::String(answer) => Ok(ToolCall::ConfirmBooking(ConfirmArgs {
                    answer: answer.clone(),
                    booking_id: None,
                })),
                other => struct_arg(other, "Please answer 'yes' or 'no'.").map(ToolCall::ConfirmBooking),
            },
            ToolKind::GetCurrentDate => Ok(ToolCall::GetCurrentDate),
        }
    }
}

/// Executes tool calls against the calendar and the model.
pub struct ToolBox {
    calendar: Arc<dyn CalendarBackend>,
    model: Arc<dyn LanguageModel>,
    clock: Arc<dyn Clock>,
    tz: FixedOffset,
    tz_name: String,
}

impl ToolBox {
    pub fn new(
        calendar: Arc<dyn CalendarBackend>,
        model: Arc<dyn LanguageModel>,
        clock: Arc<dyn Clock>,
        tz: FixedOffset,
        tz_name: &str,
    ) -> Self {
        Self {
            calendar,
            model,
            clock,
            tz,
            tz_name: tz_name.to_string(),
        }
    }

    /// Current instant in the local zone.
    pub fn now(&self) -> LocalTime {
        self.clock.now().with_timezone(&self.tz)
    }

    pub fn timezone_name(&self) -> &str {
        &self.tz_name
    }

    /// Decode and run a model invocation against one conversation's bookings.
    pub async fn dispatch(&self, name: &str, arguments: &Value, bookings: &mut BookingDesk) -> String {
        match ToolCall::from_invocation(name, arguments) {
            Ok(call) => self.invoke(call, bookings).await,
            Err(err) => {
                tracing::warn!("Rejected invocation of '{}': {}", name, err);
                err.to_string()
            }
        }
    }

    /// Run a tool call, turning any failure into user-facing text.
    pub async fn invoke(&self, call: ToolCall, bookings: &mut BookingDesk) -> String {
        let kind = call.kind();
        tracing::info!("Running tool {}", kind.name());

        match self.run(call, bookings).await {
            Ok(reply) => reply,
            Err(err) => {
                tracing::warn!("Tool {} failed: {}", kind.name(), err);
                err.to_string()
            }
        }
    }

    async fn run(&self, call: ToolCall, bookings: &mut BookingDesk) -> Result<String, ToolError> {
        match call {
            ToolCall::CheckAvailability { date } => self.check_availability(&date).await,
            ToolCall::SuggestSuitableTime(args) => self.suggest_suitable_time(&args).await,
            ToolCall::BookAppointment(args) => self.book_appointment(&args, bookings).await,
            ToolCall::ConfirmBooking(args) => self.confirm_booking(&args, bookings).await,
            ToolCall::GetCurrentDate => Ok(format_timestamp(self.now())),
        }
    }

    async fn check_availability(&self, date: &str) -> Result<String, ToolError> {
        let now = self.now();
        let day = parse_date_token(date, now.date_naive())?;
        let (start, end) = day_window(day, self.tz);

        let busy = self.calendar.busy_intervals(start, end).await?;
        let skip_before = (day == now.date_naive()).then_some(now);
        let free = compute_free_intervals(day, self.tz, &busy, skip_before)?;

        if free.is_empty() {
            return Ok(format!(
                "No available slots found for {}. Please try another date.",
                day
            ));
        }

        let slots: Vec<String> = free.iter().map(|f| f.display()).collect();
        Ok(format!(
            "Available time slots for {}:\n- {}",
            day,
            slots.join("\n- ")
        ))
    }

    async fn suggest_suitable_time(&self, args: &SuggestArgs) -> Result<String, ToolError> {
        let now = self.now();
        let day = parse_date_token(&args.date, now.date_naive())?;
        let (start, end) = day_window(day, self.tz);

        let busy = self.calendar.busy_intervals(start, end).await?;
        let busy_lines = if busy.is_empty() {
            "- none".to_string()
        } else {
            busy.iter()
                .map(|b| format!("- {} to {}", b.start.format("%I:%M %p"), b.end.format("%I:%M %p")))
                .collect::<Vec<_>>()
                .join("\n")
        };
        let not_before = if day == now.date_naive() {
            format!("\nIt is now {}; do not suggest times that have already passed.", now.format("%I:%M %p"))
        } else {
            String::new()
        };

        let prompt = format!(
            "The user wants to schedule the following task: {}\n\
             Date: {} (times are {} local time)\n\
             Existing busy intervals on that day:\n{}{}\n\n\
             Suggest one or more suitable time slots with a start and end time that do not overlap \
             the busy intervals, and explain the choice in one or two sentences.",
            args.query,
            day,
            self.tz_name,
            busy_lines,
            not_before
        );

        match self.model.complete(&CompletionRequest::prompt(&prompt)).await? {
            ModelReply::Text(text) => Ok(text),
            ModelReply::ToolInvocation { name, .. } => Err(ToolError::LanguageModelFailure(format!(
                "expected a suggestion but the model called '{}'",
                name
            ))),
        }
    }

    async fn book_appointment(
        &self,
        args: &BookingArgs,
        bookings: &mut BookingDesk,
    ) -> Result<String, ToolError> {
        let request = AppointmentRequest::new(
            &args.title,
            parse_instant(&args.start_time, self.tz)?,
            parse_instant(&args.end_time, self.tz)?,
        )
        .with_description(&args.description);

        let submission = bookings
            .submit(request, self.now(), self.calendar.as_ref())
            .await?;
        Ok(submission.message)
    }

    async fn confirm_booking(
        &self,
        args: &ConfirmArgs,
        bookings: &mut BookingDesk,
    ) -> Result<String, ToolError> {
        let id = match args.booking_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(raw.parse::<BookingId>().map_err(|_| {
                ToolError::InvalidInputFormat(format!("'{}' is not a valid booking id.", raw))
            })?),
            None => None,
        };

        bookings.resolve(id, &args.answer, self.calendar.as_ref()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::model::ScriptedModel;
    use crate::calendar::InMemoryCalendar;
    use crate::types::{BusyInterval, FixedClock};
    use chrono::{DateTime, Utc};

    fn ist() -> FixedOffset {
        FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap()
    }

    fn at(s: &str) -> LocalTime {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    struct Fixture {
        calendar: Arc<InMemoryCalendar>,
        model: Arc<ScriptedModel>,
        tools: ToolBox,
    }

    /// Tool box whose clock reads 2026-10-14 13:15 IST.
    fn fixture(busy: Vec<BusyInterval>, replies: Vec<ModelReply>) -> Fixture {
        let calendar = Arc::new(InMemoryCalendar::with_busy(busy));
        let model = Arc::new(ScriptedModel::new(replies));
        let clock = FixedClock(at("2026-10-14T13:15:00+05:30").with_timezone(&Utc));
        let tools = ToolBox::new(calendar.clone(), model.clone(), Arc::new(clock), ist(), "Asia/Kolkata");
        Fixture { calendar, model, tools }
    }

    #[test]
    fn test_decode_string_and_object_arguments() {
        assert_eq!(
            ToolCall::from_invocation("check_availability", &json!("tomorrow")).unwrap(),
            ToolCall::CheckAvailability { date: "tomorrow".to_string() }
        );
        assert_eq!(
            ToolCall::from_invocation("check_availability", &json!({"date": "2026-10-20"})).unwrap(),
            ToolCall::CheckAvailability { date: "2026-10-20".to_string() }
        );
        assert_eq!(
            ToolCall::from_invocation("confirm_booking", &json!("yes")).unwrap(),
            ToolCall::ConfirmBooking(ConfirmArgs { answer: "yes".to_string(), booking_id: None })
        );
        assert_eq!(
            ToolCall::from_invocation("confirm_booking", &json!({"input": "yes"})).unwrap(),
            ToolCall::ConfirmBooking(ConfirmArgs { answer: "yes".to_string(), booking_id: None })
        );
        assert_eq!(
            ToolCall::from_invocation("get_current_date", &Value::Null).unwrap(),
            ToolCall::GetCurrentDate
        );
    }

    #[test]
    fn test_decode_booking_from_json_string() {
        let raw = json!(r#"{"start_time": "2026-10-15T10:00:00", "end_time": "2026-10-15T11:00:00"}"#);
        match ToolCall::from_invocation("book_appointment", &raw).unwrap() {
            ToolCall::BookAppointment(args) => {
                assert_eq!(args.title, "Appointment");
                assert_eq!(args.description, "");
            }
            other => panic!("unexpected call: {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_unknown_and_malformed() {
        let err = ToolCall::from_invocation("delete_calendar", &json!({})).unwrap_err();
        assert!(err.to_string().contains("Unknown tool"));

        let err = ToolCall::from_invocation("book_appointment", &json!("not json")).unwrap_err();
        assert!(err.to_string().starts_with("Please provide appointment details in proper format."));

        let err = ToolCall::from_invocation("check_availability", &json!({"day": 3})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidInputFormat(_)));
    }

    #[test]
    fn test_specs_cover_every_tool() {
        let specs = ToolKind::specs();
        assert_eq!(specs.len(), 5);
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
            assert_eq!(kind.parameters()["type"], "object");
        }
    }

    #[tokio::test]
    async fn test_check_availability_today_skips_elapsed_time() {
        let f = fixture(
            vec![
                BusyInterval::new(at("2026-10-14T09:00:00+05:30"), at("2026-10-14T10:00:00+05:30")),
                BusyInterval::new(at("2026-10-14T15:00:00+05:30"), at("2026-10-14T16:30:00+05:30")),
            ],
            vec![],
        );
        let mut desk = BookingDesk::new();

        let reply = f.tools.dispatch("check_availability", &json!("today"), &mut desk).await;
        assert_eq!(
            reply,
            "Available time slots for 2026-10-14:\n- 01:15 PM - 03:00 PM\n- 04:30 PM - 11:59 PM"
        );
    }

    #[tokio::test]
    async fn test_check_availability_other_day_uses_whole_day() {
        let f = fixture(
            vec![BusyInterval::new(at("2026-10-15T09:00:00+05:30"), at("2026-10-15T17:00:00+05:30"))],
            vec![],
        );
        let mut desk = BookingDesk::new();

        let reply = f.tools.dispatch("check_availability", &json!({"date": "tomorrow"}), &mut desk).await;
        assert_eq!(
            reply,
            "Available time slots for 2026-10-15:\n- 12:00 AM - 09:00 AM\n- 05:00 PM - 11:59 PM"
        );
    }

    #[tokio::test]
    async fn test_check_availability_bad_date_and_failed_calendar() {
        let f = fixture(vec![], vec![]);
        let mut desk = BookingDesk::new();

        let reply = f.tools.dispatch("check_availability", &json!("next week"), &mut desk).await;
        assert_eq!(
            reply,
            "Please provide a valid date in YYYY-MM-DD format, or use 'today' or 'tomorrow'."
        );

        f.calendar.set_unavailable(true);
        let reply = f.tools.dispatch("check_availability", &json!("tomorrow"), &mut desk).await;
        assert!(reply.starts_with("Sorry, I couldn't reach the calendar"), "{}", reply);
    }

    #[tokio::test]
    async fn test_check_availability_fully_booked() {
        let f = fixture(
            vec![BusyInterval::new(at("2026-10-15T00:00:00+05:30"), at("2026-10-15T23:59:00+05:30"))],
            vec![],
        );
        let mut desk = BookingDesk::new();

        let reply = f.tools.dispatch("check_availability", &json!("2026-10-15"), &mut desk).await;
        assert_eq!(reply, "No available slots found for 2026-10-15. Please try another date.");
    }

    #[tokio::test]
    async fn test_suggest_embeds_busy_intervals() {
        let f = fixture(
            vec![BusyInterval::new(at("2026-10-15T09:00:00+05:30"), at("2026-10-15T10:00:00+05:30"))],
            vec![ModelReply::Text("Try 10:00 AM - 11:00 AM.".to_string())],
        );
        let mut desk = BookingDesk::new();

        let reply = f
            .tools
            .dispatch(
                "suggest_suitable_time",
                &json!({"date": "2026-10-15", "query": "a one hour gym session"}),
                &mut desk,
            )
            .await;
        assert_eq!(reply, "Try 10:00 AM - 11:00 AM.");

        let requests = f.model.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].tools.is_empty());
        let prompt = match &requests[0].turns[0] {
            crate::agent::model::ChatTurn::User { text } => text.clone(),
            other => panic!("unexpected turn: {:?}", other),
        };
        assert!(prompt.contains("a one hour gym session"));
        assert!(prompt.contains("- 09:00 AM to 10:00 AM"));
    }

    #[tokio::test]
    async fn test_suggest_reports_model_failure() {
        let f = fixture(vec![], vec![]);
        let mut desk = BookingDesk::new();

        let reply = f
            .tools
            .dispatch("suggest_suitable_time", &json!({"date": "tomorrow", "query": "lunch"}), &mut desk)
            .await;
        assert!(reply.starts_with("Sorry, the language model could not answer"), "{}", reply);
    }

    #[tokio::test]
    async fn test_book_then_confirm_by_id() {
        let f = fixture(vec![], vec![]);
        let mut desk = BookingDesk::new();

        let reply = f
            .tools
            .dispatch(
                "book_appointment",
                &json!({
                    "title": "Dentist",
                    "start_time": "2026-10-15T14:00:00",
                    "end_time": "2026-10-15T15:00:00",
                    "description": "checkup"
                }),
                &mut desk,
            )
            .await;
        assert!(reply.starts_with("Please confirm booking 'Dentist' on 2026-10-15 from 02:00 PM to 03:00 PM"));
        assert_eq!(f.calendar.write_count(), 0);

        let id = desk.pending()[0].id.to_string();
        let reply = f
            .tools
            .dispatch("confirm_booking", &json!({"answer": "Yes", "booking_id": id}), &mut desk)
            .await;
        assert_eq!(reply, "Event created successfully!");

        let events = f.calendar.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].description, "checkup");
    }

    #[tokio::test]
    async fn test_book_in_the_past() {
        let f = fixture(vec![], vec![]);
        let mut desk = BookingDesk::new();

        let reply = f
            .tools
            .dispatch(
                "book_appointment",
                &json!({"title": "Breakfast", "start_time": "2026-10-14T08:00:00", "end_time": "2026-10-14T09:00:00"}),
                &mut desk,
            )
            .await;
        assert!(reply.contains("is in the past"), "{}", reply);
        assert_eq!(f.calendar.query_count(), 0);
    }

    #[tokio::test]
    async fn test_confirm_with_bad_id_or_nothing_pending() {
        let f = fixture(vec![], vec![]);
        let mut desk = BookingDesk::new();

        let reply = f
            .tools
            .dispatch("confirm_booking", &json!({"answer": "yes", "booking_id": "42"}), &mut desk)
            .await;
        assert_eq!(reply, "'42' is not a valid booking id.");

        let reply = f.tools.dispatch("confirm_booking", &json!("yes"), &mut desk).await;
        assert_eq!(reply, "There is no pending booking to confirm.");
        assert_eq!(f.calendar.write_count(), 0);
    }

    #[tokio::test]
    async fn test_get_current_date() {
        let f = fixture(vec![], vec![]);
        let mut desk = BookingDesk::new();

        let reply = f.tools.dispatch("get_current_date", &json!("anything"), &mut desk).await;
        assert_eq!(reply, "2026-10-14 13:15:00");
    }
}
