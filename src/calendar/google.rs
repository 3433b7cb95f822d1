//! Google Calendar v3 backend.
//!
//! Uses the `freeBusy` query for availability and `events.insert` for
//! bookings, authenticated with an OAuth bearer access token.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::CalendarBackend;
use crate::error::CalendarError;
use crate::gateway::config::CalendarConfig;
use crate::types::{AppointmentRequest, BusyInterval, EventReceipt, LocalTime};

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

/// Client for one Google calendar.
pub struct GoogleCalendar {
    http: reqwest::Client,
    base_url: Url,
    calendar_id: String,
    access_token: String,
    tz: FixedOffset,
    tz_name: String,
}

#[derive(Deserialize)]
struct FreeBusyResponse {
    #[serde(default)]
    calendars: HashMap<String, FreeBusyCalendar>,
}

#[derive(Deserialize)]
struct FreeBusyCalendar {
    #[serde(default)]
    busy: Vec<RawBusy>,
    #[serde(default)]
    errors: Vec<FreeBusyFault>,
}

#[derive(Deserialize)]
struct RawBusy {
    start: Option<String>,
    end: Option<String>,
}

#[derive(Deserialize)]
struct FreeBusyFault {
    #[serde(default)]
    domain: String,
    #[serde(default)]
    reason: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertedEvent {
    id: String,
    html_link: Option<String>,
}

impl GoogleCalendar {
    /// Creates a client for `calendar_id` with a custom base URL.
    pub fn new(
        base_url: &str,
        calendar_id: &str,
        access_token: &str,
        tz: FixedOffset,
        tz_name: &str,
        timeout: Duration,
    ) -> Result<Self, CalendarError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| CalendarError::Config(format!("invalid base url '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(CalendarError::Config(format!("'{}' cannot be a base url", base_url)));
        }
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url,
            calendar_id: calendar_id.to_string(),
            access_token: access_token.to_string(),
            tz,
            tz_name: tz_name.to_string(),
        })
    }

    /// Creates a client from the `calendar` config section.
    pub fn from_config(
        config: &CalendarConfig,
        tz: FixedOffset,
        tz_name: &str,
    ) -> Result<Self, CalendarError> {
        let token = config
            .access_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CalendarError::Auth("calendar.access_token is not set".to_string()))?;

        Self::new(
            &config.base_url,
            &config.calendar_id,
            token,
            tz,
            tz_name,
            Duration::from_secs(config.request_timeout_seconds),
        )
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, CalendarError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| CalendarError::Config(format!("'{}' cannot be a base url", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn parse_instant(&self, value: Option<&str>, field: &str) -> Result<LocalTime, CalendarError> {
        let raw = value.ok_or_else(|| CalendarError::Malformed(format!("busy interval without {}", field)))?;
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&self.tz))
            .map_err(|e| CalendarError::Malformed(format!("bad {} '{}': {}", field, raw, e)))
    }

    fn decode_busy(&self, body: serde_json::Value) -> Result<Vec<BusyInterval>, CalendarError> {
        let response: FreeBusyResponse =
            serde_json::from_value(body).map_err(|e| CalendarError::Malformed(e.to_string()))?;

        let calendar = response.calendars.get(&self.calendar_id).ok_or_else(|| {
            CalendarError::Malformed(format!("no free/busy entry for '{}'", self.calendar_id))
        })?;

        if !calendar.errors.is_empty() {
            let reasons: Vec<String> = calendar
                .errors
                .iter()
                .map(|f| format!("{}: {}", f.domain, f.reason))
                .collect();
            return Err(CalendarError::Api {
                status: 200,
                message: reasons.join(", "),
            });
        }

        calendar
            .busy
            .iter()
            .map(|raw| {
                Ok(BusyInterval::new(
                    self.parse_instant(raw.start.as_deref(), "start")?,
                    self.parse_instant(raw.end.as_deref(), "end")?,
                ))
            })
            .collect()
    }
}

/// Pass a 2xx response through, otherwise turn it into `CalendarError::Api`.
///
/// The message is `error.message` of a JSON body, or the raw body text.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, CalendarError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await?;
    let message = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|body| {
            body.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| match text.trim() {
            "" => "Unknown error".to_string(),
            raw => raw.to_string(),
        });
    Err(CalendarError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl CalendarBackend for GoogleCalendar {
    fn name(&self) -> &str {
        "google"
    }

    #[instrument(skip(self), fields(calendar = %self.calendar_id))]
    async fn busy_intervals(
        &self,
        start: LocalTime,
        end: LocalTime,
    ) -> Result<Vec<BusyInterval>, CalendarError> {
        let body = serde_json::json!({
            "timeMin": start.to_rfc3339(),
            "timeMax": end.to_rfc3339(),
            "timeZone": self.tz_name,
            "items": [{ "id": self.calendar_id }],
        });

        debug!("Querying free/busy");

        let response = self
            .http
            .post(self.endpoint(&["freeBusy"])?)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;

        let response_body: serde_json::Value = check_status(response).await?.json().await?;

        let busy = self.decode_busy(response_body)?;
        debug!("Received {} busy intervals", busy.len());
        Ok(busy)
    }

    #[instrument(skip(self, event), fields(calendar = %self.calendar_id, title = %event.title))]
    async fn create_event(&self, event: &AppointmentRequest) -> Result<EventReceipt, CalendarError> {
        let body = serde_json::json!({
            "summary": event.title,
            "description": event.description,
            "start": {
                "dateTime": event.start_time.to_rfc3339(),
                "timeZone": self.tz_name,
            },
            "end": {
                "dateTime": event.end_time.to_rfc3339(),
                "timeZone": self.tz_name,
            },
        });

        debug!("Inserting event");

        let response = self
            .http
            .post(self.endpoint(&["calendars", self.calendar_id.as_str(), "events"])?)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;

        let response_body: serde_json::Value = check_status(response).await?.json().await?;

        let inserted: InsertedEvent = serde_json::from_value(response_body)
            .map_err(|e| CalendarError::Malformed(e.to_string()))?;

        tracing::info!("Created event {}", inserted.id);
        Ok(EventReceipt::created(&inserted.id, inserted.html_link))
    }
}
