//! Date and time parsing for tool inputs.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::calendar::localize;
use crate::error::ToolError;
use crate::types::LocalTime;

const DATE_HINT: &str =
    "Please provide a valid date in YYYY-MM-DD format, or use 'today' or 'tomorrow'.";

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Resolve `today`, `tomorrow` or a strict `YYYY-MM-DD` date.
///
/// The relative words match anywhere in the input, ignoring case.
pub fn parse_date_token(input: &str, today: NaiveDate) -> Result<NaiveDate, ToolError> {
    let lowered = input.to_lowercase();
    if lowered.contains("today") {
        return Ok(today);
    }
    if lowered.contains("tomorrow") {
        return Ok(today + Duration::days(1));
    }

    let candidate = input.trim().trim_matches(|c| c == '"' || c == '\'');
    let strict = Regex::new(r"^\d{4}-\d{2}-\d{2}$")
        .map_err(|e| ToolError::InvalidInputFormat(e.to_string()))?;
    if !strict.is_match(candidate) {
        return Err(ToolError::InvalidInputFormat(DATE_HINT.to_string()));
    }

    NaiveDate::parse_from_str(candidate, "%Y-%m-%d")
        .map_err(|_| ToolError::InvalidInputFormat(DATE_HINT.to_string()))
}

/// Parse an appointment instant.
///
/// RFC 3339 values keep their offset and are converted into `tz`; naive
/// values are read as wall-clock time in `tz`.
pub fn parse_instant(input: &str, tz: FixedOffset) -> Result<LocalTime, ToolError> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&tz));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .map(|naive| localize(naive, tz))
        .ok_or_else(|| {
            ToolError::InvalidInputFormat(format!(
                "I couldn't understand the time '{}'. Please use YYYY-MM-DDTHH:MM:SS.",
                input
            ))
        })
}

/// `YYYY-MM-DD HH:MM:SS`
pub fn format_timestamp(now: LocalTime) -> String {
    now.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ist() -> FixedOffset {
        FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 14).unwrap()
    }

    #[test]
    fn test_relative_words_anywhere() {
        assert_eq!(parse_date_token("Today", today()).unwrap(), today());
        assert_eq!(parse_date_token("what about TODAY please", today()).unwrap(), today());
        assert_eq!(
            parse_date_token("tomorrow afternoon", today()).unwrap(),
            NaiveDate::from_ymd_opt(2026, 10, 15).unwrap()
        );
    }

    #[test]
    fn test_strict_iso_date() {
        assert_eq!(
            parse_date_token(" 2026-12-01 ", today()).unwrap(),
            NaiveDate::from_ymd_opt(2026, 12, 1).unwrap()
        );
        assert_eq!(
            parse_date_token("\"2026-12-01\"", today()).unwrap(),
            NaiveDate::from_ymd_opt(2026, 12, 1).unwrap()
        );
    }

    #[test]
    fn test_rejects_loose_dates() {
        for input in ["2026-1-5", "12/01/2026", "next friday", "2026-02-30", ""] {
            let err = parse_date_token(input, today()).unwrap_err();
            assert_eq!(err, ToolError::InvalidInputFormat(DATE_HINT.to_string()), "input {:?}", input);
        }
    }

    #[test]
    fn test_instant_with_offset_is_converted() {
        let t = parse_instant("2026-10-15T08:30:00Z", ist()).unwrap();
        assert_eq!(t.to_rfc3339(), "2026-10-15T14:00:00+05:30");
    }

    #[test]
    fn test_naive_instant_is_local() {
        for input in ["2026-10-15T14:00:00", "2026-10-15T14:00", "2026-10-15 14:00:00", "2026-10-15 14:00"] {
            let t = parse_instant(input, ist()).unwrap();
            assert_eq!(t.to_rfc3339(), "2026-10-15T14:00:00+05:30", "input {:?}", input);
        }
    }

    #[test]
    fn test_bad_instant() {
        assert!(matches!(
            parse_instant("2 pm tomorrow", ist()),
            Err(ToolError::InvalidInputFormat(_))
        ));
    }

    #[test]
    fn test_format_timestamp() {
        let t = parse_instant("2026-10-14T09:05:07", ist()).unwrap();
        assert_eq!(format_timestamp(t), "2026-10-14 09:05:07");
    }
}
