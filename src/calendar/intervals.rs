//! Free-interval computation.
//!
//! Subtracts busy intervals from a window to produce the free gaps, with an
//! optional cutoff below which no free interval may start. The engine does
//! not clip: callers pass busy intervals already confined to the window,
//! which holds for anything returned by a backend queried with that window.

use chrono::{Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};

use crate::error::ToolError;
use crate::types::{BusyInterval, FreeInterval, LocalTime};

/// Attach the fixed offset to a wall-clock time.
pub fn localize(naive: NaiveDateTime, tz: FixedOffset) -> LocalTime {
    let utc = naive - Duration::seconds(i64::from(tz.local_minus_utc()));
    tz.from_utc_datetime(&utc)
}

/// The `[00:00, 23:59]` window of `day` in zone `tz`.
pub fn day_window(day: NaiveDate, tz: FixedOffset) -> (LocalTime, LocalTime) {
    let midnight = day.and_time(NaiveTime::default());
    let last_minute = midnight + Duration::minutes(23 * 60 + 59);
    (localize(midnight, tz), localize(last_minute, tz))
}

/// Free intervals of `day` given its busy intervals.
pub fn compute_free_intervals(
    day: NaiveDate,
    tz: FixedOffset,
    busy: &[BusyInterval],
    skip_before: Option<LocalTime>,
) -> Result<Vec<FreeInterval>, ToolError> {
    let (window_start, window_end) = day_window(day, tz);
    free_intervals(window_start, window_end, busy, skip_before)
}

/// Free intervals of `[window_start, window_end)`.
///
/// The cutoff advances the cursor at most once, at the first point where
/// the cursor is behind it. Overlapping and nested busy intervals merge
/// because the cursor only ever moves forward.
pub fn free_intervals(
    window_start: LocalTime,
    window_end: LocalTime,
    busy: &[BusyInterval],
    skip_before: Option<LocalTime>,
) -> Result<Vec<FreeInterval>, ToolError> {
    if let Some(bad) = busy.iter().find(|b| b.start >= b.end) {
        return Err(ToolError::MalformedInterval(format!(
            "start {} is not before end {}",
            bad.start.to_rfc3339(),
            bad.end.to_rfc3339()
        )));
    }

    let mut sorted = busy.to_vec();
    // stable: equal starts keep input order
    sorted.sort_by_key(|b| b.start);

    let mut free = Vec::new();
    let mut cursor = window_start;
    let mut skip_before = skip_before;

    for interval in &sorted {
        if let Some(cutoff) = skip_before {
            if cursor < cutoff {
                cursor = cutoff;
                skip_before = None;
            }
        }
        if cursor < interval.start {
            free.push(FreeInterval::new(cursor, interval.start));
        }
        cursor = cursor.max(interval.end);
    }

    if let Some(cutoff) = skip_before {
        if cursor < cutoff {
            cursor = cutoff;
        }
    }
    if cursor < window_end {
        free.push(FreeInterval::new(cursor, window_end));
    }

    Ok(free)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn ist() -> FixedOffset {
        FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap()
    }

    fn at(hm: &str) -> LocalTime {
        DateTime::parse_from_rfc3339(&format!("2026-10-15T{}:00+05:30", hm)).unwrap()
    }

    fn busy(start: &str, end: &str) -> BusyInterval {
        BusyInterval::new(at(start), at(end))
    }

    fn spans(free: &[FreeInterval]) -> Vec<(String, String)> {
        free.iter()
            .map(|f| (f.start.format("%H:%M").to_string(), f.end.format("%H:%M").to_string()))
            .collect()
    }

    #[test]
    fn test_empty_busy_list_yields_whole_window() {
        let free = free_intervals(at("09:00"), at("17:00"), &[], None).unwrap();
        assert_eq!(free, vec![FreeInterval::new(at("09:00"), at("17:00"))]);
    }

    #[test]
    fn test_leading_zero_length_gap_is_omitted() {
        let free = free_intervals(at("09:00"), at("17:00"), &[busy("09:00", "10:00")], None).unwrap();
        assert_eq!(spans(&free), vec![("10:00".into(), "17:00".into())]);
    }

    #[test]
    fn test_cutoff_suppresses_earlier_free_time() {
        let free = free_intervals(
            at("09:00"),
            at("17:00"),
            &[busy("09:00", "10:00")],
            Some(at("11:00")),
        )
        .unwrap();
        assert_eq!(spans(&free), vec![("11:00".into(), "17:00".into())]);
    }

    #[test]
    fn test_overlapping_busy_intervals_merge() {
        let free = free_intervals(
            at("09:00"),
            at("17:00"),
            &[busy("10:00", "12:00"), busy("09:00", "11:00")],
            None,
        )
        .unwrap();
        assert_eq!(spans(&free), vec![("12:00".into(), "17:00".into())]);
    }

    #[test]
    fn test_nested_busy_interval_does_not_rewind_cursor() {
        let free = free_intervals(
            at("09:00"),
            at("17:00"),
            &[busy("10:00", "14:00"), busy("11:00", "12:00")],
            None,
        )
        .unwrap();
        assert_eq!(
            spans(&free),
            vec![("09:00".into(), "10:00".into()), ("14:00".into(), "17:00".into())]
        );
    }

    #[test]
    fn test_cutoff_after_window_end_yields_nothing() {
        let free = free_intervals(at("09:00"), at("17:00"), &[], Some(at("18:00"))).unwrap();
        assert!(free.is_empty());

        let free = free_intervals(
            at("09:00"),
            at("17:00"),
            &[busy("10:00", "11:00")],
            Some(at("18:00")),
        )
        .unwrap();
        assert!(free.is_empty());
    }

    #[test]
    fn test_cutoff_before_window_start_is_ignored() {
        let free = free_intervals(at("09:00"), at("17:00"), &[], Some(at("08:00"))).unwrap();
        assert_eq!(spans(&free), vec![("09:00".into(), "17:00".into())]);
    }

    #[test]
    fn test_cutoff_inside_busy_interval() {
        let free = free_intervals(
            at("09:00"),
            at("17:00"),
            &[busy("10:00", "12:00"), busy("14:00", "15:00")],
            Some(at("11:00")),
        )
        .unwrap();
        assert_eq!(
            spans(&free),
            vec![("12:00".into(), "14:00".into()), ("15:00".into(), "17:00".into())]
        );
    }

    #[test]
    fn test_malformed_interval_fails() {
        let err = free_intervals(at("09:00"), at("17:00"), &[busy("11:00", "10:00")], None).unwrap_err();
        assert!(matches!(err, ToolError::MalformedInterval(_)));

        let err = free_intervals(at("09:00"), at("17:00"), &[busy("11:00", "11:00")], None).unwrap_err();
        assert!(matches!(err, ToolError::MalformedInterval(_)));
    }

    #[test]
    fn test_free_and_busy_tile_the_window() {
        let busy_list = vec![
            busy("09:30", "10:00"),
            busy("11:00", "12:15"),
            busy("12:15", "13:00"),
            busy("16:00", "17:00"),
        ];
        let free = free_intervals(at("09:00"), at("17:00"), &busy_list, None).unwrap();

        let mut pieces: Vec<(LocalTime, LocalTime)> = free
            .iter()
            .map(|f| (f.start, f.end))
            .chain(busy_list.iter().map(|b| (b.start, b.end)))
            .collect();
        pieces.sort();

        assert_eq!(pieces.first().unwrap().0, at("09:00"));
        assert_eq!(pieces.last().unwrap().1, at("17:00"));
        for pair in pieces.windows(2) {
            assert_eq!(pair[0].1, pair[1].0, "gap or overlap at {:?}", pair);
        }
        for pair in free.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
    }

    #[test]
    fn test_day_window_bounds() {
        let day = NaiveDate::from_ymd_opt(2026, 10, 15).unwrap();
        let (start, end) = day_window(day, ist());
        assert_eq!(start, at("00:00"));
        assert_eq!(end, at("23:59"));
    }

    #[test]
    fn test_compute_free_intervals_over_day() {
        let day = NaiveDate::from_ymd_opt(2026, 10, 15).unwrap();
        let free = compute_free_intervals(day, ist(), &[busy("09:00", "17:00")], None).unwrap();
        assert_eq!(
            spans(&free),
            vec![("00:00".into(), "09:00".into()), ("17:00".into(), "23:59".into())]
        );
    }
}
