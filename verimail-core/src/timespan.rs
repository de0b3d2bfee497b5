//! Codec for the service's time span notation, `[days.]HH:MM:SS[.fraction]`.
//!
//! The service uses this notation for job retention periods, estimated time
//! remaining and free-credit reset intervals.

use std::time::Duration;

use serde::Serializer;

use crate::error::{CoreError, Result};

const SECONDS_PER_DAY: u64 = 86_400;
const NANOS_DIGITS: usize = 9;

/// Parses a time span such as `00:00:45`, `1.02:30:00` or `00:00:01.5`.
pub fn parse_time_span(input: &str) -> Result<Duration> {
    let invalid = || CoreError::InvalidTimeSpan(input.to_string());

    let mut parts = input.trim().split(':');
    let (Some(head), Some(minutes), Some(seconds), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid());
    };

    let (days, hours) = match head.split_once('.') {
        Some((days, hours)) => (
            component(days).ok_or_else(invalid)?,
            component(hours).ok_or_else(invalid)?,
        ),
        None => (0, component(head).ok_or_else(invalid)?),
    };
    let minutes = component(minutes).ok_or_else(invalid)?;
    let (seconds, nanos) = match seconds.split_once('.') {
        Some((whole, fraction)) => (
            component(whole).ok_or_else(invalid)?,
            fraction_nanos(fraction).ok_or_else(invalid)?,
        ),
        None => (component(seconds).ok_or_else(invalid)?, 0),
    };

    if hours > 23 || minutes > 59 || seconds > 59 {
        return Err(invalid());
    }

    let total = days
        .checked_mul(SECONDS_PER_DAY)
        .and_then(|secs| secs.checked_add(hours * 3_600 + minutes * 60 + seconds))
        .ok_or_else(invalid)?;

    Ok(Duration::new(total, nanos))
}

/// Formats a duration with the notation accepted by [`parse_time_span`].
///
/// The day component and the fraction are only emitted when non-zero.
pub fn format_time_span(duration: Duration) -> String {
    let total = duration.as_secs();
    let days = total / SECONDS_PER_DAY;
    let hours = (total % SECONDS_PER_DAY) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    let mut formatted = if days > 0 {
        format!("{days}.{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    };

    let nanos = duration.subsec_nanos();
    if nanos > 0 {
        let fraction = format!("{nanos:09}");
        formatted.push('.');
        formatted.push_str(fraction.trim_end_matches('0'));
    }

    formatted
}

/// Serde adapter for optional durations sent as time spans.
pub fn serialize_optional<S: Serializer>(
    value: &Option<Duration>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match value {
        Some(duration) => serializer.serialize_str(&format_time_span(*duration)),
        None => serializer.serialize_none(),
    }
}

fn component(text: &str) -> Option<u64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

fn fraction_nanos(text: &str) -> Option<u32> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let significant = &text[..text.len().min(NANOS_DIGITS)];
    let value: u32 = significant.parse().ok()?;
    let scale = 10u32.pow((NANOS_DIGITS - significant.len()) as u32);
    Some(value * scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("00:00:45", Duration::from_secs(45); "seconds only")]
    #[test_case("00:00:10", Duration::from_secs(10); "ten seconds")]
    #[test_case("01:02:03", Duration::from_secs(3_723); "hours minutes seconds")]
    #[test_case("2.00:00:00", Duration::from_secs(172_800); "whole days")]
    #[test_case("00:00:01.5", Duration::from_millis(1_500); "fraction")]
    #[test_case("00:00:00.0000001", Duration::from_nanos(100); "one tick")]
    fn parses_valid_spans(input: &str, expected: Duration) {
        assert_eq!(parse_time_span(input).unwrap(), expected);
    }

    #[test_case(""; "empty")]
    #[test_case("45"; "no separators")]
    #[test_case("00:45"; "two components")]
    #[test_case("00:00:60"; "seconds overflow")]
    #[test_case("24:00:00"; "hours overflow")]
    #[test_case("aa:00:00"; "not a number")]
    #[test_case("00:00:00:00"; "too many components")]
    #[test_case("-1:00:00"; "negative")]
    fn rejects_malformed_spans(input: &str) {
        assert!(matches!(
            parse_time_span(input),
            Err(CoreError::InvalidTimeSpan(_))
        ));
    }

    #[test]
    fn formats_days_only_when_present() {
        assert_eq!(format_time_span(Duration::from_secs(90)), "00:01:30");
        assert_eq!(format_time_span(Duration::from_secs(30 * 86_400)), "30.00:00:00");
        assert_eq!(format_time_span(Duration::from_millis(2_250)), "00:00:02.25");
    }
}
