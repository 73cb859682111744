use std::sync::OnceLock;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use regex::Regex;

use crate::ZoneMode;

pub(crate) const MS_PER_DAY: f64 = 86_400_000.0;

/// Trailing "Z" or a "+"/"-" offset after the date-time separator.
fn offset_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(z|[+-]\d{2}:?\d{2})$").unwrap())
}

/// Parse a stored `last-reviewed` value to epoch milliseconds.
///
/// Two historical formats coexist: timestamps with an explicit zone are
/// parsed as-is, bare timestamps are interpreted in `zone`.
pub fn parse_timestamp(raw: &str, zone: ZoneMode) -> Option<i64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if offset_suffix_re().is_match(s) {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.timestamp_millis());
        }
        for fmt in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"] {
            if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
                return Some(dt.timestamp_millis());
            }
        }
        return None;
    }

    let naive = parse_bare(s)?;
    match zone {
        ZoneMode::Utc => Some(Utc.from_utc_datetime(&naive).timestamp_millis()),
        ZoneMode::Local => Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.timestamp_millis()),
    }
}

fn parse_bare(s: &str) -> Option<NaiveDateTime> {
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Format a review timestamp for write-back: RFC 3339 UTC, second precision.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Due time in epoch milliseconds for a note last reviewed at `last_ms`.
pub fn due_at_ms(last_ms: i64, interval_days: f64) -> i64 {
    last_ms + (interval_days * MS_PER_DAY) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoned_timestamps_parse_as_is() {
        let utc = parse_timestamp("2024-03-01T12:00:00Z", ZoneMode::Utc).unwrap();
        let offset = parse_timestamp("2024-03-01T13:00:00+01:00", ZoneMode::Utc).unwrap();
        assert_eq!(utc, offset);

        let compact = parse_timestamp("2024-03-01T13:00:00+0100", ZoneMode::Utc).unwrap();
        assert_eq!(utc, compact);
    }

    #[test]
    fn bare_timestamps_use_the_configured_zone() {
        let bare = parse_timestamp("2024-03-01T12:00:00", ZoneMode::Utc).unwrap();
        let zoned = parse_timestamp("2024-03-01T12:00:00Z", ZoneMode::Utc).unwrap();
        assert_eq!(bare, zoned);

        let spaced = parse_timestamp("2024-03-01 12:00:00", ZoneMode::Utc).unwrap();
        assert_eq!(spaced, zoned);
    }

    #[test]
    fn date_only_means_midnight() {
        let date = parse_timestamp("2024-03-01", ZoneMode::Utc).unwrap();
        let midnight = parse_timestamp("2024-03-01T00:00:00Z", ZoneMode::Utc).unwrap();
        assert_eq!(date, midnight);
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(parse_timestamp("yesterday-ish", ZoneMode::Utc), None);
        assert_eq!(parse_timestamp("", ZoneMode::Utc), None);
    }

    #[test]
    fn written_format_round_trips() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let s = format_timestamp(now);
        assert_eq!(s, "2024-03-01T12:00:00Z");
        assert_eq!(
            parse_timestamp(&s, ZoneMode::Utc).unwrap(),
            now.timestamp_millis()
        );
    }

    #[test]
    fn due_time_is_last_reviewed_plus_interval_days() {
        assert_eq!(due_at_ms(0, 1.0), 86_400_000);
        assert_eq!(due_at_ms(1_000, 2.5), 1_000 + 216_000_000);
    }
}
