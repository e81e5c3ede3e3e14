//! ISO-8601 timestamps and time ranges.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::Serialize;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parses the ISO-8601 forms browsers and date pickers send.
///
/// Values without an offset are taken as UTC; plain dates mean midnight.
#[must_use]
pub fn parse_iso8601(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Storage and wire format for timestamps.
#[must_use]
pub fn format_iso8601(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// A possibly half-open time interval. `None` on either side means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TimeRange {
    #[serde(serialize_with = "serialize_opt")]
    pub start: Option<DateTime<Utc>>,
    #[serde(serialize_with = "serialize_opt")]
    pub end: Option<DateTime<Utc>>,
}

#[allow(clippy::ref_option)]
fn serialize_opt<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match value {
        Some(dt) => serializer.serialize_str(&format_iso8601(dt)),
        None => serializer.serialize_none(),
    }
}

impl TimeRange {
    #[must_use]
    pub const fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    /// Builds a range from stored RFC 3339 strings, ignoring unparsable values.
    #[must_use]
    pub fn from_stored(start: Option<&str>, end: Option<&str>) -> Self {
        Self {
            start: start.and_then(parse_iso8601),
            end: end.and_then(parse_iso8601),
        }
    }

    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Whether a record with this time range passes `filter`.
    ///
    /// An unbounded filter accepts everything; a record without any time
    /// never matches a bounded filter.
    #[must_use]
    pub fn matches(&self, filter: &Self) -> bool {
        if filter.is_unbounded() {
            return true;
        }
        if self.is_unbounded() {
            return false;
        }

        let ends_after_start = match (self.end, filter.start) {
            (Some(end), Some(start)) => end >= start,
            _ => true,
        };
        let starts_before_end = match (self.start, filter.end) {
            (Some(start), Some(end)) => start <= end,
            _ => true,
        };
        ends_after_start && starts_before_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn parses_common_iso_forms() {
        assert_eq!(parse_iso8601("2014-05-01"), Some(utc(2014, 5, 1)));
        assert_eq!(parse_iso8601("2014-05-01T00:00:00Z"), Some(utc(2014, 5, 1)));
        assert_eq!(
            parse_iso8601("2014-05-01T02:00:00+02:00"),
            Some(utc(2014, 5, 1))
        );
        assert_eq!(parse_iso8601("2014-05-01T00:00"), Some(utc(2014, 5, 1)));
        assert_eq!(parse_iso8601("01.05.2014"), None);
        assert_eq!(parse_iso8601(""), None);
    }

    #[test]
    fn formats_as_utc_seconds() {
        assert_eq!(format_iso8601(&utc(2015, 1, 2)), "2015-01-02T00:00:00Z");
    }

    #[test]
    fn open_bounds_overlap() {
        let record = TimeRange::new(Some(utc(2010, 1, 1)), None);
        assert!(record.matches(&TimeRange::new(None, Some(utc(2011, 1, 1)))));
        assert!(!record.matches(&TimeRange::new(None, Some(utc(2009, 1, 1)))));
    }

    #[test]
    fn closed_ranges_overlap_inclusively() {
        let record = TimeRange::new(Some(utc(2010, 1, 1)), Some(utc(2010, 12, 31)));
        assert!(record.matches(&TimeRange::new(Some(utc(2010, 12, 31)), None)));
        assert!(!record.matches(&TimeRange::new(
            Some(utc(2011, 1, 1)),
            Some(utc(2012, 1, 1))
        )));
    }

    #[test]
    fn untimed_records_only_match_unbounded_filters() {
        let record = TimeRange::default();
        assert!(record.matches(&TimeRange::default()));
        assert!(!record.matches(&TimeRange::new(Some(utc(2010, 1, 1)), None)));
    }
}
