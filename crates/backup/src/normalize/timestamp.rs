//! Detection and decoding of the timestamp encodings found in backups.
//!
//! Exporters have written instants in four shapes over time. [`classify`]
//! maps a JSON value to exactly one of them, in priority order, and
//! [`TimestampEncoding::decode`] turns the recognized shape into an instant.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use serde_json::Value as JsonValue;

use optivault_core::tagged_timestamp;

/// `YYYY-MM-DDTHH:mm:ss.sssZ`, exactly.
static STRICT_ISO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d{3}Z$").expect("ISO regex is valid")
});

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Formats accepted by the fallback parser for date-named fields.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y, %I:%M:%S %p",
    "%m/%d/%Y %H:%M:%S",
];
const NAIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// The shape in which an instant was serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampEncoding<'a> {
    /// `{"type": "timestamp", "value": "<iso>"}`, the current format.
    Tagged(&'a str),
    /// `{"seconds": s, "nanoseconds": n}`, a raw store timestamp.
    SecondsNanos { seconds: i64, nanos: i64 },
    /// A string matching `YYYY-MM-DDTHH:mm:ss.sssZ`.
    IsoString(&'a str),
    /// An integral number of milliseconds since the Unix epoch.
    EpochMillis(i64),
    /// None of the above.
    Unrecognized,
}

/// Determine which timestamp encoding, if any, `value` uses.
#[must_use]
pub fn classify(value: &JsonValue) -> TimestampEncoding<'_> {
    match value {
        JsonValue::Object(object) => {
            if let Some(raw) = tagged_timestamp(object) {
                return TimestampEncoding::Tagged(raw);
            }
            if object.len() == 2
                && let Some(seconds) = object.get("seconds").and_then(JsonValue::as_i64)
                && let Some(nanos) = object.get("nanoseconds").and_then(JsonValue::as_i64)
            {
                return TimestampEncoding::SecondsNanos { seconds, nanos };
            }
            TimestampEncoding::Unrecognized
        }
        JsonValue::String(s) if STRICT_ISO.is_match(s) => TimestampEncoding::IsoString(s),
        JsonValue::Number(n) => n
            .as_i64()
            .map_or(TimestampEncoding::Unrecognized, TimestampEncoding::EpochMillis),
        _ => TimestampEncoding::Unrecognized,
    }
}

impl TimestampEncoding<'_> {
    /// Decode the recognized shape. `None` when the shape is recognized but
    /// its contents are out of range or malformed, or when unrecognized.
    #[must_use]
    pub fn decode(&self) -> Option<DateTime<Utc>> {
        match *self {
            Self::Tagged(raw) | Self::IsoString(raw) => parse_rfc3339(raw),
            Self::SecondsNanos { seconds, nanos } => {
                if !(0..NANOS_PER_SECOND).contains(&nanos) {
                    return None;
                }
                let nanos = u32::try_from(nanos).ok()?;
                Utc.timestamp_opt(seconds, nanos).single()
            }
            Self::EpochMillis(ms) => Utc.timestamp_millis_opt(ms).single(),
            Self::Unrecognized => None,
        }
    }
}

fn parse_rfc3339(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Best-effort parse of a date-like value that matched none of the known
/// encodings. Naive inputs are taken as UTC.
#[must_use]
pub fn parse_generic(value: &JsonValue) -> Option<DateTime<Utc>> {
    match value {
        JsonValue::String(s) => parse_generic_str(s.trim()),
        JsonValue::Number(n) => {
            let ms = n.as_f64()?;
            if !ms.is_finite() {
                return None;
            }
            // Fractional milliseconds are dropped.
            #[allow(clippy::cast_possible_truncation)]
            let ms = ms.round() as i64;
            Utc.timestamp_millis_opt(ms).single()
        }
        _ => None,
    }
}

fn parse_generic_str(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    if let Some(ts) = parse_rfc3339(s) {
        return Some(ts);
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    for fmt in NAIVE_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }
    None
}
