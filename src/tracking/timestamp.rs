use chrono::{DateTime, NaiveDateTime, SecondsFormat, SubsecRound, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Point in time used across the tracker. Persisted as whole seconds since the Unix epoch.
pub type Instant = DateTime<Utc>;

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Time value as it may appear in a store file or be typed by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Seconds(i64),
    Fractional(f64),
    Text(String),
}

impl From<Instant> for RawTimestamp {
    fn from(value: Instant) -> Self {
        RawTimestamp::Seconds(format(value))
    }
}

/// Converts a raw value into an [Instant]. Sub-second precision is dropped.
pub fn parse(raw: &RawTimestamp) -> Result<Instant> {
    match raw {
        RawTimestamp::Seconds(seconds) => from_seconds(*seconds),
        RawTimestamp::Fractional(seconds) => from_fractional(*seconds),
        RawTimestamp::Text(text) => parse_str(text),
    }
}

/// Accepts a numeric string, an RFC 3339 string or a naive `YYYY-MM-DD HH:MM:SS` string taken as
/// UTC.
pub fn parse_str(value: &str) -> Result<Instant> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<i64>() {
        return from_seconds(seconds);
    }
    if let Ok(seconds) = value.parse::<f64>() {
        return from_fractional(seconds);
    }
    if let Ok(date) = DateTime::parse_from_rfc3339(value) {
        return Ok(normalize(date.with_timezone(&Utc)));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|date| normalize(Utc.from_utc_datetime(&date)))
        .ok_or_else(|| Error::InvalidTimestamp(value.to_owned()))
}

/// Persisted form of an instant. `parse(&RawTimestamp::Seconds(format(i)))` gives `i` back to the
/// second.
pub fn format(instant: Instant) -> i64 {
    instant.timestamp()
}

/// Form sent to the remote server.
pub fn to_wire(instant: Instant) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Drops sub-second precision, so that in-memory values match what gets persisted.
pub fn normalize(instant: Instant) -> Instant {
    instant.trunc_subsecs(0)
}

fn from_seconds(seconds: i64) -> Result<Instant> {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .ok_or_else(|| Error::InvalidTimestamp(seconds.to_string()))
}

fn from_fractional(seconds: f64) -> Result<Instant> {
    if !seconds.is_finite() || seconds.abs() > i64::MAX as f64 {
        return Err(Error::InvalidTimestamp(seconds.to_string()));
    }
    from_seconds(seconds.trunc() as i64)
}

/// Serde adapter storing an [Instant] as integer seconds and reading back anything [parse]
/// understands.
pub mod seconds {
    use serde::{de, Deserialize, Deserializer, Serializer};

    use super::{Instant, RawTimestamp};

    pub fn serialize<S>(instant: &Instant, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(super::format(*instant))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Instant, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawTimestamp::deserialize(deserializer)?;
        super::parse(&raw).map_err(de::Error::custom)
    }
}
