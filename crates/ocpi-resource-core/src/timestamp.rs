//! Millisecond-precision UTC timestamps with a fixed ISO-8601 encoding.
//!
//! Every timestamp is truncated to whole milliseconds when it is created,
//! so `parse(format(t)) == t` holds for all values and hashes stay stable
//! across a serialize/parse round trip. Parsing accepts only instants whose
//! UTC year has four digits, the range the wire form can express.

use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Earliest and latest UTC year a timestamp may carry.
pub const YEAR_RANGE: std::ops::RangeInclusive<i32> = 0..=9999;

/// A point in time as exchanged on the wire (`2024-01-01T12:00:00.000Z`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current wall-clock time, truncated to milliseconds.
    #[must_use]
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Wrap a `chrono` value, dropping sub-millisecond precision.
    #[must_use]
    pub fn from_datetime(value: DateTime<Utc>) -> Self {
        Self(truncate_millis(value))
    }

    /// Milliseconds since the UNIX epoch; `None` outside [`YEAR_RANGE`].
    #[must_use]
    pub fn from_unix_millis(millis: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(millis)
            .filter(|dt| YEAR_RANGE.contains(&dt.year()))
            .map(Self)
    }

    /// Milliseconds since the UNIX epoch.
    #[must_use]
    pub fn unix_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// The underlying `chrono` value.
    #[must_use]
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Canonical wire form.
    #[must_use]
    pub fn to_wire(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Resolve `created`/`last_updated` defaults from each other.
    ///
    /// `created ?? last_updated ?? now` and `last_updated ?? created ?? now`,
    /// with `now` captured once so both fields agree when neither is given.
    #[must_use]
    pub fn resolve_pair(created: Option<Self>, last_updated: Option<Self>) -> (Self, Self) {
        match (created, last_updated) {
            (Some(created), Some(last_updated)) => (created, last_updated),
            (Some(created), None) => (created, created),
            (None, Some(last_updated)) => (last_updated, last_updated),
            (None, None) => {
                let now = Self::now();
                (now, now)
            }
        }
    }
}

impl FromStr for Timestamp {
    type Err = TimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let utc = DateTime::parse_from_rfc3339(s)
            .map_err(|e| TimestampError::Malformed {
                input: s.to_string(),
                reason: e.to_string(),
            })?
            .with_timezone(&Utc);
        if !YEAR_RANGE.contains(&utc.year()) {
            return Err(TimestampError::OutOfRange {
                input: s.to_string(),
                year: utc.year(),
            });
        }
        Ok(Self::from_datetime(utc))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self::from_datetime(value)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_wire())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors that can occur when parsing a timestamp.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimestampError {
    /// Not an RFC 3339 / ISO-8601 date-time
    #[error("'{input}' is not an ISO-8601 timestamp: {reason}")]
    Malformed {
        /// The rejected input
        input: String,
        /// Parser diagnostic
        reason: String,
    },

    /// Valid date-time whose UTC year has no four-digit wire form
    #[error("'{input}' falls in UTC year {year}, outside 0000..=9999")]
    OutOfRange {
        /// The rejected input
        input: String,
        /// Year after conversion to UTC
        year: i32,
    },
}

fn truncate_millis(value: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(value.timestamp_millis()).unwrap_or(value)
}
