//! # Temporal Types — UTC-Only Timestamps
//!
//! Defines [`Timestamp`], a UTC-only timestamp type rendered as ISO8601
//! with `Z` suffix, truncated to seconds precision.
//!
//! ## Invariant
//!
//! All timestamps are stored in UTC with no sub-second component, so the
//! wire rendering is deterministic: `YYYY-MM-DDTHH:MM:SSZ`. Inputs carrying
//! other offsets are converted; a field declared with the `tz` constraint
//! additionally rejects inputs that carry no offset at all (see
//! [`Timestamp::parse_aware`]).

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RecspecError;

/// A UTC timestamp, truncated to seconds precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp from the current UTC time, truncated to seconds.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// Create a timestamp from a `chrono::DateTime<Utc>`, truncating
    /// sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Parse a timestamp, requiring an explicit offset or `Z` suffix.
    ///
    /// This is the parser used for fields declared timezone-aware
    /// (`tz = true`): a naive datetime string is rejected rather than
    /// assumed UTC.
    ///
    /// # Errors
    ///
    /// Returns a decode error if the string is not valid RFC 3339.
    pub fn parse_aware(s: &str) -> Result<Self, RecspecError> {
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| RecspecError::Decode {
            target: "Timestamp".into(),
            reason: format!("not an offset-carrying RFC 3339 timestamp {s:?}: {e}"),
        })?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// Parse a timestamp leniently: accepts RFC 3339 with any offset, or a
    /// naive `YYYY-MM-DDTHH:MM:SS` string which is assumed UTC.
    pub fn parse(s: &str) -> Result<Self, RecspecError> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))));
        }
        let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").map_err(|e| {
            RecspecError::Decode {
                target: "Timestamp".into(),
                reason: format!("invalid timestamp {s:?}: {e}"),
            }
        })?;
        Ok(Self(truncate_to_seconds(naive.and_utc())))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Render as ISO8601 with `Z` suffix (e.g., `2026-01-15T12:00:00Z`).
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

/// Truncate a `DateTime<Utc>` to seconds precision (discard nanoseconds).
fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    // 1970-01-01 through 2100-01-01, seconds precision.
    fn epoch_seconds() -> impl Strategy<Value = i64> {
        0i64..4_102_444_800
    }

    proptest! {
        /// Rendering then strict-parsing any timestamp is the identity.
        #[test]
        fn iso8601_round_trip(secs in epoch_seconds()) {
            let dt = DateTime::from_timestamp(secs, 0).expect("in range");
            let ts = Timestamp::from_utc(dt);
            let back = Timestamp::parse_aware(&ts.to_iso8601()).expect("round-trips");
            prop_assert_eq!(ts, back);
        }

        /// The lenient parser assumes UTC for naive input, agreeing with
        /// the offset-carrying form of the same instant.
        #[test]
        fn naive_form_is_assumed_utc(secs in epoch_seconds()) {
            let dt = DateTime::from_timestamp(secs, 0).expect("in range");
            let ts = Timestamp::from_utc(dt);
            let rendered = ts.to_iso8601();
            let naive = rendered.trim_end_matches('Z');
            prop_assert_eq!(Timestamp::parse(naive).expect("parses"), ts);
        }
    }
}
