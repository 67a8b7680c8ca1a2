//! Normalization of the sensor service's local-time date strings.
//!
//! The service reports dates as `YYYY-MM-DD HH:mm` with no zone. They are
//! interpreted in a configured timezone, converted to UTC, and then shifted by
//! a [`TimestampCorrection`].
//!
//! The correction exists because the upstream service reports samples one hour
//! ahead of the wall clock it claims to use. That has only been observed, never
//! documented, so if upstream changes its DST handling this is the first place
//! to look.

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::FetchError;

/// Date format used by both sensor endpoints.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Default correction applied after timezone interpretation.
pub const DEFAULT_CORRECTION_MINUTES: i64 = -60;

// ---

/// Fixed offset added to every normalized sample timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampCorrection {
    // ---
    offset: Duration,
}

impl TimestampCorrection {
    // ---
    pub fn from_minutes(minutes: i64) -> Self {
        Self {
            offset: Duration::minutes(minutes),
        }
    }

    /// No correction at all.
    pub fn none() -> Self {
        Self::from_minutes(0)
    }

    pub fn minutes(&self) -> i64 {
        self.offset.num_minutes()
    }

    pub fn apply(&self, timestamp: DateTime<Utc>) -> DateTime<Utc> {
        timestamp + self.offset
    }
}

impl Default for TimestampCorrection {
    fn default() -> Self {
        Self::from_minutes(DEFAULT_CORRECTION_MINUTES)
    }
}

/// Turns raw service dates into absolute UTC instants.
#[derive(Debug, Clone, Copy)]
pub struct SampleClock {
    // ---
    timezone: Tz,
    correction: TimestampCorrection,
}

impl SampleClock {
    // ---
    pub fn new(timezone: Tz, correction: TimestampCorrection) -> Self {
        Self {
            timezone,
            correction,
        }
    }

    /// Parse `raw` in the configured timezone and apply the correction.
    ///
    /// A local time that occurs twice (autumn fall-back) resolves to the
    /// earlier instant. A local time that never occurs (spring gap) is a
    /// data error.
    pub fn normalize(&self, raw: &str) -> Result<DateTime<Utc>, FetchError> {
        // ---
        let naive = NaiveDateTime::parse_from_str(raw.trim(), DATE_FORMAT)
            .map_err(|e| FetchError::Data(format!("unparseable date '{raw}': {e}")))?;

        let local = self
            .timezone
            .from_local_datetime(&naive)
            .earliest()
            .ok_or_else(|| {
                FetchError::Data(format!(
                    "date '{raw}' does not exist in {}",
                    self.timezone.name()
                ))
            })?;

        Ok(self.correction.apply(local.with_timezone(&Utc)))
    }
}

impl Default for SampleClock {
    fn default() -> Self {
        Self::new(chrono_tz::Europe::Stockholm, TimestampCorrection::default())
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_winter_time_with_default_correction() {
        // ---
        // CET is UTC+1, then one more hour off for the upstream skew
        let clock = SampleClock::default();
        let ts = clock.normalize("2024-01-01 10:00").unwrap();
        assert_eq!(ts, utc(2024, 1, 1, 8, 0));
    }

    #[test]
    fn test_summer_time_with_default_correction() {
        // ---
        let clock = SampleClock::default();
        let ts = clock.normalize("2024-07-01 12:30").unwrap();
        assert_eq!(ts, utc(2024, 7, 1, 9, 30));
    }

    #[test]
    fn test_without_correction() {
        // ---
        let clock = SampleClock::new(chrono_tz::Europe::Stockholm, TimestampCorrection::none());
        let ts = clock.normalize("2024-01-01 10:00").unwrap();
        assert_eq!(ts, utc(2024, 1, 1, 9, 0));
    }

    #[test]
    fn test_ambiguous_local_time_takes_earliest() {
        // ---
        // 02:30 happens twice on 2024-10-27 in Stockholm; the first is CEST (+2)
        let clock = SampleClock::new(chrono_tz::Europe::Stockholm, TimestampCorrection::none());
        let ts = clock.normalize("2024-10-27 02:30").unwrap();
        assert_eq!(ts, utc(2024, 10, 27, 0, 30));
    }

    #[test]
    fn test_nonexistent_local_time_is_data_error() {
        // ---
        let clock = SampleClock::default();
        let err = clock.normalize("2024-03-31 02:30").unwrap_err();
        assert!(matches!(err, FetchError::Data(_)));
    }

    #[test]
    fn test_malformed_date_is_data_error() {
        // ---
        let clock = SampleClock::default();
        assert!(matches!(
            clock.normalize("2024-01-01T10:00:00Z"),
            Err(FetchError::Data(_))
        ));
        assert!(matches!(clock.normalize(""), Err(FetchError::Data(_))));
    }

    #[test]
    fn test_correction_minutes() {
        // ---
        assert_eq!(TimestampCorrection::default().minutes(), -60);
        assert_eq!(TimestampCorrection::from_minutes(30).minutes(), 30);
    }
}
