//! Gregorian ↔ Julian date conversion and minute keys.
//!
//! All orbital arithmetic happens on [`JulianDate`] values (UTC scale). The
//! schedule is indexed by [`MinuteKey`], the UTC time truncated to the minute
//! in the fixed `YYYY-MM-DD HH:MM` form shared by the builder and the
//! consumer.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Julian date of the Unix epoch, 1970-01-01T00:00:00Z.
pub const UNIX_EPOCH_JD: f64 = 2_440_587.5;

pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Textual form produced by [`to_gregorian`].
pub const GREGORIAN_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Textual form of a [`MinuteKey`].
pub const MINUTE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Julian date on the UTC scale.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JulianDate(f64);

impl JulianDate {
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    /// Raw JD value.
    pub fn value(&self) -> f64 {
        self.0
    }

    /// Shift by a (possibly fractional) number of days.
    pub fn add_days(self, days: f64) -> Self {
        Self(self.0 + days)
    }

    /// Convert from chrono DateTime<Utc>.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        let secs = dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_nanos()) / 1e9;
        Self(secs / SECONDS_PER_DAY + UNIX_EPOCH_JD)
    }

    /// Convert to chrono DateTime<Utc>, rounded to the millisecond.
    pub fn to_datetime(&self) -> Result<DateTime<Utc>, ValidationError> {
        if !self.0.is_finite() {
            return Err(ValidationError::invalid("julian_date", "must be finite"));
        }
        let millis = ((self.0 - UNIX_EPOCH_JD) * SECONDS_PER_DAY * 1000.0).round();
        if millis.abs() >= i64::MAX as f64 {
            return Err(ValidationError::invalid(
                "julian_date",
                format!("{} is outside the representable range", self.0),
            ));
        }
        DateTime::from_timestamp_millis(millis as i64).ok_or_else(|| {
            ValidationError::invalid(
                "julian_date",
                format!("{} is outside the representable range", self.0),
            )
        })
    }
}

impl fmt::Display for JulianDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JD {:.6}", self.0)
    }
}

/// Convert a Gregorian UTC date/time to a Julian date.
///
/// # Errors
///
/// Returns [`ValidationError::CalendarOutOfRange`] when any field is outside
/// its calendar range (including impossible dates such as February 30).
pub fn to_julian_date(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: f64,
) -> Result<JulianDate, ValidationError> {
    if !(1..=12).contains(&month) {
        return Err(out_of_range("month", month));
    }
    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        if NaiveDate::from_ymd_opt(year, month, 1).is_some() {
            out_of_range("day", day)
        } else {
            out_of_range("year", year)
        }
    })?;
    if hour >= 24 {
        return Err(out_of_range("hour", hour));
    }
    if minute >= 60 {
        return Err(out_of_range("minute", minute));
    }
    if !second.is_finite() || !(0.0..60.0).contains(&second) {
        return Err(out_of_range("second", second));
    }

    let start_of_minute = date
        .and_hms_opt(hour, minute, 0)
        .ok_or_else(|| out_of_range("hour", hour))?
        .and_utc();
    let dt = start_of_minute + Duration::nanoseconds((second * 1e9).round() as i64);
    Ok(JulianDate::from_datetime(dt))
}

/// Convert a Julian date to `YYYY-MM-DD HH:MM:SS.sss` (UTC).
pub fn to_gregorian(jd: JulianDate) -> Result<String, ValidationError> {
    Ok(jd.to_datetime()?.format(GREGORIAN_FORMAT).to_string())
}

fn out_of_range(field: &'static str, value: impl fmt::Display) -> ValidationError {
    ValidationError::CalendarOutOfRange {
        field,
        value: value.to_string(),
    }
}

/// UTC time truncated to the minute, e.g. `2024-03-01 04:17`.
///
/// Lexicographic order equals chronological order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MinuteKey(String);

impl MinuteKey {
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.format(MINUTE_FORMAT).to_string())
    }

    /// Key of the minute containing `jd` (after millisecond rounding).
    pub fn from_julian(jd: JulianDate) -> Result<Self, ValidationError> {
        Ok(Self::from_datetime(jd.to_datetime()?))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MinuteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    #[test]
    fn j2000_noon() {
        let jd = to_julian_date(2000, 1, 1, 12, 0, 0.0).unwrap();
        assert!((jd.value() - 2_451_545.0).abs() < 1e-9);
    }

    #[test]
    fn unix_epoch() {
        let jd = to_julian_date(1970, 1, 1, 0, 0, 0.0).unwrap();
        assert_eq!(jd.value(), UNIX_EPOCH_JD);
    }

    #[test]
    fn to_gregorian_formats_milliseconds() {
        assert_eq!(
            to_gregorian(JulianDate::new(2_451_545.0)).unwrap(),
            "2000-01-01 12:00:00.000"
        );
        assert_eq!(
            to_gregorian(JulianDate::new(2_451_545.25)).unwrap(),
            "2000-01-01 18:00:00.000"
        );
    }

    #[test]
    fn rejects_out_of_range_fields() {
        assert!(matches!(
            to_julian_date(2024, 13, 1, 0, 0, 0.0),
            Err(ValidationError::CalendarOutOfRange { field: "month", .. })
        ));
        assert!(matches!(
            to_julian_date(2023, 2, 29, 0, 0, 0.0),
            Err(ValidationError::CalendarOutOfRange { field: "day", .. })
        ));
        assert!(matches!(
            to_julian_date(2024, 1, 1, 24, 0, 0.0),
            Err(ValidationError::CalendarOutOfRange { field: "hour", .. })
        ));
        assert!(matches!(
            to_julian_date(2024, 1, 1, 0, 60, 0.0),
            Err(ValidationError::CalendarOutOfRange { field: "minute", .. })
        ));
        assert!(matches!(
            to_julian_date(2024, 1, 1, 0, 0, 60.0),
            Err(ValidationError::CalendarOutOfRange { field: "second", .. })
        ));
        assert!(to_julian_date(2024, 1, 1, 0, 0, f64::NAN).is_err());
    }

    #[test]
    fn leap_day_is_valid() {
        assert!(to_julian_date(2024, 2, 29, 23, 59, 59.999).is_ok());
    }

    #[test]
    fn non_finite_jd_is_rejected() {
        assert!(to_gregorian(JulianDate::new(f64::INFINITY)).is_err());
    }

    #[test]
    fn minute_key_truncates() {
        let jd = to_julian_date(2024, 3, 1, 4, 17, 59.4).unwrap();
        assert_eq!(MinuteKey::from_julian(jd).unwrap().as_str(), "2024-03-01 04:17");

        let now = Utc.with_ymd_and_hms(2024, 3, 1, 4, 17, 42).unwrap();
        assert_eq!(MinuteKey::from_datetime(now).as_str(), "2024-03-01 04:17");
    }

    #[test]
    fn minute_keys_sort_chronologically() {
        let a = MinuteKey::from_datetime(Utc.with_ymd_and_hms(2024, 9, 30, 23, 59, 0).unwrap());
        let b = MinuteKey::from_datetime(Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap());
        assert!(a < b);
    }

    proptest! {
        #[test]
        fn prop_gregorian_roundtrip(
            year in 1900i32..2100,
            month in 1u32..=12,
            day in 1u32..=28,
            hour in 0u32..24,
            minute in 0u32..60,
            millis in 0u32..60_000,
        ) {
            let second = f64::from(millis) / 1000.0;
            let jd = to_julian_date(year, month, day, hour, minute, second).unwrap();
            let text = to_gregorian(jd).unwrap();
            let expected = format!(
                "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{:02}.{:03}",
                millis / 1000,
                millis % 1000
            );
            prop_assert_eq!(&text, &expected);

            let back = JulianDate::from_datetime(
                chrono::NaiveDateTime::parse_from_str(&text, GREGORIAN_FORMAT)
                    .unwrap()
                    .and_utc(),
            );
            prop_assert!((back.value() - jd.value()).abs() < 1e-6);
        }
    }
}
