//! Calendar-day and reporting-period arithmetic.
//!
//! # Responsibility
//! - Map instants to calendar days in one explicitly configured timezone.
//! - Build half-open `[start, end)` UTC ranges for months and
//!   caller-supplied semester bounds.
//!
//! # Invariants
//! - Host locale is never consulted; only the configured `Tz` is.
//! - Every `DateRange` has `start < end`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Timezone used when none is configured (the reference deployment campus).
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Bangkok;

/// Calendar arithmetic errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    UnknownTimezone(String),
    InvalidMonth { year: i32, month: u32 },
    InvalidDate(String),
    EmptyRange { start: String, end: String },
    /// Local midnight does not exist and no nearby instant could be resolved.
    UnresolvableDay(NaiveDate),
}

impl Display for CalendarError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownTimezone(name) => write!(f, "unknown timezone `{name}`"),
            Self::InvalidMonth { year, month } => {
                write!(f, "invalid reporting month {year}-{month}")
            }
            Self::InvalidDate(value) => write!(
                f,
                "invalid date `{value}`; expected YYYY-MM-DD or an RFC 3339 timestamp"
            ),
            Self::EmptyRange { start, end } => {
                write!(f, "date range end `{end}` must be after start `{start}`")
            }
            Self::UnresolvableDay(day) => write!(f, "cannot resolve start of day {day}"),
        }
    }
}

impl Error for CalendarError {}

/// Half-open UTC interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Day-boundary calculator bound to one timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttendanceCalendar {
    tz: Tz,
}

impl Default for AttendanceCalendar {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEZONE)
    }
}

impl AttendanceCalendar {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Builds a calendar from an IANA zone name such as `Asia/Bangkok`.
    pub fn from_name(name: &str) -> Result<Self, CalendarError> {
        let tz = name
            .trim()
            .parse::<Tz>()
            .map_err(|_| CalendarError::UnknownTimezone(name.to_string()))?;
        Ok(Self::new(tz))
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Calendar date of `instant` in the configured timezone.
    pub fn day_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.tz).date_naive()
    }

    /// `[first day of month, first day of next month)`; `month` is 1-indexed.
    pub fn month_range(&self, year: i32, month: u32) -> Result<DateRange, CalendarError> {
        let invalid = || CalendarError::InvalidMonth { year, month };
        let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
        let (next_year, next_month) = if month == 12 {
            (year.checked_add(1).ok_or_else(invalid)?, 1)
        } else {
            (year, month + 1)
        };
        let next_first = NaiveDate::from_ymd_opt(next_year, next_month, 1).ok_or_else(invalid)?;

        Ok(DateRange {
            start: self.start_of_day(first)?,
            end: self.start_of_day(next_first)?,
        })
    }

    /// Parses caller-supplied bounds into a range.
    ///
    /// Each bound is either `YYYY-MM-DD` (local midnight) or an RFC 3339
    /// timestamp. The end bound is exclusive.
    pub fn parse_date_range(&self, start: &str, end: &str) -> Result<DateRange, CalendarError> {
        let range = DateRange {
            start: self.parse_boundary(start)?,
            end: self.parse_boundary(end)?,
        };
        if range.end <= range.start {
            return Err(CalendarError::EmptyRange {
                start: start.trim().to_string(),
                end: end.trim().to_string(),
            });
        }
        Ok(range)
    }

    fn parse_boundary(&self, value: &str) -> Result<DateTime<Utc>, CalendarError> {
        let trimmed = value.trim();
        if let Ok(day) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            return self.start_of_day(day);
        }
        DateTime::parse_from_rfc3339(trimmed)
            .map(|instant| instant.with_timezone(&Utc))
            .map_err(|_| CalendarError::InvalidDate(value.to_string()))
    }

    /// First existing local instant of `day`.
    ///
    /// Zones that skip midnight for DST start the day at the first valid
    /// local time after it.
    fn start_of_day(&self, day: NaiveDate) -> Result<DateTime<Utc>, CalendarError> {
        let midnight: NaiveDateTime = day
            .and_hms_opt(0, 0, 0)
            .ok_or(CalendarError::UnresolvableDay(day))?;
        for offset_minutes in (0..=180).step_by(15) {
            let candidate = midnight + TimeDelta::minutes(offset_minutes);
            if let Some(local) = self.tz.from_local_datetime(&candidate).earliest() {
                return Ok(local.with_timezone(&Utc));
            }
        }
        Err(CalendarError::UnresolvableDay(day))
    }
}

#[cfg(test)]
mod tests {
    use super::{AttendanceCalendar, CalendarError};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn bangkok() -> AttendanceCalendar {
        AttendanceCalendar::from_name("Asia/Bangkok").unwrap()
    }

    #[test]
    fn day_of_uses_configured_zone_not_utc() {
        // 2024-10-01T18:30Z is already 2024-10-02 01:30 in Bangkok (UTC+7).
        let instant = Utc.with_ymd_and_hms(2024, 10, 1, 18, 30, 0).unwrap();
        assert_eq!(
            bangkok().day_of(instant),
            NaiveDate::from_ymd_opt(2024, 10, 2).unwrap()
        );
    }

    #[test]
    fn day_of_flips_at_local_midnight() {
        let calendar = bangkok();
        let before = Utc.with_ymd_and_hms(2024, 10, 1, 16, 59, 59).unwrap();
        let at = Utc.with_ymd_and_hms(2024, 10, 1, 17, 0, 0).unwrap();
        assert_eq!(calendar.day_of(before), NaiveDate::from_ymd_opt(2024, 10, 1).unwrap());
        assert_eq!(calendar.day_of(at), NaiveDate::from_ymd_opt(2024, 10, 2).unwrap());
    }

    #[test]
    fn month_range_covers_whole_month_including_last_day() {
        let range = bangkok().month_range(2024, 10).unwrap();
        assert_eq!(range.start, Utc.with_ymd_and_hms(2024, 9, 30, 17, 0, 0).unwrap());
        assert_eq!(range.end, Utc.with_ymd_and_hms(2024, 10, 31, 17, 0, 0).unwrap());
        let last_day_noon = Utc.with_ymd_and_hms(2024, 10, 31, 5, 0, 0).unwrap();
        assert!(range.start <= last_day_noon && last_day_noon < range.end);
    }

    #[test]
    fn december_rolls_into_next_year() {
        let range = bangkok().month_range(2024, 12).unwrap();
        assert_eq!(range.end, Utc.with_ymd_and_hms(2024, 12, 31, 17, 0, 0).unwrap());
    }

    #[test]
    fn month_out_of_range_is_rejected() {
        assert_eq!(
            bangkok().month_range(2024, 13),
            Err(CalendarError::InvalidMonth {
                year: 2024,
                month: 13
            })
        );
        assert!(bangkok().month_range(2024, 0).is_err());
    }

    #[test]
    fn parse_date_range_accepts_dates_and_timestamps() {
        let calendar = bangkok();
        let range = calendar
            .parse_date_range("2024-08-01", "2024-12-31T00:00:00Z")
            .unwrap();
        assert_eq!(range.start, Utc.with_ymd_and_hms(2024, 7, 31, 17, 0, 0).unwrap());
        assert_eq!(range.end, Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap());
    }

    #[test]
    fn parse_date_range_rejects_garbage_and_inverted_bounds() {
        let calendar = bangkok();
        assert!(matches!(
            calendar.parse_date_range("soon", "2024-12-31"),
            Err(CalendarError::InvalidDate(_))
        ));
        assert!(matches!(
            calendar.parse_date_range("2024-12-31", "2024-08-01"),
            Err(CalendarError::EmptyRange { .. })
        ));
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        assert_eq!(
            AttendanceCalendar::from_name("Mars/Olympus"),
            Err(CalendarError::UnknownTimezone("Mars/Olympus".to_string()))
        );
    }
}
