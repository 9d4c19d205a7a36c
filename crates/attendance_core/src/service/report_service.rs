//! Attendance report aggregation.
//!
//! # Responsibility
//! - Resolve a reporting period into a `[start, end)` range.
//! - Group one course's ledger entries by `(student_id, action)` and count.
//! - Name exported report files by kind, course and period.
//!
//! # Invariants
//! - Aggregation is read-only over the ledger.
//! - Rows are sorted by student id, then `in` before `out`.

use crate::model::attendance::{AttendanceAction, AttendanceRecord};
use crate::model::calendar::{AttendanceCalendar, CalendarError, DateRange};
use crate::repo::attendance_repo::{AttendanceLedger, RepoError};
use log::{error, info};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

static FILE_NAME_UNSAFE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_-]+").expect("valid file name regex"));

/// One aggregation group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub student_id: String,
    pub action: AttendanceAction,
    pub count: u64,
}

/// Reporting period requested by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportPeriod {
    Month { year: i32, month: u32 },
    Semester { start: String, end: String },
}

/// Aggregated report for one course and period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceReport {
    pub course_id: String,
    pub period: ReportPeriod,
    pub range: DateRange,
    pub rows: Vec<ReportRow>,
}

impl AttendanceReport {
    /// Spreadsheet file name, e.g. `Monthly_Attendance_CS101_2024_10.xlsx`.
    pub fn export_file_name(&self) -> String {
        let course = sanitize_file_part(&self.course_id);
        match &self.period {
            ReportPeriod::Month { year, month } => {
                format!("Monthly_Attendance_{course}_{year}_{month:02}.xlsx")
            }
            ReportPeriod::Semester { start, end } => format!(
                "Semester_Attendance_{course}_{}_{}.xlsx",
                sanitize_file_part(start),
                sanitize_file_part(end)
            ),
        }
    }
}

/// Report generation errors.
#[derive(Debug)]
pub enum ReportError {
    InvalidRequest(&'static str),
    InvalidPeriod(CalendarError),
    Storage(RepoError),
}

impl ReportError {
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }
}

impl Display for ReportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRequest(message) => f.write_str(message),
            Self::InvalidPeriod(err) => write!(f, "{err}"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ReportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidRequest(_) => None,
            Self::InvalidPeriod(err) => Some(err),
            Self::Storage(err) => Some(err),
        }
    }
}

impl From<CalendarError> for ReportError {
    fn from(value: CalendarError) -> Self {
        Self::InvalidPeriod(value)
    }
}

impl From<RepoError> for ReportError {
    fn from(value: RepoError) -> Self {
        Self::Storage(value)
    }
}

/// Read-only report builder over a ledger.
pub struct ReportAggregator<L: AttendanceLedger> {
    ledger: L,
    calendar: AttendanceCalendar,
}

impl<L: AttendanceLedger> ReportAggregator<L> {
    pub fn new(ledger: L, calendar: AttendanceCalendar) -> Self {
        Self { ledger, calendar }
    }

    /// Counts per `(student, action)` for records created in the given month.
    ///
    /// `month` is 1-indexed; the range ends at the first day of the next month.
    pub fn monthly_report(
        &self,
        course_id: &str,
        year: i32,
        month: u32,
    ) -> Result<AttendanceReport, ReportError> {
        let range = self.calendar.month_range(year, month)?;
        self.build(course_id, ReportPeriod::Month { year, month }, range)
    }

    /// Counts per `(student, action)` for records in `[start, end)`.
    ///
    /// Bounds are `YYYY-MM-DD` dates or RFC 3339 timestamps.
    pub fn semester_report(
        &self,
        course_id: &str,
        start: &str,
        end: &str,
    ) -> Result<AttendanceReport, ReportError> {
        let range = self.calendar.parse_date_range(start, end)?;
        let period = ReportPeriod::Semester {
            start: start.trim().to_string(),
            end: end.trim().to_string(),
        };
        self.build(course_id, period, range)
    }

    fn build(
        &self,
        course_id: &str,
        period: ReportPeriod,
        range: DateRange,
    ) -> Result<AttendanceReport, ReportError> {
        let course_id = course_id.trim();
        if course_id.is_empty() {
            return Err(ReportError::InvalidRequest("courseId is required"));
        }

        let records = self.ledger.query(course_id, &range).map_err(|err| {
            error!(
                "event=attendance_report module=service status=error error_code=ledger_failed error={err}"
            );
            ReportError::from(err)
        })?;
        let rows = aggregate(&records);
        info!(
            "event=attendance_report module=service status=ok records={} groups={}",
            records.len(),
            rows.len()
        );

        Ok(AttendanceReport {
            course_id: course_id.to_string(),
            period,
            range,
            rows,
        })
    }
}

/// Groups records by `(student_id, action)` and counts each group.
pub fn aggregate(records: &[AttendanceRecord]) -> Vec<ReportRow> {
    let mut counts: BTreeMap<(&str, AttendanceAction), u64> = BTreeMap::new();
    for record in records {
        *counts
            .entry((record.student_id.as_str(), record.action))
            .or_insert(0) += 1;
    }

    counts
        .into_iter()
        .map(|((student_id, action), count)| ReportRow {
            student_id: student_id.to_string(),
            action,
            count,
        })
        .collect()
}

fn sanitize_file_part(value: &str) -> String {
    let cleaned = FILE_NAME_UNSAFE_RE.replace_all(value.trim(), "_");
    let cleaned = cleaned.trim_matches('_');
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned.to_string()
    }
}
