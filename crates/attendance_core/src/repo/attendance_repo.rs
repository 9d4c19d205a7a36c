//! Attendance ledger contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide append-only storage over `attendance_records`.
//! - Answer per-day existence checks and course/date range queries.
//!
//! # Invariants
//! - Write paths call `AttendanceRecord::validate()` before SQL mutations.
//! - At most one row per `(student_id, course_id, action, attendance_day)`;
//!   the store's unique index is authoritative even under concurrent writers.
//! - Read paths reject invalid persisted state instead of masking it.
//! - No update or delete path exists.

use crate::db::DbError;
use crate::model::attendance::{
    AttendanceAction, AttendanceRecord, AttendanceValidationError, RecordId,
};
use crate::model::calendar::{AttendanceCalendar, DateRange};
use crate::geo::GeoPoint;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const RECORD_SELECT_SQL: &str = "SELECT
    uuid,
    student_id,
    course_id,
    action,
    location_lat,
    location_lng,
    created_at
FROM attendance_records";

pub type RepoResult<T> = Result<T, RepoError>;

/// Ledger error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(AttendanceValidationError),
    Db(DbError),
    /// Same student/course/action already stored for this calendar day.
    Duplicate {
        action: AttendanceAction,
        day: NaiveDate,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Duplicate { action, day } => {
                write!(f, "attendance action `{action}` already stored for {day}")
            }
            Self::InvalidData(message) => {
                write!(f, "invalid persisted attendance data: {message}")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Duplicate { .. } | Self::InvalidData(_) => None,
        }
    }
}

impl From<AttendanceValidationError> for RepoError {
    fn from(value: AttendanceValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Append-only store of attendance records.
pub trait AttendanceLedger {
    /// Returns whether a record matches all four keys on calendar `day`.
    fn exists(
        &self,
        student_id: &str,
        course_id: &str,
        action: AttendanceAction,
        day: NaiveDate,
    ) -> RepoResult<bool>;
    /// Appends one record. Fails with `Duplicate` when its day slot is taken.
    fn insert(&self, record: &AttendanceRecord) -> RepoResult<RecordId>;
    /// All records, newest first.
    fn list_all(&self) -> RepoResult<Vec<AttendanceRecord>>;
    /// Records of one course with `created_at` inside `range`, oldest first.
    fn query(&self, course_id: &str, range: &DateRange) -> RepoResult<Vec<AttendanceRecord>>;
}

/// SQLite-backed attendance ledger.
///
/// Calendar days are derived with the supplied calendar, so every ledger
/// sharing a database file must be built with the same timezone.
pub struct SqliteAttendanceLedger<'conn> {
    conn: &'conn Connection,
    calendar: AttendanceCalendar,
}

impl<'conn> SqliteAttendanceLedger<'conn> {
    pub fn new(conn: &'conn Connection, calendar: AttendanceCalendar) -> Self {
        Self { conn, calendar }
    }
}

impl AttendanceLedger for SqliteAttendanceLedger<'_> {
    fn exists(
        &self,
        student_id: &str,
        course_id: &str,
        action: AttendanceAction,
        day: NaiveDate,
    ) -> RepoResult<bool> {
        let found: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM attendance_records
                WHERE student_id = ?1
                  AND course_id = ?2
                  AND action = ?3
                  AND attendance_day = ?4
            );",
            params![student_id, course_id, action.as_str(), day_to_db(day)],
            |row| row.get(0),
        )?;
        Ok(found == 1)
    }

    fn insert(&self, record: &AttendanceRecord) -> RepoResult<RecordId> {
        record.validate()?;

        let day = self.calendar.day_of(record.created_at);
        let inserted = self.conn.execute(
            "INSERT INTO attendance_records (
                uuid,
                student_id,
                course_id,
                action,
                location_lat,
                location_lng,
                created_at,
                attendance_day
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                record.id.to_string(),
                record.student_id.as_str(),
                record.course_id.as_str(),
                record.action.as_str(),
                record.location.lat,
                record.location.lng,
                record.created_at.timestamp_millis(),
                day_to_db(day),
            ],
        );

        match inserted {
            Ok(_) => Ok(record.id),
            Err(err) if is_unique_violation(&err) => Err(RepoError::Duplicate {
                action: record.action,
                day,
            }),
            Err(err) => Err(err.into()),
        }
    }

    fn list_all(&self) -> RepoResult<Vec<AttendanceRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{RECORD_SELECT_SQL} ORDER BY created_at DESC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_record_row(row)?);
        }
        Ok(records)
    }

    fn query(&self, course_id: &str, range: &DateRange) -> RepoResult<Vec<AttendanceRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{RECORD_SELECT_SQL}
             WHERE course_id = ?1
               AND created_at >= ?2
               AND created_at < ?3
             ORDER BY created_at ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query(params![
            course_id,
            range.start.timestamp_millis(),
            range.end.timestamp_millis(),
        ])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_record_row(row)?);
        }
        Ok(records)
    }
}

fn parse_record_row(row: &Row<'_>) -> RepoResult<AttendanceRecord> {
    let uuid_text: String = row.get("uuid")?;
    let id = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid uuid value `{uuid_text}` in attendance_records.uuid"
        ))
    })?;

    let action_text: String = row.get("action")?;
    let action = action_text.parse::<AttendanceAction>().map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid action `{action_text}` in attendance_records.action"
        ))
    })?;

    let created_ms: i64 = row.get("created_at")?;
    let created_at = DateTime::<Utc>::from_timestamp_millis(created_ms).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid timestamp `{created_ms}` in attendance_records.created_at"
        ))
    })?;

    let record = AttendanceRecord {
        id,
        student_id: row.get("student_id")?,
        course_id: row.get("course_id")?,
        action,
        location: GeoPoint::new(row.get("location_lat")?, row.get("location_lng")?),
        created_at,
    };
    record.validate()?;
    Ok(record)
}

fn day_to_db(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _)
            if inner.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
