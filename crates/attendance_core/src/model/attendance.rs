//! Attendance record model.
//!
//! # Responsibility
//! - Define the persisted attendance record and its `in`/`out` action.
//! - Validate record invariants before they reach storage.
//!
//! # Invariants
//! - `student_id` and `course_id` are non-blank.
//! - `location` holds finite, in-range coordinates.
//! - `created_at` is stamped once at creation and never changes.

use crate::geo::GeoPoint;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Stable identifier for one attendance record.
pub type RecordId = Uuid;

/// Direction of an attendance event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceAction {
    /// Student arrives.
    In,
    /// Student leaves. Requires a same-day `In`.
    Out,
}

impl AttendanceAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }
}

impl Display for AttendanceAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceAction {
    type Err = AttendanceValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "in" => Ok(Self::In),
            "out" => Ok(Self::Out),
            other => Err(AttendanceValidationError::InvalidAction(other.to_string())),
        }
    }
}

/// Validation errors for attendance records.
#[derive(Debug, Clone, PartialEq)]
pub enum AttendanceValidationError {
    /// Action text is not one of `in|out`.
    InvalidAction(String),
    /// A required identifier is blank.
    EmptyField(&'static str),
    /// Coordinates are non-finite or outside degree ranges.
    InvalidLocation(GeoPoint),
}

impl Display for AttendanceValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAction(value) => {
                write!(f, "Invalid action '{value}'. Expected 'in' or 'out'.")
            }
            Self::EmptyField(field) => write!(f, "{field} is required"),
            Self::InvalidLocation(point) => write!(
                f,
                "location ({}, {}) is not a valid coordinate",
                point.lat, point.lng
            ),
        }
    }
}

impl Error for AttendanceValidationError {}

/// One persisted attendance event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: RecordId,
    pub student_id: String,
    pub course_id: String,
    pub action: AttendanceAction,
    pub location: GeoPoint,
    /// Millisecond precision; stored as epoch milliseconds.
    pub created_at: DateTime<Utc>,
}

impl AttendanceRecord {
    /// Creates a record with a fresh id, stamped at `created_at`.
    ///
    /// The timestamp is truncated to whole milliseconds to match storage.
    pub fn new(
        student_id: impl Into<String>,
        course_id: impl Into<String>,
        action: AttendanceAction,
        location: GeoPoint,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_id: student_id.into(),
            course_id: course_id.into(),
            action,
            location,
            created_at: created_at.trunc_subsecs(3),
        }
    }

    /// Checks record invariants.
    ///
    /// # Errors
    /// - `EmptyField` for blank `studentId`/`courseId`.
    /// - `InvalidLocation` for non-finite or out-of-range coordinates.
    pub fn validate(&self) -> Result<(), AttendanceValidationError> {
        if self.student_id.trim().is_empty() {
            return Err(AttendanceValidationError::EmptyField("studentId"));
        }
        if self.course_id.trim().is_empty() {
            return Err(AttendanceValidationError::EmptyField("courseId"));
        }
        if !self.location.is_valid() {
            return Err(AttendanceValidationError::InvalidLocation(self.location));
        }
        Ok(())
    }
}
