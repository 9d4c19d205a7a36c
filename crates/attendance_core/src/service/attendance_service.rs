//! Attendance recording use-case.
//!
//! # Responsibility
//! - Validate an inbound attendance event and admit it into the ledger.
//!
//! # Invariants
//! - Check order is fixed: action, payload, geofence, duplicate, ordering.
//!   A same-day duplicate is reported even when the ordering check would
//!   also fail.
//! - Every failure is terminal for the request; nothing is retried.
//! - A concurrent writer that wins the day slot first is reported as a
//!   duplicate, never as a storage failure.

use crate::geo::{GeoPoint, Geofence};
use crate::model::attendance::{
    AttendanceAction, AttendanceRecord, AttendanceValidationError,
};
use crate::model::calendar::AttendanceCalendar;
use crate::repo::attendance_repo::{AttendanceLedger, RepoError, RepoResult};
use chrono::{DateTime, Utc};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Message returned to callers after a successful write.
pub const RECORDED_MESSAGE: &str = "Attendance recorded";

/// Inbound attendance event as submitted by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRequest {
    pub student_id: String,
    pub course_id: String,
    /// Raw action text; only `in` and `out` are accepted.
    pub action: String,
    pub location: GeoPoint,
}

/// Rejection reasons for an attendance submission.
#[derive(Debug)]
pub enum AttendanceError {
    InvalidAction(String),
    InvalidRequest(AttendanceValidationError),
    OutOfArea { radius_m: u32 },
    DuplicateAction(AttendanceAction),
    MissingCheckIn,
    Storage(RepoError),
}

impl AttendanceError {
    /// Whether the caller can fix the request and resubmit.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }
}

impl Display for AttendanceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAction(value) => {
                write!(f, "Invalid action '{value}'. Expected 'in' or 'out'.")
            }
            Self::InvalidRequest(err) => write!(f, "{err}"),
            Self::OutOfArea { radius_m } => write!(
                f,
                "Your location is outside the allowed area. You must be within {radius_m} meters of the university to record attendance."
            ),
            Self::DuplicateAction(action) => {
                write!(f, "Attendance for action '{action}' already recorded today.")
            }
            Self::MissingCheckIn => f.write_str("Please record action 'in' first before 'out'."),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AttendanceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidRequest(err) => Some(err),
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for AttendanceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Duplicate { action, .. } => Self::DuplicateAction(action),
            RepoError::Validation(err) => Self::InvalidRequest(err),
            other => Self::Storage(other),
        }
    }
}

/// Orchestrates geofence, duplicate and ordering checks around ledger writes.
pub struct AttendanceService<L: AttendanceLedger> {
    ledger: L,
    geofence: Geofence,
    calendar: AttendanceCalendar,
}

impl<L: AttendanceLedger> AttendanceService<L> {
    /// `calendar` must match the one the ledger derives days with.
    pub fn new(ledger: L, geofence: Geofence, calendar: AttendanceCalendar) -> Self {
        Self {
            ledger,
            geofence,
            calendar,
        }
    }

    /// Records one attendance event stamped with the current time.
    pub fn record_attendance(
        &self,
        request: &AttendanceRequest,
    ) -> Result<AttendanceRecord, AttendanceError> {
        self.record_attendance_at(request, Utc::now())
    }

    /// Records one attendance event stamped at `now`.
    ///
    /// # Errors
    /// - `InvalidAction` when `action` is not `in|out`.
    /// - `InvalidRequest` for blank ids or malformed coordinates.
    /// - `OutOfArea` when the location is outside the geofence.
    /// - `DuplicateAction` when the same action exists for today.
    /// - `MissingCheckIn` when `out` has no same-day `in`.
    /// - `Storage` when the ledger fails.
    pub fn record_attendance_at(
        &self,
        request: &AttendanceRequest,
        now: DateTime<Utc>,
    ) -> Result<AttendanceRecord, AttendanceError> {
        let action = request
            .action
            .parse::<AttendanceAction>()
            .map_err(|_| AttendanceError::InvalidAction(request.action.clone()))?;

        let record = AttendanceRecord::new(
            request.student_id.trim(),
            request.course_id.trim(),
            action,
            request.location,
            now,
        );
        record.validate().map_err(AttendanceError::InvalidRequest)?;

        if !self.geofence.is_within_allowed_area(record.location) {
            info!(
                "event=attendance_record module=service status=rejected reason=out_of_area action={} distance_m={:.0}",
                action,
                self.geofence.distance_from_reference_km(record.location) * 1000.0
            );
            return Err(AttendanceError::OutOfArea {
                radius_m: self.geofence.advertised_radius_m(),
            });
        }

        let today = self.calendar.day_of(record.created_at);
        let storage = |err: RepoError| {
            error!(
                "event=attendance_record module=service status=error error_code=ledger_failed error={err}"
            );
            AttendanceError::from(err)
        };

        if self
            .ledger
            .exists(&record.student_id, &record.course_id, action, today)
            .map_err(storage)?
        {
            info!(
                "event=attendance_record module=service status=rejected reason=duplicate action={action} day={today}"
            );
            return Err(AttendanceError::DuplicateAction(action));
        }

        if action == AttendanceAction::Out
            && !self
                .ledger
                .exists(
                    &record.student_id,
                    &record.course_id,
                    AttendanceAction::In,
                    today,
                )
                .map_err(storage)?
        {
            info!(
                "event=attendance_record module=service status=rejected reason=missing_check_in day={today}"
            );
            return Err(AttendanceError::MissingCheckIn);
        }

        match self.ledger.insert(&record) {
            Ok(_) => {
                info!(
                    "event=attendance_record module=service status=ok action={action} day={today}"
                );
                Ok(record)
            }
            Err(RepoError::Duplicate { action, day }) => {
                info!(
                    "event=attendance_record module=service status=rejected reason=duplicate_race action={action} day={day}"
                );
                Err(AttendanceError::DuplicateAction(action))
            }
            Err(err) => Err(storage(err)),
        }
    }

    /// Lists every stored record, newest first.
    pub fn list_all(&self) -> RepoResult<Vec<AttendanceRecord>> {
        self.ledger.list_all()
    }
}
