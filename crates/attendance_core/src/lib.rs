//! Core domain logic for course attendance.
//! This crate is the single source of truth for attendance invariants:
//! geofence admission, one action per student/course/day, in-before-out,
//! and report aggregation.

pub mod config;
pub mod db;
pub mod export;
pub mod geo;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{AttendanceConfig, ConfigError};
pub use export::xlsx::{
    render_report_xlsx, write_report_xlsx, ExportError, REPORT_SHEET_NAME, XLSX_CONTENT_TYPE,
};
pub use geo::{distance_km, GeoError, GeoPoint, Geofence};
pub use logging::{default_log_level, init_console_logging, init_logging, LogTarget};
pub use model::attendance::{
    AttendanceAction, AttendanceRecord, AttendanceValidationError, RecordId,
};
pub use model::calendar::{AttendanceCalendar, CalendarError, DateRange};
pub use repo::attendance_repo::{AttendanceLedger, RepoError, RepoResult, SqliteAttendanceLedger};
pub use service::attendance_service::{
    AttendanceError, AttendanceRequest, AttendanceService, RECORDED_MESSAGE,
};
pub use service::report_service::{
    aggregate, AttendanceReport, ReportAggregator, ReportError, ReportPeriod, ReportRow,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
