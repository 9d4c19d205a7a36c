use attendance_core::db::ping_db;
use attendance_core::{
    core_version, render_report_xlsx, AttendanceLedger, AttendanceRecord, AttendanceReport,
    AttendanceRequest, AttendanceService, ReportAggregator, SqliteAttendanceLedger,
    RECORDED_MESSAGE, XLSX_CONTENT_TYPE,
};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use log::{info, warn};
use serde::Deserialize;
use serde_json::{json, Value};

use super::error::{
    AppError, LIST_FAILURE, MONTHLY_REPORT_FAILURE, RECORD_FAILURE, SEMESTER_REPORT_FAILURE,
};
use super::state::SharedState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyReportParams {
    pub course_id: String,
    pub year: i32,
    pub month: u32,
    pub export: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterReportParams {
    pub course_id: String,
    pub semester_start_date: String,
    pub semester_end_date: String,
    pub export: Option<String>,
}

/// Only the literal `export=true` requests a download; any other value
/// falls back to JSON rows.
fn wants_export(export: Option<&str>) -> bool {
    export == Some("true")
}

pub async fn root_handler() -> &'static str {
    "API is running..."
}

pub async fn health_handler(State(state): State<SharedState>) -> Json<Value> {
    let database = match state
        .run_blocking("Health check failed", |conn| ping_db(conn).is_ok())
        .await
    {
        Ok(true) => "Connected",
        _ => "Disconnected",
    };

    Json(json!({
        "status": "OK",
        "uptime": state.started_at.elapsed().as_secs_f64(),
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        "database": database,
        "version": core_version(),
    }))
}

pub async fn record_attendance_handler(
    State(state): State<SharedState>,
    payload: Result<Json<AttendanceRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!("event=http_request module=server route=record status=rejected reason=malformed_body");
        AppError::BadRequest(rejection.body_text())
    })?;

    let (geofence, calendar) = (state.geofence, state.calendar);
    state
        .run_blocking(RECORD_FAILURE, move |conn| {
            AttendanceService::new(SqliteAttendanceLedger::new(conn, calendar), geofence, calendar)
                .record_attendance(&request)
        })
        .await?
        .map_err(AppError::from_attendance)?;

    Ok(Json(json!({ "message": RECORDED_MESSAGE })))
}

pub async fn all_attendances_handler(
    State(state): State<SharedState>,
) -> Result<Json<Vec<AttendanceRecord>>, AppError> {
    let calendar = state.calendar;
    let records = state
        .run_blocking(LIST_FAILURE, move |conn| {
            SqliteAttendanceLedger::new(conn, calendar).list_all()
        })
        .await?
        .map_err(|err| AppError::internal(LIST_FAILURE, err))?;

    info!(
        "event=http_request module=server route=all status=ok records={}",
        records.len()
    );
    Ok(Json(records))
}

pub async fn monthly_report_handler(
    State(state): State<SharedState>,
    params: Result<Query<MonthlyReportParams>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(params) = params.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

    let calendar = state.calendar;
    let export = wants_export(params.export.as_deref());
    let report = state
        .run_blocking(MONTHLY_REPORT_FAILURE, move |conn| {
            ReportAggregator::new(SqliteAttendanceLedger::new(conn, calendar), calendar)
                .monthly_report(&params.course_id, params.year, params.month)
        })
        .await?
        .map_err(|err| AppError::from_report(err, MONTHLY_REPORT_FAILURE))?;

    report_response(report, export, MONTHLY_REPORT_FAILURE)
}

pub async fn semester_report_handler(
    State(state): State<SharedState>,
    params: Result<Query<SemesterReportParams>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(params) = params.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

    let calendar = state.calendar;
    let export = wants_export(params.export.as_deref());
    let report = state
        .run_blocking(SEMESTER_REPORT_FAILURE, move |conn| {
            ReportAggregator::new(SqliteAttendanceLedger::new(conn, calendar), calendar)
                .semester_report(
                    &params.course_id,
                    &params.semester_start_date,
                    &params.semester_end_date,
                )
        })
        .await?
        .map_err(|err| AppError::from_report(err, SEMESTER_REPORT_FAILURE))?;

    report_response(report, export, SEMESTER_REPORT_FAILURE)
}

fn report_response(
    report: AttendanceReport,
    export: bool,
    public: &'static str,
) -> Result<Response, AppError> {
    if !export {
        return Ok((StatusCode::OK, Json(report.rows)).into_response());
    }

    let bytes = render_report_xlsx(&report).map_err(|err| AppError::internal(public, err))?;
    let disposition = format!("attachment; filename=\"{}\"", report.export_file_name());
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}
