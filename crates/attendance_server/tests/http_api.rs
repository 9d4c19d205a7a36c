//! Router-level tests for the attendance HTTP surface.

use attendance_core::db::{open_db, open_db_in_memory};
use attendance_core::{
    AttendanceAction, AttendanceCalendar, AttendanceConfig, AttendanceLedger, AttendanceRecord,
    GeoPoint, SqliteAttendanceLedger, XLSX_CONTENT_TYPE,
};
use attendance_server::{attendance_router, state::AppState};
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{TimeDelta, TimeZone, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_router() -> Router {
    let state = AppState::new(open_db_in_memory().unwrap(), &AttendanceConfig::default()).unwrap();
    attendance_router(state)
}

async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(payload) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&payload).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    (status, headers, bytes.to_vec())
}

async fn send_json(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let (status, _, bytes) = send(router, method, uri, body).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn submission(student: &str, action: &str, lat: f64, lng: f64) -> Value {
    json!({
        "studentId": student,
        "courseId": "CS101",
        "action": action,
        "location": { "lat": lat, "lng": lng }
    })
}

#[tokio::test]
async fn record_flow_matches_client_contract() {
    let router = test_router();

    let (status, body) = send_json(
        &router,
        Method::POST,
        "/attendance/record",
        Some(submission("12345", "in", 18.8245, 99.0454)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Attendance recorded" }));

    let (status, body) = send_json(
        &router,
        Method::POST,
        "/attendance/record",
        Some(submission("12345", "in", 18.8245, 99.0454)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "error": "Attendance for action 'in' already recorded today." })
    );

    let (status, body) = send_json(
        &router,
        Method::POST,
        "/attendance/record",
        Some(submission("12346", "out", 18.8245, 99.0454)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "error": "Please record action 'in' first before 'out'." })
    );

    let (status, body) = send_json(
        &router,
        Method::POST,
        "/attendance/record",
        Some(submission("12345", "in", 18.8345, 99.0555)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Your location is outside the allowed area. You must be within 150 meters of the university to record attendance."
    );
}

#[tokio::test]
async fn legacy_prefix_and_check_out_after_check_in() {
    let router = test_router();

    let (status, _) = send_json(
        &router,
        Method::POST,
        "/api/attendance/record-attendance",
        Some(submission("12346", "in", 18.8245, 99.0454)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send_json(
        &router,
        Method::POST,
        "/api/attendance/record-attendance",
        Some(submission("12346", "out", 18.8245, 99.0454)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, records) =
        send_json(&router, Method::GET, "/api/attendance/all-attendances", None).await;
    assert_eq!(status, StatusCode::OK);
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["action"], "out");
    assert_eq!(records[1]["action"], "in");
    assert_eq!(records[0]["studentId"], "12346");
}

#[tokio::test]
async fn invalid_action_and_malformed_body_are_bad_requests() {
    let router = test_router();

    let (status, body) = send_json(
        &router,
        Method::POST,
        "/attendance/record",
        Some(submission("12345", "lunch", 18.8245, 99.0454)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid action 'lunch'. Expected 'in' or 'out'.");

    let (status, body) = send_json(
        &router,
        Method::POST,
        "/attendance/record",
        Some(json!({ "studentId": "12345", "action": "in" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

fn seeded_router() -> (tempfile::TempDir, Router) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("attendance.sqlite3");
    {
        let conn = open_db(&path).unwrap();
        let ledger = SqliteAttendanceLedger::new(&conn, AttendanceCalendar::default());
        let bangkok = |d: u32, h: u32| {
            Utc.with_ymd_and_hms(2024, 10, d, h, 0, 0).unwrap() - TimeDelta::hours(7)
        };
        for (student, action, at) in [
            ("12345", AttendanceAction::In, bangkok(1, 9)),
            ("12345", AttendanceAction::Out, bangkok(1, 16)),
            ("12345", AttendanceAction::In, bangkok(2, 9)),
            ("12346", AttendanceAction::In, bangkok(2, 9)),
        ] {
            ledger
                .insert(&AttendanceRecord::new(
                    student,
                    "CS101",
                    action,
                    GeoPoint::new(18.8245, 99.0454),
                    at,
                ))
                .unwrap();
        }
    }

    let state = AppState::new(open_db(&path).unwrap(), &AttendanceConfig::default()).unwrap();
    (dir, attendance_router(state))
}

#[tokio::test]
async fn monthly_report_returns_grouped_rows() {
    let (_dir, router) = seeded_router();

    let (status, body) = send_json(
        &router,
        Method::GET,
        "/attendance/monthly-report?courseId=CS101&year=2024&month=10",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([
            { "studentId": "12345", "action": "in", "count": 2 },
            { "studentId": "12345", "action": "out", "count": 1 },
            { "studentId": "12346", "action": "in", "count": 1 }
        ])
    );
}

#[tokio::test]
async fn semester_report_export_downloads_spreadsheet() {
    let (_dir, router) = seeded_router();

    let (status, headers, bytes) = send(
        &router,
        Method::GET,
        "/attendance/semester-report?courseId=CS101&semesterStartDate=2024-08-01&semesterEndDate=2024-12-31&export=true",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], XLSX_CONTENT_TYPE);
    let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.contains("Semester_Attendance_CS101_2024-08-01_2024-12-31.xlsx"));
    assert!(bytes.starts_with(b"PK"));
}

#[tokio::test]
async fn report_with_bad_period_is_bad_request() {
    let router = test_router();

    let (status, body) = send_json(
        &router,
        Method::GET,
        "/attendance/monthly-report?courseId=CS101&year=2024&month=13",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("2024-13"));

    let (status, _) = send_json(
        &router,
        Method::GET,
        "/attendance/semester-report?courseId=CS101&semesterStartDate=later&semesterEndDate=2024-12-31",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_reports_connected_database() {
    let router = test_router();

    let (status, body) = send_json(&router, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");
    assert_eq!(body["database"], "Connected");
    assert!(body["uptime"].as_f64().unwrap() >= 0.0);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn export_flag_other_than_true_returns_json_rows() {
    let (_dir, router) = seeded_router();

    let (status, headers, bytes) = send(
        &router,
        Method::GET,
        "/attendance/monthly-report?courseId=CS101&year=2024&month=10&export=1",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(headers.get(header::CONTENT_DISPOSITION).is_none());
    let rows: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn storage_failure_returns_generic_500_without_details() {
    let (dir, router) = seeded_router();
    let path = dir.path().join("attendance.sqlite3");
    rusqlite::Connection::open(&path)
        .unwrap()
        .execute_batch("DROP TABLE attendance_records;")
        .unwrap();

    let (status, headers, bytes) = send(
        &router,
        Method::POST,
        "/attendance/record",
        Some(submission("12345", "in", 18.8245, 99.0454)),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({ "error": "Error recording attendance" }));
    assert!(!String::from_utf8_lossy(&bytes).contains("no such table"));

    let (status, _, bytes) = send(
        &router,
        Method::GET,
        "/attendance/monthly-report?courseId=CS101&year=2024&month=10",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(
        body,
        json!({ "error": "Error generating monthly attendance report" })
    );
    assert!(!String::from_utf8_lossy(&bytes).contains("no such table"));
}
