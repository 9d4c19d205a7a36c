use attendance_core::db::open_db_in_memory;
use attendance_core::{
    AttendanceAction, AttendanceCalendar, AttendanceLedger, AttendanceRecord, GeoPoint,
    ReportAggregator, ReportError, ReportPeriod, ReportRow, SqliteAttendanceLedger,
};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use rusqlite::Connection;

fn bangkok_time(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap() - TimeDelta::hours(7)
}

fn seed(conn: &Connection, rows: &[(&str, &str, AttendanceAction, DateTime<Utc>)]) {
    let ledger = SqliteAttendanceLedger::new(conn, AttendanceCalendar::default());
    for (student, course, action, at) in rows {
        ledger
            .insert(&AttendanceRecord::new(
                *student,
                *course,
                *action,
                GeoPoint::new(18.8245, 99.0454),
                *at,
            ))
            .unwrap();
    }
}

fn row(student: &str, action: AttendanceAction, count: u64) -> ReportRow {
    ReportRow {
        student_id: student.to_string(),
        action,
        count,
    }
}

fn aggregator(conn: &Connection) -> ReportAggregator<SqliteAttendanceLedger<'_>> {
    let calendar = AttendanceCalendar::default();
    ReportAggregator::new(SqliteAttendanceLedger::new(conn, calendar), calendar)
}

#[test]
fn monthly_report_counts_only_records_inside_month_for_course() {
    let conn = open_db_in_memory().unwrap();
    use AttendanceAction::{In, Out};
    seed(
        &conn,
        &[
            ("12345", "CS101", In, bangkok_time(2024, 9, 30, 23)),
            ("12345", "CS101", In, bangkok_time(2024, 10, 1, 0)),
            ("12345", "CS101", Out, bangkok_time(2024, 10, 1, 16)),
            ("12345", "CS101", In, bangkok_time(2024, 10, 2, 9)),
            ("12346", "CS101", In, bangkok_time(2024, 10, 31, 23)),
            ("12346", "CS102", In, bangkok_time(2024, 10, 15, 9)),
            ("12346", "CS101", In, bangkok_time(2024, 11, 1, 0)),
        ],
    );

    let report = aggregator(&conn).monthly_report("CS101", 2024, 10).unwrap();

    assert_eq!(
        report.period,
        ReportPeriod::Month {
            year: 2024,
            month: 10
        }
    );
    assert_eq!(
        report.rows,
        vec![
            row("12345", In, 2),
            row("12345", Out, 1),
            row("12346", In, 1),
        ]
    );
}

#[test]
fn monthly_report_rows_serialize_as_wire_rows() {
    let conn = open_db_in_memory().unwrap();
    seed(
        &conn,
        &[("12345", "CS101", AttendanceAction::In, bangkok_time(2024, 10, 3, 9))],
    );

    let report = aggregator(&conn).monthly_report("CS101", 2024, 10).unwrap();
    let json = serde_json::to_value(&report.rows).unwrap();

    assert_eq!(
        json,
        serde_json::json!([{ "studentId": "12345", "action": "in", "count": 1 }])
    );
}

#[test]
fn semester_report_uses_explicit_half_open_range() {
    let conn = open_db_in_memory().unwrap();
    use AttendanceAction::In;
    seed(
        &conn,
        &[
            ("a", "CS101", In, bangkok_time(2024, 7, 31, 12)),
            ("a", "CS101", In, bangkok_time(2024, 8, 1, 9)),
            ("a", "CS101", In, bangkok_time(2024, 9, 2, 9)),
            ("b", "CS101", In, bangkok_time(2024, 12, 20, 9)),
            ("b", "CS101", In, bangkok_time(2024, 12, 21, 9)),
        ],
    );

    let report = aggregator(&conn)
        .semester_report("CS101", "2024-08-01", "2024-12-21")
        .unwrap();

    assert_eq!(report.rows, vec![row("a", In, 2), row("b", In, 1)]);
    assert_eq!(
        report.export_file_name(),
        "Semester_Attendance_CS101_2024-08-01_2024-12-21.xlsx"
    );
}

#[test]
fn empty_period_yields_empty_report() {
    let conn = open_db_in_memory().unwrap();
    let report = aggregator(&conn).monthly_report("CS101", 2030, 1).unwrap();
    assert!(report.rows.is_empty());
}

#[test]
fn invalid_periods_and_blank_course_are_client_errors() {
    let conn = open_db_in_memory().unwrap();
    let aggregator = aggregator(&conn);

    let bad_month = aggregator.monthly_report("CS101", 2024, 13).unwrap_err();
    assert!(matches!(bad_month, ReportError::InvalidPeriod(_)));
    assert!(bad_month.is_client_error());

    let inverted = aggregator
        .semester_report("CS101", "2024-12-31", "2024-08-01")
        .unwrap_err();
    assert!(matches!(inverted, ReportError::InvalidPeriod(_)));

    let blank = aggregator.monthly_report("  ", 2024, 10).unwrap_err();
    assert!(matches!(blank, ReportError::InvalidRequest(_)));
}

#[test]
fn missing_table_surfaces_as_storage_error() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch("DROP TABLE attendance_records;").unwrap();

    let err = aggregator(&conn)
        .monthly_report("CS101", 2024, 10)
        .unwrap_err();

    assert!(matches!(err, ReportError::Storage(_)));
    assert!(!err.is_client_error());
}
