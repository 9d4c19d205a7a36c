//! `.xlsx` rendering for attendance reports.
//!
//! # Responsibility
//! - Build a workbook with one `Attendance Report` sheet.
//! - Serialize it to memory (HTTP download) or to a directory (CLI).
//!
//! # Invariants
//! - Header row is `studentId, action, count`; data starts on row 2.
//! - Written file names come from `AttendanceReport::export_file_name()`.

use crate::service::report_service::AttendanceReport;
use log::{error, info};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Sheet name shared by every exported report.
pub const REPORT_SHEET_NAME: &str = "Attendance Report";
/// MIME type for `.xlsx` downloads.
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const HEADERS: [&str; 3] = ["studentId", "action", "count"];

#[derive(Debug)]
pub enum ExportError {
    Xlsx(XlsxError),
    Io(std::io::Error),
    TooManyRows(usize),
}

impl Display for ExportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Xlsx(err) => write!(f, "spreadsheet rendering failed: {err}"),
            Self::Io(err) => write!(f, "spreadsheet write failed: {err}"),
            Self::TooManyRows(rows) => write!(f, "report has too many rows to export: {rows}"),
        }
    }
}

impl Error for ExportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Xlsx(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::TooManyRows(_) => None,
        }
    }
}

impl From<XlsxError> for ExportError {
    fn from(value: XlsxError) -> Self {
        Self::Xlsx(value)
    }
}

impl From<std::io::Error> for ExportError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Renders `report` as an in-memory `.xlsx` workbook.
pub fn render_report_xlsx(report: &AttendanceReport) -> Result<Vec<u8>, ExportError> {
    let mut workbook = build_workbook(report)?;
    let bytes = workbook.save_to_buffer()?;
    info!(
        "event=report_export module=export status=ok target=memory rows={} bytes={}",
        report.rows.len(),
        bytes.len()
    );
    Ok(bytes)
}

/// Writes `report` into `dir`, creating the directory when missing.
///
/// Returns the path of the written file.
pub fn write_report_xlsx(
    report: &AttendanceReport,
    dir: impl AsRef<Path>,
) -> Result<PathBuf, ExportError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let path = dir.join(report.export_file_name());

    let bytes = render_report_xlsx(report)?;
    std::fs::write(&path, bytes).map_err(|err| {
        error!(
            "event=report_export module=export status=error target=file error_code=write_failed error={err}"
        );
        ExportError::Io(err)
    })?;

    info!(
        "event=report_export module=export status=ok target=file path={}",
        path.display()
    );
    Ok(path)
}

fn build_workbook(report: &AttendanceReport) -> Result<Workbook, ExportError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(REPORT_SHEET_NAME)?;

    for (col, header) in (0u16..).zip(HEADERS) {
        sheet.write_string_with_format(0, col, header, &header_format)?;
    }

    for (index, row) in report.rows.iter().enumerate() {
        let sheet_row =
            u32::try_from(index + 1).map_err(|_| ExportError::TooManyRows(report.rows.len()))?;
        sheet.write_string(sheet_row, 0, row.student_id.as_str())?;
        sheet.write_string(sheet_row, 1, row.action.as_str())?;
        sheet.write_number(sheet_row, 2, row.count as f64)?;
    }

    Ok(workbook)
}
