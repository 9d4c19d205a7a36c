use attendance_core::{AttendanceError, ReportError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::error;
use serde_json::json;
use thiserror::Error;

/// Public message for failed writes.
pub const RECORD_FAILURE: &str = "Error recording attendance";
/// Public message for failed record listing.
pub const LIST_FAILURE: &str = "Error fetching attendances";
pub const MONTHLY_REPORT_FAILURE: &str = "Error generating monthly attendance report";
pub const SEMESTER_REPORT_FAILURE: &str = "Error generating semester attendance report";

#[derive(Error, Debug)]
pub enum AppError {
    /// Caller-correctable problem; the message is shown verbatim.
    #[error("{0}")]
    BadRequest(String),

    /// Server-side failure; only `public` reaches the client.
    #[error("{public}: {detail}")]
    Internal { public: &'static str, detail: String },
}

impl AppError {
    pub fn internal(public: &'static str, detail: impl ToString) -> Self {
        Self::Internal {
            public,
            detail: detail.to_string(),
        }
    }

    pub fn from_attendance(err: AttendanceError) -> Self {
        if err.is_client_error() {
            Self::BadRequest(err.to_string())
        } else {
            Self::internal(RECORD_FAILURE, err)
        }
    }

    pub fn from_report(err: ReportError, public: &'static str) -> Self {
        if err.is_client_error() {
            Self::BadRequest(err.to_string())
        } else {
            Self::internal(public, err)
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            AppError::Internal { public, detail } => {
                error!(
                    "event=http_request module=server status=error error_code=internal public={public:?} error={detail}"
                );
                (StatusCode::INTERNAL_SERVER_ERROR, public.to_string())
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
