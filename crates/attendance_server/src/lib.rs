//! HTTP surface for the course attendance ledger.
//!
//! # Routes
//! Mounted under both `/attendance` and the legacy `/api/attendance` prefix:
//! - `POST /record` (alias `/record-attendance`): submit one `in`/`out` event.
//! - `GET /all` (alias `/all-attendances`): every record, newest first.
//! - `GET /monthly-report?courseId&year&month[&export]`
//! - `GET /semester-report?courseId&semesterStartDate&semesterEndDate[&export]`
//!
//! Plus `GET /health` and `GET /`.
//!
//! # Configuration
//! See [`config::ServerConfig::from_lookup`] for the `ATTENDANCE_*`
//! environment variables.

use std::time::Duration;

use attendance_core::db::{open_db, DbError};
use attendance_core::{init_console_logging, init_logging};
use axum::{
    http::{header::CONTENT_TYPE, Method},
    routing::{get, post},
    Router,
};
use log::info;
use thiserror::Error;
use tokio::{net::TcpListener, signal::ctrl_c};
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tower_http::cors::{Any, CorsLayer};

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use config::{ConfigError, ServerConfig};
use routes::{
    all_attendances_handler, health_handler, monthly_report_handler, record_attendance_handler,
    root_handler, semester_report_handler,
};
use state::{AppState, SharedState};

#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Database setup failed: {0}")]
    Database(#[from] DbError),

    #[error("Server I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Builds the full application router over shared state.
pub fn attendance_router(state: SharedState) -> Router {
    let attendance = Router::new()
        .route("/record", post(record_attendance_handler))
        .route("/record-attendance", post(record_attendance_handler))
        .route("/all", get(all_attendances_handler))
        .route("/all-attendances", get(all_attendances_handler))
        .route("/monthly-report", get(monthly_report_handler))
        .route("/semester-report", get(semester_report_handler));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .nest("/attendance", attendance.clone())
        .nest("/api/attendance", attendance)
        .layer(cors)
        .with_state(state)
}

/// Initializes logging from `config`.
pub fn init_server_logging(config: &ServerConfig) -> Result<(), ServerError> {
    match &config.log_dir {
        Some(dir) => init_logging(&config.log_level, dir),
        None => init_console_logging(&config.log_level),
    }
    .map_err(ServerError::Logging)
}

/// Opens the ledger and serves until Ctrl+C or SIGTERM.
pub async fn start_server(config: ServerConfig) -> Result<(), ServerError> {
    info!("event=server_start module=server status=start");
    let conn = open_db(&config.db_path)?;
    let state = AppState::new(conn, &config.attendance).map_err(ConfigError::from)?;

    let app = attendance_router(state);

    let address = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&address).await?;
    info!("event=server_start module=server status=ok address={address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("event=server_stop module=server status=ok");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = ctrl_c().await {
            log::error!("event=signal_install module=server status=error signal=ctrl_c error={err}");
            std::future::pending::<()>().await;
        }
        info!("event=shutdown module=server status=start signal=ctrl_c");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("event=shutdown module=server status=start signal=terminate");
            }
            Err(err) => {
                log::error!(
                    "event=signal_install module=server status=error signal=terminate error={err}"
                );
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
