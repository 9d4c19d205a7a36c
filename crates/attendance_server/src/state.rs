use std::{
    sync::{Arc, Mutex},
    time::Instant,
};

use attendance_core::{AttendanceCalendar, AttendanceConfig, ConfigError, Geofence};
use rusqlite::Connection;

use super::error::AppError;

pub type SharedState = Arc<AppState>;

/// Process-wide server state.
///
/// The single SQLite connection is guarded by a mutex, so ledger writes are
/// serialized; the ledger's unique index still rejects duplicates from any
/// other process sharing the database file.
pub struct AppState {
    db: Mutex<Connection>,
    pub geofence: Geofence,
    pub calendar: AttendanceCalendar,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(conn: Connection, config: &AttendanceConfig) -> Result<SharedState, ConfigError> {
        Ok(Arc::new(Self {
            db: Mutex::new(conn),
            geofence: config.geofence()?,
            calendar: config.calendar()?,
            started_at: Instant::now(),
        }))
    }

    /// Runs `work` against the connection on the blocking thread pool.
    ///
    /// `public` is the client-facing message used if the pool or the lock fails.
    pub async fn run_blocking<T, F>(
        self: &Arc<Self>,
        public: &'static str,
        work: F,
    ) -> Result<T, AppError>
    where
        F: FnOnce(&Connection) -> T + Send + 'static,
        T: Send + 'static,
    {
        let state = Arc::clone(self);
        tokio::task::spawn_blocking(move || {
            let conn = state
                .db
                .lock()
                .map_err(|_| AppError::internal(public, "database mutex poisoned"))?;
            Ok(work(&conn))
        })
        .await
        .map_err(|err| AppError::internal(public, format!("blocking task failed: {err}")))?
    }
}
