//! Environment-driven server configuration.
//!
//! Every setting has a default so a bare `attendance_server` starts against
//! `./attendance.sqlite3` with the reference campus geofence.

use attendance_core::{default_log_level, AttendanceConfig};
use std::{env, path::PathBuf};
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_PATH: &str = "attendance.sqlite3";

/// Environment keys that override individual attendance options.
const ATTENDANCE_OVERRIDES: [(&str, &str); 4] = [
    ("ATTENDANCE_REFERENCE_LAT", "referenceLat"),
    ("ATTENDANCE_REFERENCE_LNG", "referenceLng"),
    ("ATTENDANCE_RADIUS_KM", "radiusKm"),
    ("ATTENDANCE_TIMEZONE", "timezone"),
];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid ATTENDANCE_PORT value `{0}`")]
    InvalidPort(String),

    #[error(transparent)]
    Attendance(#[from] attendance_core::ConfigError),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub db_path: PathBuf,
    pub log_level: String,
    /// Absolute directory for rolling log files; stderr when unset.
    pub log_dir: Option<String>,
    pub attendance: AttendanceConfig,
}

impl ServerConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    ///
    /// Option precedence: defaults, then the JSON file named by
    /// `ATTENDANCE_CONFIG`, then individual `ATTENDANCE_*` overrides.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let port = match var("ATTENDANCE_PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(raw))?,
            None => DEFAULT_PORT,
        };

        let mut attendance = match var("ATTENDANCE_CONFIG") {
            Some(path) => AttendanceConfig::from_json_file(path.trim())?,
            None => AttendanceConfig::default(),
        };
        for (env_key, option) in ATTENDANCE_OVERRIDES {
            if let Some(value) = var(env_key) {
                attendance.set_option(option, &value)?;
            }
        }
        attendance.geofence()?;
        attendance.calendar()?;

        Ok(Self {
            port,
            db_path: var("ATTENDANCE_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
            log_level: var("ATTENDANCE_LOG_LEVEL")
                .unwrap_or_else(|| default_log_level().to_string()),
            log_dir: var("ATTENDANCE_LOG_DIR"),
            attendance,
        })
    }
}
