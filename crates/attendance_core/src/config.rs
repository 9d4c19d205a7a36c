//! Deployment settings for geofence and calendar behavior.
//!
//! # Responsibility
//! - Hold the recognized options `referenceLat`, `referenceLng`,
//!   `radiusKm` and `timezone`.
//! - Load them from JSON and turn them into validated runtime values.
//!
//! # Invariants
//! - Missing options fall back to the reference campus deployment.
//! - Invalid options are reported, never silently replaced.

use crate::geo::{GeoError, GeoPoint, Geofence};
use crate::model::calendar::{AttendanceCalendar, CalendarError};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const DEFAULT_REFERENCE_LAT: f64 = 18.824518;
pub const DEFAULT_REFERENCE_LNG: f64 = 99.045474;
pub const DEFAULT_RADIUS_KM: f64 = 1.5;
pub const DEFAULT_TIMEZONE_NAME: &str = "Asia/Bangkok";

#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
    Geofence(GeoError),
    Calendar(CalendarError),
    /// An override value could not be parsed for the named key.
    InvalidValue { key: String, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config JSON: {err}"),
            Self::Geofence(err) => write!(f, "invalid geofence config: {err}"),
            Self::Calendar(err) => write!(f, "invalid calendar config: {err}"),
            Self::InvalidValue { key, value } => write!(f, "invalid value `{value}` for {key}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Geofence(err) => Some(err),
            Self::Calendar(err) => Some(err),
            Self::InvalidValue { .. } => None,
        }
    }
}

impl From<GeoError> for ConfigError {
    fn from(value: GeoError) -> Self {
        Self::Geofence(value)
    }
}

impl From<CalendarError> for ConfigError {
    fn from(value: CalendarError) -> Self {
        Self::Calendar(value)
    }
}

/// Attendance deployment options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct AttendanceConfig {
    pub reference_lat: f64,
    pub reference_lng: f64,
    pub radius_km: f64,
    /// IANA zone name used for calendar-day boundaries.
    pub timezone: String,
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self {
            reference_lat: DEFAULT_REFERENCE_LAT,
            reference_lng: DEFAULT_REFERENCE_LNG,
            radius_km: DEFAULT_RADIUS_KM,
            timezone: DEFAULT_TIMEZONE_NAME.to_string(),
        }
    }
}

impl AttendanceConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(ConfigError::Parse)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Applies one `key=value` style override using the JSON option names.
    pub fn set_option(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        let trimmed = value.trim();
        match key {
            "referenceLat" => self.reference_lat = trimmed.parse().map_err(|_| invalid())?,
            "referenceLng" => self.reference_lng = trimmed.parse().map_err(|_| invalid())?,
            "radiusKm" => self.radius_km = trimmed.parse().map_err(|_| invalid())?,
            "timezone" => self.timezone = trimmed.to_string(),
            _ => return Err(invalid()),
        }
        Ok(())
    }

    pub fn geofence(&self) -> Result<Geofence, ConfigError> {
        Ok(Geofence::new(
            GeoPoint::new(self.reference_lat, self.reference_lng),
            self.radius_km,
        )?)
    }

    pub fn calendar(&self) -> Result<AttendanceCalendar, ConfigError> {
        Ok(AttendanceCalendar::from_name(&self.timezone)?)
    }
}
