//! Geofence admissibility for attendance submissions.
//!
//! # Responsibility
//! - Compute great-circle distance between two coordinates (haversine).
//! - Decide whether a point lies inside the configured circular boundary.
//!
//! # Invariants
//! - Pure functions only; no I/O and no clock access.
//! - A `Geofence` always has a finite positive radius and an in-range center.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Mean earth radius used by the haversine formula, in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// WGS84-style coordinate pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Returns whether both components are finite and inside valid degree ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GeoError {
    InvalidReference(GeoPoint),
    InvalidRadius(f64),
}

impl Display for GeoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidReference(point) => write!(
                f,
                "reference point ({}, {}) is outside valid coordinate ranges",
                point.lat, point.lng
            ),
            Self::InvalidRadius(radius) => {
                write!(f, "geofence radius must be finite and positive, got {radius}")
            }
        }
    }
}

impl Error for GeoError {}

/// Great-circle distance between `p1` and `p2` in kilometres.
pub fn distance_km(p1: GeoPoint, p2: GeoPoint) -> f64 {
    let d_lat = (p2.lat - p1.lat).to_radians();
    let d_lon = (p2.lng - p1.lng).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + p1.lat.to_radians().cos() * p2.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Circular permitted area around a reference coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geofence {
    reference: GeoPoint,
    radius_km: f64,
}

impl Geofence {
    /// Builds a geofence after validating center and radius.
    ///
    /// # Errors
    /// - `InvalidReference` when the center is non-finite or out of range.
    /// - `InvalidRadius` when the radius is non-finite, zero or negative.
    pub fn new(reference: GeoPoint, radius_km: f64) -> Result<Self, GeoError> {
        if !reference.is_valid() {
            return Err(GeoError::InvalidReference(reference));
        }
        if !radius_km.is_finite() || radius_km <= 0.0 {
            return Err(GeoError::InvalidRadius(radius_km));
        }
        Ok(Self {
            reference,
            radius_km,
        })
    }

    pub fn reference(&self) -> GeoPoint {
        self.reference
    }

    pub fn radius_km(&self) -> f64 {
        self.radius_km
    }

    /// Distance from `point` to the reference location, in kilometres.
    pub fn distance_from_reference_km(&self, point: GeoPoint) -> f64 {
        distance_km(point, self.reference)
    }

    /// Returns whether `point` lies on or inside the boundary.
    pub fn is_within_allowed_area(&self, point: GeoPoint) -> bool {
        self.distance_from_reference_km(point) <= self.radius_km
    }

    /// Radius figure quoted to users when a submission is rejected.
    ///
    /// Deployed clients have always shown `radius_km * 100` as the meter
    /// limit (150 for the 1.5 km campus fence); keep that figure stable.
    pub fn advertised_radius_m(&self) -> u32 {
        (self.radius_km * 100.0).round() as u32
    }
}
