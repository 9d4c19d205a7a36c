//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate geofence, calendar and ledger calls into use-case APIs.
//! - Keep HTTP/CLI layers decoupled from storage details.

pub mod attendance_service;
pub mod report_service;
