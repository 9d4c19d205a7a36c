//! Domain model for course attendance.
//!
//! # Responsibility
//! - Define the canonical attendance record and its action vocabulary.
//! - Own calendar-day and reporting-period arithmetic.
//!
//! # Invariants
//! - Every persisted record is identified by a stable `RecordId`.
//! - Records are create-only; nothing in the model mutates a stored record.

pub mod attendance;
pub mod calendar;
