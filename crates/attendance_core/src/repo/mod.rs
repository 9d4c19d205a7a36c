//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the ledger contract used by attendance and reporting services.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Ledger writes enforce `AttendanceRecord::validate()` before persistence.
//! - Per-day uniqueness violations surface as `RepoError::Duplicate`, not as
//!   opaque transport errors.

pub mod attendance_repo;
