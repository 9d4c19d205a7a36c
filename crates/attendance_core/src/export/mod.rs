//! Report export adapters.
//!
//! # Responsibility
//! - Render aggregated report rows into downloadable spreadsheet files.
//!
//! # Invariants
//! - Export never alters report content; one sheet row per report row.

pub mod xlsx;
