//! # attendance_cli
//!
//! Offline tooling over an attendance ledger database file.
//!
//! ## Commands
//!
//! - `monthly` - Aggregate one course for a calendar month
//! - `semester` - Aggregate one course between two dates
//! - `list` - Print every record, newest first
//!
//! Reports print as JSON rows unless `--export-dir` is given, in which case
//! the `.xlsx` workbook is written there and its path is printed.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use attendance_core::db::open_existing_db;
use attendance_core::{
    write_report_xlsx, AttendanceCalendar, AttendanceLedger, AttendanceReport, ReportAggregator,
    SqliteAttendanceLedger,
};
use clap::{Args, Parser, Subcommand};

/// Attendance ledger reporting tool.
#[derive(Debug, Parser)]
#[command(name = "attendance_cli")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the SQLite ledger file.
    #[arg(long, env = "ATTENDANCE_DB_PATH")]
    pub db: PathBuf,

    /// IANA timezone used for day and month boundaries.
    #[arg(long, env = "ATTENDANCE_TIMEZONE", default_value = "Asia/Bangkok")]
    pub timezone: String,

    /// Log level written to stderr.
    #[arg(long, env = "ATTENDANCE_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Per-student counts for one calendar month.
    Monthly(MonthlyArgs),
    /// Per-student counts between two dates.
    Semester(SemesterArgs),
    /// Every record, newest first.
    List,
}

#[derive(Debug, Args)]
pub struct MonthlyArgs {
    #[arg(long)]
    pub course: String,
    #[arg(long)]
    pub year: i32,
    /// 1-indexed month.
    #[arg(long)]
    pub month: u32,
    /// Write an `.xlsx` workbook into this directory instead of printing JSON.
    #[arg(long)]
    pub export_dir: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct SemesterArgs {
    #[arg(long)]
    pub course: String,
    /// Inclusive start, `YYYY-MM-DD` or RFC 3339.
    #[arg(long)]
    pub start: String,
    /// Exclusive end, `YYYY-MM-DD` or RFC 3339.
    #[arg(long)]
    pub end: String,
    #[arg(long)]
    pub export_dir: Option<PathBuf>,
}

/// Executes one parsed command, writing its output to `out`.
///
/// # Errors
///
/// Returns an error when the database file is missing or cannot be opened,
/// the timezone or period is invalid, or the export cannot be written.
pub fn run(cli: Cli, out: &mut impl Write) -> Result<()> {
    let calendar = AttendanceCalendar::from_name(&cli.timezone)
        .with_context(|| format!("invalid --timezone `{}`", cli.timezone))?;
    let conn = open_existing_db(&cli.db)
        .with_context(|| format!("failed to open ledger `{}`", cli.db.display()))?;
    let ledger = SqliteAttendanceLedger::new(&conn, calendar);

    match cli.command {
        Commands::Monthly(args) => {
            let report = ReportAggregator::new(ledger, calendar)
                .monthly_report(&args.course, args.year, args.month)
                .context("monthly report failed")?;
            emit_report(&report, args.export_dir, out)
        }
        Commands::Semester(args) => {
            let report = ReportAggregator::new(ledger, calendar)
                .semester_report(&args.course, &args.start, &args.end)
                .context("semester report failed")?;
            emit_report(&report, args.export_dir, out)
        }
        Commands::List => {
            let records = ledger.list_all().context("failed to list records")?;
            writeln!(out, "{}", serde_json::to_string_pretty(&records)?)?;
            Ok(())
        }
    }
}

fn emit_report(
    report: &AttendanceReport,
    export_dir: Option<PathBuf>,
    out: &mut impl Write,
) -> Result<()> {
    match export_dir {
        Some(dir) => {
            let path = write_report_xlsx(report, &dir)
                .with_context(|| format!("failed to export into `{}`", dir.display()))?;
            writeln!(out, "{}", path.display())?;
        }
        None => writeln!(out, "{}", serde_json::to_string_pretty(&report.rows)?)?,
    }
    Ok(())
}
