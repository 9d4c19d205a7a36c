//! Entry point for the `attendance_cli` binary.

use std::io::stdout;

use anyhow::{anyhow, Result};
use attendance_cli::Cli;
use attendance_core::init_console_logging;
use clap::Parser;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_console_logging(&cli.log_level).map_err(|err| anyhow!(err))?;

    attendance_cli::run(cli, &mut stdout().lock())
}
