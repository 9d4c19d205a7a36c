//! Attendance server entry point.

use std::process::ExitCode;

use attendance_server::{config::ServerConfig, init_server_logging, start_server};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match ServerConfig::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("attendance_server: {err}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = init_server_logging(&config) {
        eprintln!("attendance_server: {err}");
        return ExitCode::FAILURE;
    }

    match start_server(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("event=server_exit module=server status=error error={err}");
            eprintln!("attendance_server: {err}");
            ExitCode::FAILURE
        }
    }
}
