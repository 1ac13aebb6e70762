//! Entry point for the probemon binary.
#![forbid(unsafe_code)]

use std::process::ExitCode;

use env_logger::Env;
use log::error;

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();
    match probemon_cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(probemon_cli::CliError::ArgumentParsing(err)) => {
            let code = err.exit_code();
            if err.print().is_err() {
                return ExitCode::FAILURE;
            }
            u8::try_from(code).map_or(ExitCode::FAILURE, ExitCode::from)
        }
        Err(err) => {
            error!("probemon: {err}");
            ExitCode::FAILURE
        }
    }
}
