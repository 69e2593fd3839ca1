use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use phonedesk::api::{format_api_error, ApiError};
use phonedesk::cli::Cli;
use phonedesk::commands;
use phonedesk::output::print_error;

const LOG_ENV: &str = "PHONEDESK_LOG";

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(format!("phonedesk={default_level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let json = cli.json;

    match commands::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<ApiError>() {
                Some(api_err) if api_err.is_conflict() => {
                    if json {
                        print_error(json, "conflict", &format_api_error(api_err));
                    } else {
                        eprintln!("Warning: {}", format_api_error(api_err));
                    }
                }
                Some(api_err) => print_error(json, "api", &format_api_error(api_err)),
                None => print_error(json, "error", &format!("{err:#}")),
            }
            ExitCode::FAILURE
        }
    }
}
