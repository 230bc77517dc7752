use std::error::Error;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use workhorse::ShutdownSignal;
use workhorse_cli::driver;
use workhorse_cli::flags::{split_arguments, Flags};

fn main() -> ExitCode {
    let mut args = std::env::args();
    let program = args.next().unwrap_or_else(|| "workhorse".to_string());
    let split = split_arguments(args);
    let flags = Flags::parse_from(std::iter::once(program).chain(split.known));

    if let Err(e) = init_logging(&flags.log_level) {
        eprintln!("invalid --log-level '{}': {e}", flags.log_level);
        return ExitCode::FAILURE;
    }
    log_build_stamp();

    let shutdown = ShutdownSignal::new();
    if let Err(e) = install_signal_handler(&shutdown) {
        error!(error = %e, "unable to install signal handler");
        return ExitCode::FAILURE;
    }

    match driver::run(&flags, &split.supplemental, shutdown) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "workhorse failed");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init()
}

fn log_build_stamp() {
    info!(
        package = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        os = std::env::consts::OS,
        arch = std::env::consts::ARCH,
        profile = if cfg!(debug_assertions) { "debug" } else { "release" },
        "build stamp"
    );
}

/// SIGINT and SIGTERM stop admission and start the graceful shutdown.
fn install_signal_handler(shutdown: &ShutdownSignal) -> Result<(), ctrlc::Error> {
    let shutdown = shutdown.clone();
    ctrlc::set_handler(move || {
        if !shutdown.is_triggered() {
            info!("signal received; shutting down");
        }
        shutdown.trigger();
    })
}
