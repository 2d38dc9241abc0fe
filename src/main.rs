// Entrypoint for the CLI application.
// - Keeps `main` small: parse, set up logging, hand over to `commands`.
// - Every failure ends up as one `[ERROR]` line and a class-specific exit code.

use std::{env, io, process};

use anyhow::Context;
use clap::Parser;
use logserver_cli::cli::{normalize_args, Cli};
use logserver_cli::commands::execute_command;
use logserver_cli::exitcode;
use logserver_cli::ui::Reporter;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

fn main() {
    let cli = match Cli::try_parse_from(normalize_args(env::args_os())) {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() {
                exitcode::USAGE
            } else {
                exitcode::OK
            };
            let _ = e.print();
            process::exit(code);
        }
    };

    if let Err(e) = setup_logging(cli.debug) {
        eprintln!("Warning: {:#}", e);
    }

    if let Err(e) = execute_command(&cli) {
        let mut report = Reporter::stderr();
        report.error(e.to_string());
        if let Some(hint) = e.hint() {
            report.info(hint);
        }
        process::exit(e.exit_code());
    }
}

fn setup_logging(verbosity: u8) -> anyhow::Result<()> {
    let level = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    // RUST_LOG wins over -d when set
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env()
        .context("invalid RUST_LOG")?;

    let fmt_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(true)
        .with_thread_names(false);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .try_init()
        .context("failed to install log subscriber")?;

    tracing::debug!(?level, "logging initialized");
    Ok(())
}
