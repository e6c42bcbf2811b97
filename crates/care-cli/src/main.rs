//! Engine Care CLI entry point.

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use care_cli::cli::Cli;
use care_cli::commands;
use care_cli::config::Config;

fn main() {
    // Load .env.local if it exists (CARE_STATE_DIR, CARE_ACTOR)
    let _ = dotenvy::from_filename(".env.local");

    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level().to_string()));

    // Logs go to stderr so JSON output stays parseable.
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::resolve(cli.state_dir);

    let result = match config.open() {
        Ok(services) => commands::execute(cli.command, &services, cli.actor, cli.format),
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
