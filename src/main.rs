//! Command-line reporter.
//!
//! Sends one message to the configured endpoint and prints the assigned
//! event id:
//!
//! ```text
//! FLARE_DSN=https://key@ingest.example.com/1 flare "deploy finished" info
//! ```

use std::process::ExitCode;

use anyhow::{Context, Result};
use flare::{Config, Level, Reporter};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let config = Config::load()?;
    flare::telemetry::init_tracing(&config.rust_log)?;

    let mut args = std::env::args().skip(1);
    let message = args.next().context("usage: flare <message> [level]")?;
    let level = match args.next() {
        Some(raw) => raw.parse::<Level>().context("Invalid level")?,
        None => Level::Info,
    };

    let reporter = Reporter::from_config(&config)?;
    info!(dsn = %reporter.dsn(), %level, "Sending event");

    match reporter.capture_message(&message, level).await {
        Some(id) => {
            println!("{id}");
            Ok(ExitCode::SUCCESS)
        },
        None => {
            warn!("No event id returned");
            Ok(ExitCode::FAILURE)
        },
    }
}
