use std::process::ExitCode;

use anyhow::Context;
use beacon_integrity_lib::config::Config;
use beacon_integrity_lib::report::Report;
use beacon_integrity_lib::runner::{self, RunOptions};
use beacon_integrity_lib::{checks, CliOptions, OutputFormat, BEACON_INTEGRITY_VERSION};
use beacon_integrity_store::Store;
use clap::Parser;
use tracing::*;
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    init_tracing();

    info!(version = BEACON_INTEGRITY_VERSION, "Parse options");
    let cli_options = CliOptions::parse();

    if cli_options.list {
        print_catalog();
        return Ok(ExitCode::SUCCESS);
    }

    info!("Loading configuration");
    let config = Config::from_cli(&cli_options)?;
    let database_url = config.database_url.as_deref().context(
        "no database URL, pass --database-url, set BEACON_INTEGRITY_DB_URL or add databaseUrl to the config file",
    )?;

    let started_at = chrono::Utc::now();
    info!(database = ?config.redacted_database_url(), "Initialize store");
    let store = Store::with_pool_size(database_url, config.pool_size)
        .await
        .context("failed to connect to the database")?;

    let checks = runner::select_checks(&config.checks);
    if checks.is_empty() {
        warn!("No check matches the selection");
    }
    let results = runner::run_checks(&store, checks, &RunOptions::from(&config)).await;
    let report = Report::new(started_at, config.redacted_database_url(), results);

    match cli_options.format {
        OutputFormat::Text => print!("{}", report.render_text(config.max_reported_rows)),
        OutputFormat::Json => println!("{}", report.to_json()?),
    }

    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn init_tracing() {
    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    // Logs go to stderr so that stdout only carries the report.
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}

fn print_catalog() {
    for check in checks::catalog() {
        println!("{}/{}", check.suite, check.name);
        println!("    {}", check.description);
    }
}
