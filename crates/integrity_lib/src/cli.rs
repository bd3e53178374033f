use std::path::PathBuf;

use beacon_integrity_common_types::Suite;
use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[clap(author, about, version)]
pub struct CliOptions {
    /// Path to the YAML configuration file.
    #[clap(long)]
    pub config: Option<PathBuf>,
    /// The URL of the PostgreSQL database to check. Overrides the one in the
    /// configuration file. Can also be set via env. var.
    #[clap(long, env = "BEACON_INTEGRITY_DB_URL")]
    pub database_url: Option<String>,
    /// Only run checks of this suite. Can be repeated.
    #[clap(long = "suite")]
    pub suites: Vec<Suite>,
    /// Only run the check with this name. Can be repeated.
    #[clap(long = "check")]
    pub checks: Vec<String>,
    /// Print the available checks and exit.
    #[clap(long)]
    pub list: bool,
    /// Stop after the first failing check.
    #[clap(long)]
    pub fail_fast: bool,
    #[clap(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
