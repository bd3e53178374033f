pub mod assertions;
pub mod checks;
mod cli;
pub mod config;
pub mod report;
pub mod runner;

#[cfg(feature = "tests")]
pub mod test_utils;

pub use cli::{CliOptions, OutputFormat};

pub const BEACON_INTEGRITY_VERSION: &str = env!("CARGO_PKG_VERSION");
