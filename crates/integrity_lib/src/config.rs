//! Configuration parsing and validation.

use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

use anyhow::Context;
use beacon_integrity_common_types::{Slot, Suite, MAX_BLOBS_PER_BLOCK, SLOTS_PER_EPOCH};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::checks;
use crate::cli::CliOptions;

/// A [`serde`]-compatible representation of the YAML configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// The URL of the PostgreSQL database holding the indexed snapshot. Can be
    /// left out and passed on the command line or through the environment
    /// instead.
    #[serde(default)]
    pub database_url: Option<String>,
    /// Maximum number of checks running at the same time.
    #[serde(default = "Config::default_concurrency")]
    pub concurrency: usize,
    /// Size of the database connection pool.
    #[serde(default = "Config::default_pool_size")]
    pub pool_size: usize,
    /// How many offending rows to include in the report of a failed check.
    #[serde(default = "Config::default_max_reported_rows")]
    pub max_reported_rows: usize,
    /// Stop scheduling checks after the first failure.
    #[serde(default)]
    pub fail_fast: bool,
    /// Skip, rather than error out on, checks that read tables that are absent
    /// from the snapshot.
    #[serde(default)]
    pub skip_missing_tables: bool,
    #[serde(default)]
    pub checks: CheckSelection,
    #[serde(default)]
    pub parameters: CheckParameters,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            concurrency: Self::default_concurrency(),
            pool_size: Self::default_pool_size(),
            max_reported_rows: Self::default_max_reported_rows(),
            fail_fast: false,
            skip_missing_tables: false,
            checks: CheckSelection::default(),
            parameters: CheckParameters::default(),
        }
    }
}

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open config file {}", path.display()))?;
        serde_yaml::from_reader(file).context("invalid config file")
    }

    /// Builds the effective configuration: the config file, if any, with
    /// command line overrides applied on top.
    pub fn from_cli(options: &CliOptions) -> anyhow::Result<Self> {
        let mut config = match &options.config {
            Some(path) => Self::read(path)?,
            None => Self::default(),
        };

        if let Some(database_url) = &options.database_url {
            config.database_url = Some(database_url.clone());
        }
        if !options.suites.is_empty() {
            config.checks.suites = options.suites.clone();
        }
        if !options.checks.is_empty() {
            config.checks.only = options.checks.clone();
        }
        if options.fail_fast {
            config.fail_fast = true;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.pool_size == 0 {
            return Err(ConfigError::ZeroPoolSize);
        }
        if self.parameters.slots_per_epoch == 0 {
            return Err(ConfigError::ZeroSlotsPerEpoch);
        }

        let known: HashSet<&str> = checks::catalog().iter().map(|check| check.name).collect();
        for name in self.checks.only.iter().chain(&self.checks.exclude) {
            if !known.contains(name.as_str()) {
                return Err(ConfigError::UnknownCheck(name.clone()));
            }
        }

        if let Some(database_url) = &self.database_url {
            match Url::parse(database_url) {
                Ok(url) => {
                    if !matches!(url.scheme(), "postgres" | "postgresql") {
                        warn!(scheme = url.scheme(), "Database URL does not look like PostgreSQL");
                    }
                }
                // libpq's `host=.. user=..` connection strings are accepted too.
                Err(_) if is_keyword_value(database_url) => {}
                Err(e) => return Err(ConfigError::InvalidDatabaseUrl(e.to_string())),
            }
        }

        Ok(())
    }

    /// The database URL with its password masked, safe to log and to put in
    /// reports.
    pub fn redacted_database_url(&self) -> Option<String> {
        self.database_url.as_deref().map(redact_database_url)
    }

    fn default_concurrency() -> usize {
        4
    }

    fn default_pool_size() -> usize {
        beacon_integrity_store::DEFAULT_POOL_SIZE
    }

    fn default_max_reported_rows() -> usize {
        10
    }
}

/// Masks the password of a `postgres://` URL or of a libpq keyword/value
/// connection string.
pub fn redact_database_url(database_url: &str) -> String {
    match Url::parse(database_url) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("***"));
            }
            url.to_string()
        }
        Err(_) if is_keyword_value(database_url) => redact_keyword_value(database_url),
        Err(_) => "<unparseable database url>".to_string(),
    }
}

/// A libpq connection string is a sequence of `keyword = value` pairs; values
/// may be single-quoted with backslash escapes.
fn keyword_value_pairs(connection_string: &str) -> Option<Vec<(&str, &str)>> {
    let mut pairs = vec![];
    let mut rest = connection_string.trim_start();

    while !rest.is_empty() {
        let (keyword, after) = rest.split_once('=')?;
        let keyword = keyword.trim();
        if keyword.is_empty() || !keyword.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return None;
        }

        let after = after.trim_start();
        let value_len = if let Some(quoted) = after.strip_prefix('\'') {
            let mut escaped = false;
            let close = quoted.char_indices().find_map(|(i, c)| match c {
                _ if escaped => {
                    escaped = false;
                    None
                }
                '\\' => {
                    escaped = true;
                    None
                }
                '\'' => Some(i),
                _ => None,
            })?;
            close + 2
        } else {
            after.find(char::is_whitespace).unwrap_or(after.len())
        };

        pairs.push((keyword, &after[..value_len]));
        rest = after[value_len..].trim_start();
    }

    (!pairs.is_empty()).then_some(pairs)
}

fn is_keyword_value(connection_string: &str) -> bool {
    keyword_value_pairs(connection_string).is_some()
}

fn redact_keyword_value(connection_string: &str) -> String {
    keyword_value_pairs(connection_string)
        .unwrap_or_default()
        .into_iter()
        .map(|(keyword, value)| {
            if keyword == "password" {
                format!("{}=***", keyword)
            } else {
                format!("{}={}", keyword, value)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Which checks to run. All filters must match for a check to be selected;
/// empty lists match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckSelection {
    /// Only run checks of these suites.
    #[serde(default)]
    pub suites: Vec<Suite>,
    /// Only run the checks with these names.
    #[serde(default)]
    pub only: Vec<String>,
    /// Never run the checks with these names.
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl CheckSelection {
    pub fn matches(&self, suite: Suite, name: &str) -> bool {
        (self.suites.is_empty() || self.suites.contains(&suite))
            && (self.only.is_empty() || self.only.iter().any(|n| n == name))
            && !self.exclude.iter().any(|n| n == name)
    }
}

/// Values bound to the placeholders of the checks' SQL.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckParameters {
    /// Orphaned blocks are only looked for after this slot (the merge).
    #[serde(default = "CheckParameters::default_merge_slot")]
    pub merge_slot: Slot,
    /// The execution-layer block number from which gaps are looked for.
    #[serde(default = "CheckParameters::default_gap_check_start_block")]
    pub gap_check_start_block: u64,
    #[serde(default = "CheckParameters::default_max_blobs_per_block")]
    pub max_blobs_per_block: u64,
    #[serde(default = "CheckParameters::default_slots_per_epoch")]
    pub slots_per_epoch: u64,
}

impl Default for CheckParameters {
    fn default() -> Self {
        Self {
            merge_slot: Self::default_merge_slot(),
            gap_check_start_block: Self::default_gap_check_start_block(),
            max_blobs_per_block: Self::default_max_blobs_per_block(),
            slots_per_epoch: Self::default_slots_per_epoch(),
        }
    }
}

impl CheckParameters {
    fn default_merge_slot() -> Slot {
        Slot(4700012)
    }

    fn default_gap_check_start_block() -> u64 {
        16307594
    }

    fn default_max_blobs_per_block() -> u64 {
        MAX_BLOBS_PER_BLOCK
    }

    fn default_slots_per_epoch() -> u64 {
        SLOTS_PER_EPOCH
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("concurrency must be at least 1")]
    ZeroConcurrency,
    #[error("pool size must be at least 1")]
    ZeroPoolSize,
    #[error("slots per epoch must be at least 1")]
    ZeroSlotsPerEpoch,
    #[error("unknown check `{0}`")]
    UnknownCheck(String),
    #[error("invalid database URL: {0}")]
    InvalidDatabaseUrl(String),
}
