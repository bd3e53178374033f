//! The catalog of integrity checks. Every check is a literal SQL query over
//! the indexed snapshot plus an expectation on its result.

mod blobs;
mod blocks;
mod epoch_metrics;
mod head_events;
mod transactions;
mod validators;

use beacon_integrity_common_types::Suite;
use beacon_integrity_store::{QueryTable, SqlQuery};
use serde::Serialize;

use crate::assertions::{assert_columns_equal, assert_no_rows, AssertionError};
use crate::config::CheckParameters;

/// What the result of a check's query must look like for the check to pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expectation {
    /// The query returns offending rows, so it must return none.
    NoRows,
    /// Every returned row holds the same value in both columns.
    ColumnsEqual {
        left: &'static str,
        right: &'static str,
    },
}

impl Expectation {
    pub fn evaluate(&self, table: &QueryTable) -> Result<(), AssertionError> {
        match self {
            Expectation::NoRows => assert_no_rows(table),
            Expectation::ColumnsEqual { left, right } => assert_columns_equal(table, left, right),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IntegrityCheck {
    pub name: &'static str,
    pub suite: Suite,
    pub description: &'static str,
    /// Tables the query reads from.
    pub tables: &'static [&'static str],
    pub expectation: Expectation,
    query: fn(&CheckParameters) -> SqlQuery,
}

impl IntegrityCheck {
    pub fn query(&self, parameters: &CheckParameters) -> SqlQuery {
        (self.query)(parameters)
    }
}

/// All known checks, grouped by suite.
pub fn catalog() -> Vec<IntegrityCheck> {
    let mut checks = vec![];
    checks.extend(blocks::checks());
    checks.extend(transactions::checks());
    checks.extend(blobs::checks());
    checks.extend(epoch_metrics::checks());
    checks.extend(head_events::checks());
    checks.extend(validators::checks());
    checks
}

/// Looks up a single check by name.
pub fn find(name: &str) -> Option<IntegrityCheck> {
    catalog().into_iter().find(|check| check.name == name)
}

fn as_bigint(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
