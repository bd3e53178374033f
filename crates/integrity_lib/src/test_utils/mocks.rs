use std::collections::{HashMap, HashSet};
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use beacon_integrity_store::{QueryTable, SqlQuery};

use crate::checks;
use crate::config::CheckParameters;
use crate::runner::SnapshotSource;

/// An in-memory snapshot. Every query returns no rows unless a canned result
/// or error was registered for the check it belongs to. Checks are recognized
/// by their SQL under default [`CheckParameters`].
#[derive(Clone, Debug, Default)]
pub struct MockSnapshot {
    results: HashMap<String, QueryTable>,
    errors: HashMap<String, String>,
    missing_tables: HashSet<String>,
    latency: Duration,
}

impl MockSnapshot {
    pub fn with_result(mut self, check: &str, table: QueryTable) -> Self {
        self.results.insert(sql_of(check), table);
        self
    }

    pub fn with_error(mut self, check: &str, error: &str) -> Self {
        self.errors.insert(sql_of(check), error.to_string());
        self
    }

    /// Every query takes this long to answer.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn without_table(mut self, table: &str) -> Self {
        self.missing_tables.insert(table.to_string());
        self
    }
}

fn sql_of(check: &str) -> String {
    checks::find(check)
        .unwrap_or_else(|| panic!("unknown check {}", check))
        .query(&CheckParameters::default())
        .sql
        .into_owned()
}

#[async_trait]
impl SnapshotSource for MockSnapshot {
    async fn query_table(&self, query: &SqlQuery) -> anyhow::Result<QueryTable> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if let Some(error) = self.errors.get(query.sql.as_ref()) {
            return Err(anyhow!("{}", error));
        }
        Ok(self
            .results
            .get(query.sql.as_ref())
            .cloned()
            .unwrap_or_default())
    }

    async fn table_exists(&self, name: &str) -> anyhow::Result<bool> {
        Ok(!self.missing_tables.contains(name))
    }
}
