//! Runs a selection of checks against a snapshot and collects their outcomes.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use beacon_integrity_common_types::Suite;
use beacon_integrity_store::{QueryTable, SqlQuery, Store};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::assertions::AssertionError;
use crate::checks::{self, IntegrityCheck};
use crate::config::{CheckParameters, CheckSelection, Config};

/// Where checks read their data from. [`Store`] is the real implementation;
/// tests use an in-memory one.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn query_table(&self, query: &SqlQuery) -> anyhow::Result<QueryTable>;

    async fn table_exists(&self, name: &str) -> anyhow::Result<bool>;
}

#[async_trait]
impl SnapshotSource for Store {
    async fn query_table(&self, query: &SqlQuery) -> anyhow::Result<QueryTable> {
        Store::query_table(self, query).await
    }

    async fn table_exists(&self, name: &str) -> anyhow::Result<bool> {
        Store::table_exists(self, name).await
    }
}

/// The checks of the catalog picked by `selection`, in catalog order.
pub fn select_checks(selection: &CheckSelection) -> Vec<IntegrityCheck> {
    checks::catalog()
        .into_iter()
        .filter(|check| selection.matches(check.suite, check.name))
        .collect()
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub concurrency: usize,
    pub fail_fast: bool,
    pub skip_missing_tables: bool,
    pub max_reported_rows: usize,
    pub parameters: CheckParameters,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for RunOptions {
    fn from(config: &Config) -> Self {
        Self {
            concurrency: config.concurrency,
            fail_fast: config.fail_fast,
            skip_missing_tables: config.skip_missing_tables,
            max_reported_rows: config.max_reported_rows,
            parameters: config.parameters.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum CheckOutcome {
    Passed,
    Failed {
        reason: String,
        /// At most `max_reported_rows` offending rows.
        offending: Option<QueryTable>,
        total_offending: usize,
    },
    Skipped {
        reason: String,
    },
    /// The check could not be evaluated, e.g. because its query failed.
    Errored {
        error: String,
    },
}

impl CheckOutcome {
    fn failed(err: AssertionError, max_reported_rows: usize) -> Self {
        let offending = err.offending_rows();
        CheckOutcome::Failed {
            reason: err.to_string(),
            total_offending: offending.map(QueryTable::len).unwrap_or_default(),
            offending: offending.map(|table| table.head(max_reported_rows)),
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, CheckOutcome::Passed)
    }

    /// Failed and errored checks both make the run unsuccessful.
    pub fn is_failure(&self) -> bool {
        matches!(self, CheckOutcome::Failed { .. } | CheckOutcome::Errored { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub name: &'static str,
    pub suite: Suite,
    pub description: &'static str,
    pub sql: String,
    #[serde(flatten)]
    pub outcome: CheckOutcome,
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Runs `checks` against `source`, at most `options.concurrency` at a time.
/// Results come back in the order of `checks`, regardless of the order in
/// which they complete.
pub async fn run_checks<S>(
    source: &S,
    checks: Vec<IntegrityCheck>,
    options: &RunOptions,
) -> Vec<CheckResult>
where
    S: SnapshotSource + ?Sized,
{
    info!(
        checks = checks.len(),
        concurrency = options.concurrency,
        "Running integrity checks"
    );

    let (tx_failed, rx_failed) = watch::channel(false);

    let results: Vec<CheckResult> = stream::iter(checks)
        .map(|check| {
            let tx_failed = &tx_failed;
            let rx_failed = rx_failed.clone();
            async move {
                if options.fail_fast && *rx_failed.borrow() {
                    let sql = check.query(&options.parameters).to_string();
                    return skipped(check, sql, "an earlier check failed");
                }

                let result = run_check(source, check, options).await;
                if result.outcome.is_failure() {
                    tx_failed.send_replace(true);
                }
                result
            }
        })
        .buffered(options.concurrency.max(1))
        .collect()
        .await;

    let failures = results.iter().filter(|r| r.outcome.is_failure()).count();
    info!(checks = results.len(), failures, "Finished integrity checks");
    results
}

async fn run_check<S>(source: &S, check: IntegrityCheck, options: &RunOptions) -> CheckResult
where
    S: SnapshotSource + ?Sized,
{
    let query = check.query(&options.parameters);
    let start = Instant::now();

    if options.skip_missing_tables {
        match missing_tables(source, &check).await {
            Ok(missing) if !missing.is_empty() => {
                warn!(check = check.name, missing = ?missing, "Skipping check, tables are missing");
                return skipped(
                    check,
                    query.to_string(),
                    &format!("missing table(s): {}", missing.join(", ")),
                );
            }
            Ok(_) => {}
            Err(err) => {
                return finish(
                    check,
                    &query,
                    CheckOutcome::Errored {
                        error: format!("{:#}", err),
                    },
                    start,
                );
            }
        }
    }

    debug!(check = check.name, "Running check");
    let outcome = match source.query_table(&query).await {
        Ok(table) => match check.expectation.evaluate(&table) {
            Ok(()) => {
                info!(check = check.name, "Check passed");
                CheckOutcome::Passed
            }
            Err(err) => {
                warn!(check = check.name, error = %err, "Check failed");
                CheckOutcome::failed(err, options.max_reported_rows)
            }
        },
        Err(err) => {
            error!(check = check.name, error = %err, "Check query failed");
            CheckOutcome::Errored {
                error: format!("{:#}", err),
            }
        }
    };

    finish(check, &query, outcome, start)
}

async fn missing_tables<S>(source: &S, check: &IntegrityCheck) -> anyhow::Result<Vec<&'static str>>
where
    S: SnapshotSource + ?Sized,
{
    let mut missing = vec![];
    for table in check.tables {
        if !source.table_exists(table).await? {
            missing.push(*table);
        }
    }
    Ok(missing)
}

fn skipped(check: IntegrityCheck, sql: String, reason: &str) -> CheckResult {
    CheckResult {
        name: check.name,
        suite: check.suite,
        description: check.description,
        sql,
        outcome: CheckOutcome::Skipped {
            reason: reason.to_string(),
        },
        elapsed: Duration::ZERO,
    }
}

fn finish(
    check: IntegrityCheck,
    query: &SqlQuery,
    outcome: CheckOutcome,
    start: Instant,
) -> CheckResult {
    CheckResult {
        name: check.name,
        suite: check.suite,
        description: check.description,
        sql: query.to_string(),
        outcome,
        elapsed: start.elapsed(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tracing_test::traced_test;

    use super::*;
    use crate::test_utils::mocks::MockSnapshot;

    fn one_row() -> QueryTable {
        QueryTable {
            columns: vec!["f_slot".to_string()],
            rows: vec![vec![json!(7)]],
        }
    }

    #[test]
    fn selection_keeps_catalog_order() {
        let selection = CheckSelection {
            suites: vec![Suite::Validators, Suite::Blocks],
            ..Default::default()
        };
        let selected = select_checks(&selection);
        let suites: Vec<_> = selected.iter().map(|c| c.suite).collect();
        assert_eq!(suites.first(), Some(&Suite::Blocks));
        assert_eq!(suites.last(), Some(&Suite::Validators));
        assert!(!suites.contains(&Suite::Blobs));
    }

    #[tokio::test]
    #[traced_test]
    async fn passing_and_failing_checks() {
        let source = MockSnapshot::default().with_result("block_gaps", one_row());
        let checks = select_checks(&CheckSelection {
            suites: vec![Suite::Blocks],
            ..Default::default()
        });

        let results = run_checks(&source, checks, &RunOptions::default()).await;
        assert_eq!(results.len(), 4);
        for result in &results {
            if result.name == "block_gaps" {
                match &result.outcome {
                    CheckOutcome::Failed {
                        total_offending,
                        offending,
                        ..
                    } => {
                        assert_eq!(*total_offending, 1);
                        assert_eq!(offending.as_ref(), Some(&one_row()));
                    }
                    other => panic!("unexpected outcome {:?}", other),
                }
            } else {
                assert!(result.outcome.is_passed(), "{}", result.name);
            }
        }
        assert!(logs_contain("Check failed"));
    }

    #[tokio::test]
    async fn offending_rows_are_truncated() {
        let many = QueryTable {
            columns: vec!["f_slot".to_string()],
            rows: (0..50).map(|i| vec![json!(i)]).collect(),
        };
        let source = MockSnapshot::default().with_result("max_blobs_per_block", many);
        let options = RunOptions {
            max_reported_rows: 3,
            ..Default::default()
        };

        let results = run_checks(&source, vec![checks::find("max_blobs_per_block").unwrap()], &options).await;
        match &results[0].outcome {
            CheckOutcome::Failed {
                offending,
                total_offending,
                ..
            } => {
                assert_eq!(*total_offending, 50);
                assert_eq!(offending.as_ref().unwrap().len(), 3);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn query_errors_are_reported() {
        let source = MockSnapshot::default().with_error("epoch_continuity", "relation does not exist");
        let results = run_checks(
            &source,
            vec![checks::find("epoch_continuity").unwrap()],
            &RunOptions::default(),
        )
        .await;
        match &results[0].outcome {
            CheckOutcome::Errored { error } => assert!(error.contains("relation does not exist")),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(results[0].outcome.is_failure());
    }

    #[tokio::test]
    async fn fail_fast_skips_remaining_checks() {
        let source = MockSnapshot::default().with_result("orphan_blocks_in_block_metrics", one_row());
        let options = RunOptions {
            concurrency: 1,
            fail_fast: true,
            ..Default::default()
        };

        let results = run_checks(&source, checks::catalog(), &options).await;
        assert!(results[0].outcome.is_failure());
        assert!(results[1..]
            .iter()
            .all(|r| matches!(r.outcome, CheckOutcome::Skipped { .. })));
    }

    #[tokio::test]
    async fn fail_fast_lets_running_checks_finish() {
        let source = MockSnapshot::default()
            .with_result("orphan_blocks_in_block_metrics", one_row())
            .with_latency(Duration::from_millis(50));
        let options = RunOptions {
            concurrency: 4,
            fail_fast: true,
            ..Default::default()
        };

        let results = run_checks(&source, checks::catalog(), &options).await;
        assert!(results[0].outcome.is_failure());
        // Started together with the failing check.
        assert!(results[1..4].iter().all(|r| r.outcome.is_passed()));
        // Scheduled after it failed.
        assert!(results[4..]
            .iter()
            .all(|r| matches!(r.outcome, CheckOutcome::Skipped { .. })));
    }

    #[test]
    fn json_fields_are_camel_case() {
        let result = CheckResult {
            name: "block_gaps",
            suite: Suite::Blocks,
            description: "gaps",
            sql: "select 1".to_string(),
            outcome: CheckOutcome::failed(
                AssertionError::UnexpectedRows { offending: one_row() },
                10,
            ),
            elapsed: Duration::from_millis(3),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["totalOffending"], 1);
        assert!(json.get("total_offending").is_none());
    }

    #[tokio::test]
    async fn missing_tables_are_skipped() {
        let source = MockSnapshot::default().without_table("t_blob_sidecars");
        let options = RunOptions {
            skip_missing_tables: true,
            ..Default::default()
        };

        let results = run_checks(&source, checks::catalog(), &options).await;
        for result in results {
            if result.suite == Suite::Blobs {
                assert_eq!(
                    result.outcome,
                    CheckOutcome::Skipped {
                        reason: "missing table(s): t_blob_sidecars".to_string()
                    }
                );
            } else {
                assert!(result.outcome.is_passed(), "{}", result.name);
            }
        }
    }

    #[tokio::test]
    async fn results_keep_input_order() {
        let source = MockSnapshot::default();
        let options = RunOptions {
            concurrency: 8,
            ..Default::default()
        };
        let names: Vec<_> = checks::catalog().iter().map(|c| c.name).collect();
        let results = run_checks(&source, checks::catalog(), &options).await;
        assert_eq!(results.iter().map(|r| r.name).collect::<Vec<_>>(), names);
    }
}
