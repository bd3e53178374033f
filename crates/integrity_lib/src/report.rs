use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::runner::{CheckOutcome, CheckResult};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errored: usize,
}

impl Summary {
    pub fn of(results: &[CheckResult]) -> Self {
        let mut summary = Summary {
            total: results.len(),
            ..Default::default()
        };
        for result in results {
            match result.outcome {
                CheckOutcome::Passed => summary.passed += 1,
                CheckOutcome::Failed { .. } => summary.failed += 1,
                CheckOutcome::Skipped { .. } => summary.skipped += 1,
                CheckOutcome::Errored { .. } => summary.errored += 1,
            }
        }
        summary
    }
}

/// The outcome of a whole run, as printed at the end of it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// The database URL with its password masked.
    pub database: Option<String>,
    pub summary: Summary,
    pub results: Vec<CheckResult>,
}

impl Report {
    pub fn new(
        started_at: DateTime<Utc>,
        database: Option<String>,
        results: Vec<CheckResult>,
    ) -> Self {
        Self {
            started_at,
            finished_at: Utc::now(),
            database,
            summary: Summary::of(&results),
            results,
        }
    }

    /// No check failed or errored. Skipped checks don't count against a run.
    pub fn is_success(&self) -> bool {
        self.summary.failed == 0 && self.summary.errored == 0
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn render_text(&self, max_rows: usize) -> String {
        let mut out = String::new();

        for result in &self.results {
            let status = match &result.outcome {
                CheckOutcome::Passed => "PASS",
                CheckOutcome::Failed { .. } => "FAIL",
                CheckOutcome::Skipped { .. } => "SKIP",
                CheckOutcome::Errored { .. } => "ERROR",
            };
            let _ = writeln!(
                out,
                "[{:<5}] {}/{} ({} ms)",
                status,
                result.suite,
                result.name,
                result.elapsed.as_millis()
            );

            match &result.outcome {
                CheckOutcome::Passed => {}
                CheckOutcome::Failed {
                    reason,
                    offending,
                    total_offending,
                } => {
                    let _ = writeln!(out, "        {}", result.description);
                    let _ = writeln!(out, "        {}", reason);
                    if let Some(offending) = offending {
                        for line in offending.render(max_rows).lines() {
                            let _ = writeln!(out, "        {}", line);
                        }
                        if *total_offending > offending.len() {
                            let _ = writeln!(
                                out,
                                "        ({} of {} offending rows shown)",
                                offending.len().min(max_rows),
                                total_offending
                            );
                        }
                    }
                    let _ = writeln!(out, "        query: {}", one_line(&result.sql));
                }
                CheckOutcome::Skipped { reason } => {
                    let _ = writeln!(out, "        {}", reason);
                }
                CheckOutcome::Errored { error } => {
                    let _ = writeln!(out, "        {}", error);
                    let _ = writeln!(out, "        query: {}", one_line(&result.sql));
                }
            }
        }

        let s = &self.summary;
        let _ = writeln!(
            out,
            "\n{} checks: {} passed, {} failed, {} errored, {} skipped",
            s.total, s.passed, s.failed, s.errored, s.skipped
        );
        if let Some(database) = &self.database {
            let _ = writeln!(out, "database: {}", database);
        }
        out
    }
}

fn one_line(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}
