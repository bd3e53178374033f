use std::fmt::Write;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The tabular result of a query: column names in select-list order, and one
/// vector of JSON values per row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryTable {
    /// Builds a table out of JSON objects as returned by `row_to_json`. The
    /// columns are taken from the first row; missing keys in later rows become
    /// `null`.
    pub fn from_json_rows(objects: Vec<Map<String, Value>>) -> Self {
        let columns: Vec<String> = objects
            .first()
            .map(|first| first.keys().cloned().collect())
            .unwrap_or_default();

        let rows = objects
            .into_iter()
            .map(|mut object| {
                columns
                    .iter()
                    .map(|column| object.remove(column).unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// All values of the named column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }

    /// The value of the first row's first column, e.g. for `select count(*)`.
    pub fn scalar(&self) -> Option<&Value> {
        self.rows.first().and_then(|row| row.first())
    }

    /// Returns a copy of this table with at most `max_rows` rows.
    pub fn head(&self, max_rows: usize) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(max_rows).cloned().collect(),
        }
    }

    /// Renders up to `max_rows` rows as a plain-text table.
    pub fn render(&self, max_rows: usize) -> String {
        if self.columns.is_empty() {
            return "(no rows)".to_string();
        }

        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .take(max_rows)
            .map(|row| row.iter().map(render_value).collect())
            .collect();

        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                cells
                    .iter()
                    .map(|row| row[i].len())
                    .chain(std::iter::once(column.len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut out = String::new();
        let header: Vec<String> = self
            .columns
            .iter()
            .zip(&widths)
            .map(|(column, width)| format!("{:<width$}", column, width = width))
            .collect();
        let _ = writeln!(out, "{}", header.join(" | ").trim_end());
        let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        let _ = writeln!(out, "{}", separator.join("-+-"));
        for row in &cells {
            let line: Vec<String> = row
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{:<width$}", cell, width = width))
                .collect();
            let _ = writeln!(out, "{}", line.join(" | ").trim_end());
        }
        if self.rows.len() > max_rows {
            let _ = writeln!(out, "... {} more row(s)", self.rows.len() - max_rows);
        }
        out
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
