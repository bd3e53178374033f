//! The two assertions every integrity check boils down to.

use beacon_integrity_store::QueryTable;
use serde_json::{Number, Value};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AssertionError {
    #[error("expected no rows, found {}", .offending.len())]
    UnexpectedRows { offending: QueryTable },
    #[error("expected {left} to equal {right}")]
    NotEqual { left: Value, right: Value },
    #[error("columns `{left}` and `{right}` differ in {} row(s)", .offending.len())]
    ColumnsDiffer {
        left: String,
        right: String,
        offending: QueryTable,
    },
    #[error("column `{0}` is missing from the result")]
    MissingColumn(String),
}

impl AssertionError {
    /// The rows that violate the assertion, if it is about rows.
    pub fn offending_rows(&self) -> Option<&QueryTable> {
        match self {
            AssertionError::UnexpectedRows { offending } => Some(offending),
            AssertionError::ColumnsDiffer { offending, .. } => Some(offending),
            AssertionError::NotEqual { .. } | AssertionError::MissingColumn(_) => None,
        }
    }
}

pub fn assert_no_rows(table: &QueryTable) -> Result<(), AssertionError> {
    if table.is_empty() {
        Ok(())
    } else {
        Err(AssertionError::UnexpectedRows {
            offending: table.clone(),
        })
    }
}

/// Equality of two scalars or arrays. Numbers compare by value, so `3` equals
/// `3.0` (Postgres renders `numeric` aggregates either way). Decimal numbers
/// compare exactly, whatever their magnitude.
pub fn assert_equal(left: &Value, right: &Value) -> Result<(), AssertionError> {
    if values_equal(left, right) {
        Ok(())
    } else {
        Err(AssertionError::NotEqual {
            left: left.clone(),
            right: right.clone(),
        })
    }
}

/// Every row must hold equal values in the two named columns.
pub fn assert_columns_equal(
    table: &QueryTable,
    left: &str,
    right: &str,
) -> Result<(), AssertionError> {
    let l = table
        .column_index(left)
        .ok_or_else(|| AssertionError::MissingColumn(left.to_string()));
    let r = table
        .column_index(right)
        .ok_or_else(|| AssertionError::MissingColumn(right.to_string()));

    // An empty result has no columns to look at, and nothing to compare.
    if table.is_empty() {
        return Ok(());
    }
    let (l, r) = (l?, r?);

    let offending: Vec<Vec<Value>> = table
        .rows
        .iter()
        .filter(|row| assert_equal(&row[l], &row[r]).is_err())
        .cloned()
        .collect();

    if offending.is_empty() {
        Ok(())
    } else {
        Err(AssertionError::ColumnsDiffer {
            left: left.to_string(),
            right: right.to_string(),
            offending: QueryTable {
                columns: table.columns.clone(),
                rows: offending,
            },
        })
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => match (decimal_digits(l), decimal_digits(r)) {
            (Some(l), Some(r)) => l == r,
            _ => l.as_f64() == r.as_f64(),
        },
        (Value::Array(l), Value::Array(r)) => {
            l.len() == r.len() && l.iter().zip(r).all(|(l, r)| values_equal(l, r))
        }
        _ => left == right,
    }
}

/// Canonical form of a plain decimal number: no leading zeros in the integer
/// part, no trailing zeros in the fraction, no sign on zero. `None` for
/// numbers in exponent notation.
fn decimal_digits(number: &Number) -> Option<String> {
    let text = number.to_string();
    if text.contains(['e', 'E']) {
        return None;
    }

    let (negative, digits) = match text.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, text.as_str()),
    };
    let (integer, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    let integer = match integer.trim_start_matches('0') {
        "" => "0",
        integer => integer,
    };
    let fraction = fraction.trim_end_matches('0');

    let mut canonical = String::new();
    if negative && (integer != "0" || !fraction.is_empty()) {
        canonical.push('-');
    }
    canonical.push_str(integer);
    if !fraction.is_empty() {
        canonical.push('.');
        canonical.push_str(fraction);
    }
    Some(canonical)
}

#[cfg(test)]
mod tests {
    use quickcheck_macros::quickcheck;
    use serde_json::json;

    use super::*;

    fn table(columns: &[&str], rows: Vec<Vec<Value>>) -> QueryTable {
        QueryTable {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    #[test]
    fn no_rows() {
        assert!(assert_no_rows(&QueryTable::default()).is_ok());

        let offending = table(&["f_slot"], vec![vec![json!(1)], vec![json!(2)]]);
        let err = assert_no_rows(&offending).unwrap_err();
        assert_eq!(err.to_string(), "expected no rows, found 2");
        assert_eq!(err.offending_rows(), Some(&offending));
    }

    #[test]
    fn equal_scalars_and_arrays() {
        assert!(assert_equal(&json!(32), &json!(32.0)).is_ok());
        assert!(assert_equal(&json!("a"), &json!("a")).is_ok());
        assert!(assert_equal(&json!([1, 2, 3]), &json!([1, 2.0, 3])).is_ok());
        assert!(assert_equal(&json!([1, 2]), &json!([1, 2, 3])).is_err());
        assert!(assert_equal(&json!(null), &json!(0)).is_err());

        let err = assert_equal(&json!(31), &json!(32)).unwrap_err();
        assert_eq!(err.to_string(), "expected 31 to equal 32");
    }

    #[test]
    fn columns_equal() {
        let ok = table(&["indexed_slots", "slot_span"], vec![vec![json!(64), json!(64)]]);
        assert!(assert_columns_equal(&ok, "indexed_slots", "slot_span").is_ok());

        let bad = table(
            &["f_epoch", "a", "b"],
            vec![
                vec![json!(1), json!(5), json!(5)],
                vec![json!(2), json!(5), json!(6)],
            ],
        );
        let err = assert_columns_equal(&bad, "a", "b").unwrap_err();
        assert_eq!(err.offending_rows().unwrap().rows, vec![vec![json!(2), json!(5), json!(6)]]);

        assert_eq!(
            assert_columns_equal(&ok, "indexed_slots", "nope"),
            Err(AssertionError::MissingColumn("nope".to_string()))
        );
        assert!(assert_columns_equal(&QueryTable::default(), "a", "b").is_ok());
    }

    #[test]
    fn large_numbers_compare_exactly() {
        let table = QueryTable::from_json_rows(vec![serde_json::from_str(
            r#"{"a": 18446744073709551617, "b": 18446744073709551616, "c": 18446744073709551617.0}"#,
        )
        .unwrap()]);

        assert!(assert_columns_equal(&table, "a", "b").is_err());
        assert!(assert_columns_equal(&table, "a", "c").is_ok());
        assert!(assert_equal(&table.rows[0][0], &table.rows[0][1]).is_err());
    }

    #[test]
    fn decimals_compare_by_value() {
        let parse = |s: &str| serde_json::from_str::<Value>(s).unwrap();
        assert!(assert_equal(&parse("1.50"), &parse("1.5")).is_ok());
        assert!(assert_equal(&parse("-0.0"), &parse("0")).is_ok());
        assert!(assert_equal(&parse("0.1"), &parse("0.10000000000000000001")).is_err());
        assert!(assert_equal(&parse("-3"), &parse("3")).is_err());
    }

    #[quickcheck]
    fn equality_is_reflexive(n: i64, s: String) -> bool {
        let value = json!([n, s]);
        assert_equal(&value, &value).is_ok()
    }
}
