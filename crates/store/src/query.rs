use std::borrow::Cow;
use std::fmt;

use beacon_integrity_common_types::{Epoch, Slot, ValidatorStatus};
use diesel::pg::Pg;
use diesel::query_builder::{BoxedSqlQuery, SqlQuery as DieselSqlQuery};
use diesel::sql_types;
use serde::Serialize;

/// A value bound to a `$n` placeholder of a [`SqlQuery`].
#[derive(Debug, Clone, PartialEq, Serialize, derive_more::From)]
#[serde(untagged)]
pub enum SqlParam {
    BigInt(i64),
    SmallInt(i16),
    Text(String),
    Bool(bool),
}

impl SqlParam {
    pub(crate) fn bind<'f>(
        &self,
        query: BoxedSqlQuery<'f, Pg, DieselSqlQuery>,
    ) -> BoxedSqlQuery<'f, Pg, DieselSqlQuery> {
        match self {
            SqlParam::BigInt(v) => query.bind::<sql_types::BigInt, _>(*v),
            SqlParam::SmallInt(v) => query.bind::<sql_types::SmallInt, _>(*v),
            SqlParam::Text(v) => query.bind::<sql_types::Text, _>(v.clone()),
            SqlParam::Bool(v) => query.bind::<sql_types::Bool, _>(*v),
        }
    }
}

impl fmt::Display for SqlParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlParam::BigInt(v) => write!(f, "{}", v),
            SqlParam::SmallInt(v) => write!(f, "{}", v),
            SqlParam::Text(v) => write!(f, "'{}'", v.replace('\'', "''")),
            SqlParam::Bool(v) => write!(f, "{}", v),
        }
    }
}

impl From<Slot> for SqlParam {
    fn from(slot: Slot) -> Self {
        SqlParam::BigInt(i64::try_from(slot.0).unwrap_or(i64::MAX))
    }
}

impl From<Epoch> for SqlParam {
    fn from(epoch: Epoch) -> Self {
        SqlParam::BigInt(i64::try_from(epoch.0).unwrap_or(i64::MAX))
    }
}

impl From<ValidatorStatus> for SqlParam {
    fn from(status: ValidatorStatus) -> Self {
        SqlParam::SmallInt(status.code())
    }
}

/// A SQL body together with the values of its positional placeholders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlQuery {
    pub sql: Cow<'static, str>,
    pub params: Vec<SqlParam>,
}

impl SqlQuery {
    pub fn new(sql: impl Into<Cow<'static, str>>) -> Self {
        Self {
            sql: sql.into(),
            params: vec![],
        }
    }

    pub fn param(mut self, param: impl Into<SqlParam>) -> Self {
        self.params.push(param.into());
        self
    }

    /// The SQL body without trailing semicolons and whitespace, so that it can
    /// be embedded as a subquery.
    pub fn body(&self) -> &str {
        self.sql.trim_end_matches(|c: char| c == ';' || c.is_whitespace())
    }

    /// Highest `$n` placeholder referenced by the body, `0` if there is none.
    /// Placeholders inside single-quoted literals don't count.
    pub fn max_placeholder(&self) -> usize {
        let bytes = self.sql.as_bytes();
        let mut max = 0;
        let mut in_literal = false;
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                // An escaped quote (`''`) toggles twice.
                b'\'' => {
                    in_literal = !in_literal;
                    i += 1;
                }
                b'$' if !in_literal => {
                    let start = i + 1;
                    let mut end = start;
                    while end < bytes.len() && bytes[end].is_ascii_digit() {
                        end += 1;
                    }
                    if let Ok(n) = self.sql[start..end].parse::<usize>() {
                        max = max.max(n);
                    }
                    i = end.max(start);
                }
                _ => i += 1,
            }
        }
        max
    }

    /// Wraps the body so that every result row comes back as a single JSON
    /// object, keeping the column order of the select list. The closing
    /// parenthesis goes on its own line, after any trailing `--` comment.
    pub(crate) fn as_json_rows(&self) -> String {
        format!(
            "select row_to_json(integrity_q)::text as row_json from ({}\n) as integrity_q",
            self.body()
        )
    }
}

impl fmt::Display for SqlQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.body().trim())?;
        if !self.params.is_empty() {
            let params: Vec<String> = self.params.iter().map(|p| p.to_string()).collect();
            write!(f, " -- params: [{}]", params.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use quickcheck_macros::quickcheck;

    use super::*;

    #[test]
    fn body_strips_trailing_semicolons() {
        let query = SqlQuery::new("select 1;\n   ;  \n");
        assert_eq!(query.body(), "select 1");
    }

    #[test]
    fn wraps_as_subquery() {
        let query = SqlQuery::new("select f_slot from t_block_metrics;");
        assert_eq!(
            query.as_json_rows(),
            "select row_to_json(integrity_q)::text as row_json from (select f_slot from t_block_metrics\n) as integrity_q"
        );
    }

    #[test]
    fn trailing_comment_stays_inside_subquery() {
        let query = SqlQuery::new("select f_slot from t_block_metrics -- proposed or missed");
        let wrapped = query.as_json_rows();
        let closing = wrapped.lines().last().unwrap();
        assert_eq!(closing, ") as integrity_q");
    }

    #[test]
    fn placeholders() {
        assert_eq!(SqlQuery::new("select 1").max_placeholder(), 0);
        assert_eq!(
            SqlQuery::new("select * from t where a > $1 and b in ($3, $2)").max_placeholder(),
            3
        );
        assert_eq!(SqlQuery::new("select '$'").max_placeholder(), 0);
        assert_eq!(
            SqlQuery::new("select '$2', 'it''s $3' where a = $1").max_placeholder(),
            1
        );
    }

    #[test]
    fn display_lists_params() {
        let query = SqlQuery::new("select $1, $2")
            .param(32i64)
            .param("abc".to_string());
        assert_eq!(query.to_string(), "select $1, $2 -- params: [32, 'abc']");
    }

    #[test]
    fn display_escapes_quotes() {
        let query = SqlQuery::new("select $1").param("it's".to_string());
        assert_eq!(query.to_string(), "select $1 -- params: ['it''s']");
    }

    #[quickcheck]
    fn body_never_ends_with_semicolon(sql: String) -> bool {
        !SqlQuery::new(sql).body().ends_with(';')
    }
}
