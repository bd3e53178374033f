//! Provides the diesel queries, callers should handle connection pooling and
//! transactions.

use anyhow::Context;
use diesel::pg::Pg;
use diesel::sql_types;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde_json::{Map, Value};

use crate::models::{Exists, JsonRow, ServerVersion};
use crate::{QueryTable, SqlQuery};

pub(super) async fn query_table(
    conn: &mut AsyncPgConnection,
    query: &SqlQuery,
) -> anyhow::Result<QueryTable> {
    let mut boxed = diesel::sql_query(query.as_json_rows()).into_boxed::<Pg>();
    for param in &query.params {
        boxed = param.bind(boxed);
    }

    let rows = boxed.load::<JsonRow>(conn).await?;
    let objects = rows
        .into_iter()
        .map(|row| {
            serde_json::from_str::<Map<String, Value>>(&row.row_json)
                .with_context(|| format!("result row is not a JSON object: {}", row.row_json))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(QueryTable::from_json_rows(objects))
}

pub(super) async fn table_exists(conn: &mut AsyncPgConnection, name: &str) -> anyhow::Result<bool> {
    let row = diesel::sql_query(
        "select exists (
            select 1 from information_schema.tables
            where table_schema = current_schema() and table_name = $1
        ) as found",
    )
    .bind::<sql_types::Text, _>(name)
    .get_result::<Exists>(conn)
    .await?;

    Ok(row.found)
}

pub(super) async fn server_version(conn: &mut AsyncPgConnection) -> anyhow::Result<String> {
    let row = diesel::sql_query("show server_version")
        .get_result::<ServerVersion>(conn)
        .await?;

    Ok(row.server_version)
}
