mod common;

use beacon_integrity_store::{SqlParam, SqlQuery};
use serde_json::json;

use crate::common::BlockMetricsSnapshot;

#[tokio::test]
async fn query_without_rows_is_empty() {
    let snapshot = BlockMetricsSnapshot::with_slots(0..8).await.unwrap();
    let table = snapshot
        .store
        .query_table(&SqlQuery::new(
            "select f_slot from t_block_metrics where f_slot > 100;",
        ))
        .await
        .unwrap();
    assert!(table.is_empty());
}

#[tokio::test]
async fn columns_follow_select_list() {
    let snapshot = BlockMetricsSnapshot::with_slots([3]).await.unwrap();
    let table = snapshot
        .store
        .query_table(&SqlQuery::new(
            "select f_proposed, f_slot, null::bigint as f_epoch from t_block_metrics",
        ))
        .await
        .unwrap();

    assert_eq!(table.columns, vec!["f_proposed", "f_slot", "f_epoch"]);
    assert_eq!(table.rows, vec![vec![json!(false), json!(3), json!(null)]]);
}

#[tokio::test]
async fn binds_positional_parameters() {
    let snapshot = BlockMetricsSnapshot::with_slots(0..12).await.unwrap();
    let query = SqlQuery::new(
        "select f_slot from t_block_metrics
         where f_slot > $1 and $2::text = 'on' and f_proposed = $3
         order by f_slot",
    )
    .param(7i64)
    .param(SqlParam::Text("on".to_string()))
    .param(true);

    let table = snapshot.store.query_table(&query).await.unwrap();
    assert_eq!(table.column("f_slot").unwrap(), vec![&json!(8), &json!(9), &json!(10)]);
}

#[tokio::test]
async fn trailing_comment_is_allowed() {
    let snapshot = BlockMetricsSnapshot::with_slots(0..4).await.unwrap();
    let table = snapshot
        .store
        .query_table(&SqlQuery::new(
            "select count(*) as missed from t_block_metrics where not f_proposed -- missed slots",
        ))
        .await
        .unwrap();
    assert_eq!(table.scalar(), Some(&json!(1)));
}

#[tokio::test]
async fn numeric_values_keep_their_precision() {
    let snapshot = BlockMetricsSnapshot::with_slots([]).await.unwrap();
    let table = snapshot
        .store
        .query_table(&SqlQuery::new(
            "select
                18446744073709551617::numeric as above_u64,
                18446744073709551616::numeric as u64_max_plus_one,
                1.50::numeric as balance",
        ))
        .await
        .unwrap();

    let row = &table.rows[0];
    assert!(row.iter().all(|value| value.is_number()));
    assert_eq!(row[0].to_string(), "18446744073709551617");
    assert_eq!(row[1].to_string(), "18446744073709551616");
    assert_ne!(row[0], row[1]);
    assert_eq!(row[2].to_string(), "1.50");
}

#[tokio::test]
async fn queries_run_read_only() {
    let snapshot = BlockMetricsSnapshot::with_slots(0..4).await.unwrap();

    let write = snapshot
        .store
        .query_table(&SqlQuery::new(
            "select f_slot, nextval('s_el_block_number') as next from t_block_metrics",
        ))
        .await;
    assert!(write.is_err());

    // The sequence handed out one number per proposed slot, and no more.
    let table = snapshot
        .store
        .query_table(&SqlQuery::new("select last_value from s_el_block_number"))
        .await
        .unwrap();
    assert_eq!(table.scalar(), Some(&json!(17000002)));
}

#[tokio::test]
async fn detects_missing_tables() {
    let snapshot = BlockMetricsSnapshot::with_slots(0..4).await.unwrap();
    assert!(snapshot.store.table_exists("t_block_metrics").await.unwrap());
    assert!(!snapshot.store.table_exists("t_orphans").await.unwrap());
}

#[tokio::test]
async fn invalid_sql_is_an_error() {
    let snapshot = BlockMetricsSnapshot::with_slots([]).await.unwrap();
    let result = snapshot
        .store
        .query_table(&SqlQuery::new("select * from t_orphans"))
        .await;
    assert!(result.is_err());
}
