use beacon_integrity_common_types::Suite;
use beacon_integrity_store::SqlQuery;

use super::{Expectation, IntegrityCheck};

pub(super) fn checks() -> Vec<IntegrityCheck> {
    vec![
        IntegrityCheck {
            name: "transactions_per_block",
            suite: Suite::Transactions,
            description: "The number of tracked transactions matches the transaction count of \
                          the block that includes them",
            tables: &["t_block_metrics", "t_transactions"],
            expectation: Expectation::NoRows,
            query: |_| {
                SqlQuery::new(
                    r#"
                    select
                        t_block_metrics.f_slot,
                        t_block_metrics.f_el_transactions,
                        count(distinct t_transactions.f_hash) as tracked_transactions
                    from t_block_metrics
                    inner join t_transactions
                        on t_block_metrics.f_slot = t_transactions.f_slot
                    group by t_block_metrics.f_slot, t_block_metrics.f_el_transactions
                    having t_block_metrics.f_el_transactions != count(distinct t_transactions.f_hash)
                    "#,
                )
            },
        },
        IntegrityCheck {
            name: "missing_transactions_from_existing_blocks",
            suite: Suite::Transactions,
            description: "Proposed blocks with transactions that have none in the transactions \
                          table",
            tables: &["t_block_metrics", "t_transactions"],
            expectation: Expectation::NoRows,
            query: |_| {
                SqlQuery::new(
                    r#"
                    select f_slot, f_el_block_number, f_el_transactions
                    from t_block_metrics
                    where not exists (
                        select 1
                        from t_transactions
                        where t_transactions.f_slot = t_block_metrics.f_slot
                    )
                    and f_el_transactions > 0
                    and f_proposed = true
                    order by f_slot desc
                    "#,
                )
            },
        },
        IntegrityCheck {
            name: "number_of_blocks_across_tables",
            suite: Suite::Transactions,
            description: "Transactions attributed to blocks that were missed or that carry no \
                          transactions",
            tables: &["t_block_metrics", "t_transactions"],
            expectation: Expectation::NoRows,
            query: |_| {
                SqlQuery::new(
                    r#"
                    select
                        t_transactions.f_hash,
                        t_transactions.f_slot,
                        t_block_metrics.f_el_transactions,
                        t_block_metrics.f_proposed
                    from t_transactions
                    inner join t_block_metrics
                        on t_transactions.f_slot = t_block_metrics.f_slot
                    where t_block_metrics.f_el_transactions = 0
                        or t_block_metrics.f_proposed = false
                    "#,
                )
            },
        },
    ]
}
