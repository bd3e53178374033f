use beacon_integrity_common_types::{Suite, BLOB_TX_TYPE};
use beacon_integrity_store::SqlQuery;

use super::{as_bigint, Expectation, IntegrityCheck};

pub(super) fn checks() -> Vec<IntegrityCheck> {
    vec![
        IntegrityCheck {
            name: "blobs_only_in_type_3_transactions",
            suite: Suite::Blobs,
            description: "Blob sidecars that reference a transaction which is not a blob \
                          (type 3) transaction",
            tables: &["t_transactions", "t_blob_sidecars"],
            expectation: Expectation::NoRows,
            query: |_| {
                SqlQuery::new(
                    r#"
                    select t_transactions.f_hash, t_transactions.f_tx_type
                    from t_transactions
                    inner join t_blob_sidecars
                        on t_transactions.f_hash = t_blob_sidecars.f_tx_hash
                    where t_transactions.f_tx_type != $1
                    "#,
                )
                .param(BLOB_TX_TYPE)
            },
        },
        IntegrityCheck {
            name: "max_blobs_per_block",
            suite: Suite::Blobs,
            description: "Slots carrying more blobs than the protocol allows",
            tables: &["t_transactions", "t_blob_sidecars"],
            expectation: Expectation::NoRows,
            query: |p| {
                SqlQuery::new(
                    r#"
                    select t_transactions.f_slot, count(*) as number_blobs
                    from t_transactions
                    inner join t_blob_sidecars
                        on t_transactions.f_hash = t_blob_sidecars.f_tx_hash
                    group by t_transactions.f_slot
                    having count(*) > $1
                    order by t_transactions.f_slot desc
                    "#,
                )
                .param(as_bigint(p.max_blobs_per_block))
            },
        },
    ]
}
