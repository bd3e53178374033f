use beacon_integrity_common_types::{Suite, MILLIS_PER_SECOND};
use beacon_integrity_store::SqlQuery;

use super::{Expectation, IntegrityCheck};

pub(super) fn checks() -> Vec<IntegrityCheck> {
    vec![IntegrityCheck {
        name: "arrival_not_before_block_timestamp",
        suite: Suite::HeadEvents,
        description: "A head event arrived before the timestamp of its block, which is not \
                      possible",
        tables: &["t_head_events", "t_block_metrics"],
        expectation: Expectation::NoRows,
        query: |_| {
            // Arrival timestamps are in milliseconds, block timestamps in seconds.
            SqlQuery::new(
                r#"
                select
                    t_head_events.f_slot,
                    t_head_events.f_arrival_timestamp,
                    t_block_metrics.f_timestamp
                from t_head_events
                join t_block_metrics on t_head_events.f_slot = t_block_metrics.f_slot
                where t_head_events.f_arrival_timestamp / $1 < t_block_metrics.f_timestamp
                "#,
            )
            .param(MILLIS_PER_SECOND)
        },
    }]
}
