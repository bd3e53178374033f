use beacon_integrity_common_types::Suite;
use beacon_integrity_store::SqlQuery;

use super::{as_bigint, Expectation, IntegrityCheck};

pub(super) fn checks() -> Vec<IntegrityCheck> {
    vec![
        IntegrityCheck {
            name: "orphan_blocks_in_block_metrics",
            suite: Suite::Blocks,
            description: "Two proposed blocks after the merge share an execution block number \
                          (one of them is an orphan that ended up in block metrics)",
            tables: &["t_block_metrics"],
            expectation: Expectation::NoRows,
            query: |p| {
                SqlQuery::new(
                    r#"
                    select f_el_block_number, count(*) as blocks
                    from t_block_metrics
                    where f_proposed = true and f_slot > $1
                    group by f_el_block_number
                    having count(*) > 1
                    "#,
                )
                .param(p.merge_slot)
            },
        },
        IntegrityCheck {
            name: "missed_blocks_tagged_as_orphan",
            suite: Suite::Blocks,
            description: "A missed block was added to the orphans table",
            tables: &["t_orphans"],
            expectation: Expectation::NoRows,
            query: |_| {
                SqlQuery::new(
                    r#"
                    select *
                    from t_orphans
                    where f_proposed = false
                    "#,
                )
            },
        },
        IntegrityCheck {
            name: "block_gaps",
            suite: Suite::Blocks,
            description: "Ranges of execution block numbers missing between indexed blocks",
            tables: &["t_block_metrics"],
            expectation: Expectation::NoRows,
            query: |p| {
                SqlQuery::new(
                    r#"
                    with gaps as (
                        select
                            f_el_block_number as preceding_block,
                            lead(f_el_block_number) over (order by f_el_block_number) - 1
                                as end_of_missing_range
                        from t_block_metrics
                        where f_el_block_number > $1
                    )
                    select
                        preceding_block + 1 as start_of_missing_range,
                        end_of_missing_range
                    from gaps
                    where end_of_missing_range > preceding_block
                    order by preceding_block
                    "#,
                )
                .param(as_bigint(p.gap_check_start_block))
            },
        },
        IntegrityCheck {
            name: "slot_continuity",
            suite: Suite::Blocks,
            description: "Every slot between the first and the last indexed one has a row in \
                          block metrics, proposed or missed",
            tables: &["t_block_metrics"],
            expectation: Expectation::ColumnsEqual {
                left: "indexed_slots",
                right: "slot_span",
            },
            query: |_| {
                SqlQuery::new(
                    r#"
                    select
                        count(distinct f_slot) as indexed_slots,
                        coalesce(max(f_slot) - min(f_slot) + 1, 0) as slot_span
                    from t_block_metrics
                    "#,
                )
            },
        },
    ]
}
