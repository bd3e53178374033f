use beacon_integrity_common_types::Suite;
use beacon_integrity_store::SqlQuery;

use super::{Expectation, IntegrityCheck};

pub(super) fn checks() -> Vec<IntegrityCheck> {
    vec![
        IntegrityCheck {
            name: "num_validators_equals_sum_of_states",
            suite: Suite::EpochMetrics,
            description: "Slashed, active, exited and in-activation validators add up to the \
                          total number of validators",
            tables: &["t_epoch_metrics_summary"],
            expectation: Expectation::NoRows,
            query: |_| {
                SqlQuery::new(
                    r#"
                    select
                        f_epoch,
                        f_num_vals,
                        f_num_slashed_vals,
                        f_num_active_vals,
                        f_num_exited_vals,
                        f_num_in_activation_vals
                    from t_epoch_metrics_summary
                    where (
                        f_num_slashed_vals
                        + f_num_active_vals
                        + f_num_exited_vals
                        + f_num_in_activation_vals
                    ) != f_num_vals;
                    "#,
                )
            },
        },
        IntegrityCheck {
            name: "attesting_balance_within_total",
            suite: Suite::EpochMetrics,
            description: "The effective balance of attesting validators exceeds the total \
                          effective balance",
            tables: &["t_epoch_metrics_summary"],
            expectation: Expectation::NoRows,
            query: |_| {
                SqlQuery::new(
                    r#"
                    select f_epoch, f_att_effective_balance_eth, f_total_effective_balance_eth
                    from t_epoch_metrics_summary
                    where f_att_effective_balance_eth > f_total_effective_balance_eth
                    "#,
                )
            },
        },
        IntegrityCheck {
            name: "epoch_continuity",
            suite: Suite::EpochMetrics,
            description: "Every epoch between the first and the last summarized one has a summary",
            tables: &["t_epoch_metrics_summary"],
            expectation: Expectation::ColumnsEqual {
                left: "summarized_epochs",
                right: "epoch_span",
            },
            query: |_| {
                SqlQuery::new(
                    r#"
                    select
                        count(distinct f_epoch) as summarized_epochs,
                        coalesce(max(f_epoch) - min(f_epoch) + 1, 0) as epoch_span
                    from t_epoch_metrics_summary
                    "#,
                )
            },
        },
    ]
}
