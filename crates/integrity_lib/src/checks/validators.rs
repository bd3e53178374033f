use beacon_integrity_common_types::{Suite, ValidatorStatus};
use beacon_integrity_store::SqlQuery;

use super::{as_bigint, Expectation, IntegrityCheck};

pub(super) fn checks() -> Vec<IntegrityCheck> {
    vec![
        IntegrityCheck {
            name: "reward_not_greater_than_max",
            suite: Suite::Validators,
            description: "Active or slashed validators earned (or lost) more than the maximum \
                          reward of the epoch",
            tables: &["t_validator_rewards_summary"],
            expectation: Expectation::NoRows,
            query: |_| {
                SqlQuery::new(
                    r#"
                    select f_val_idx, f_epoch, f_status, f_reward, f_max_reward
                    from t_validator_rewards_summary
                    where (f_status = $1 or f_status = $2)
                        and abs(f_reward) > abs(f_max_reward)
                    "#,
                )
                .param(ValidatorStatus::Active)
                .param(ValidatorStatus::Slashed)
            },
        },
        IntegrityCheck {
            name: "missing_proposer_duties",
            suite: Suite::Validators,
            description: "Epochs with fewer proposer duties than slots, i.e. duties that were \
                          never persisted",
            tables: &["t_proposer_duties"],
            expectation: Expectation::NoRows,
            query: |p| proposer_duties_per_epoch("<", p.slots_per_epoch),
        },
        IntegrityCheck {
            name: "excess_proposer_duties",
            suite: Suite::Validators,
            description: "Epochs with more proposer duties than slots",
            tables: &["t_proposer_duties"],
            expectation: Expectation::NoRows,
            query: |p| proposer_duties_per_epoch(">", p.slots_per_epoch),
        },
        IntegrityCheck {
            name: "block_rewards_api_matches_experimental",
            suite: Suite::Validators,
            description: "The block reward reported by the beacon API differs from the one \
                          computed by the indexer",
            tables: &["t_validator_rewards_summary"],
            expectation: Expectation::NoRows,
            query: |_| {
                SqlQuery::new(
                    r#"
                    select f_val_idx, f_epoch, f_block_api_reward, f_block_experimental_reward
                    from t_validator_rewards_summary
                    where f_block_api_reward != f_block_experimental_reward
                    "#,
                )
            },
        },
    ]
}

fn proposer_duties_per_epoch(comparison: &str, slots_per_epoch: u64) -> SqlQuery {
    SqlQuery::new(format!(
        r#"
        select f_proposer_slot / $1 as epoch, count(*) as duties
        from t_proposer_duties
        group by 1
        having count(*) {} $1
        order by 1
        "#,
        comparison
    ))
    .param(as_bigint(slots_per_epoch))
}
