use serde::{Deserialize, Serialize};

/// Validator status codes as written by the indexer to the `f_status` column
/// of `t_validator_rewards_summary`.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ValidatorStatus {
    /// Deposited, waiting in the activation queue.
    InActivation,
    Active,
    Exited,
    Slashed,
}

impl ValidatorStatus {
    pub fn code(self) -> i16 {
        match self {
            ValidatorStatus::InActivation => 0,
            ValidatorStatus::Active => 1,
            ValidatorStatus::Exited => 2,
            ValidatorStatus::Slashed => 3,
        }
    }

    /// Statuses for which the reward of an epoch is bounded by the maximum
    /// attainable reward.
    pub fn has_bounded_reward(self) -> bool {
        matches!(self, ValidatorStatus::Active | ValidatorStatus::Slashed)
    }
}

impl TryFrom<i16> for ValidatorStatus {
    type Error = anyhow::Error;

    fn try_from(code: i16) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(ValidatorStatus::InActivation),
            1 => Ok(ValidatorStatus::Active),
            2 => Ok(ValidatorStatus::Exited),
            3 => Ok(ValidatorStatus::Slashed),
            _ => Err(anyhow::anyhow!("unknown validator status code {}", code)),
        }
    }
}
