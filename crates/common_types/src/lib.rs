//! Domain types shared by the store, the check catalog and the CLI.

mod slot;
mod validator_status;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
pub use slot::{Epoch, Slot};
pub use validator_status::ValidatorStatus;

/// Number of slots in a beacon chain epoch. Also the number of proposer
/// duties the indexer must persist for every epoch.
pub const SLOTS_PER_EPOCH: u64 = 32;

/// Upper bound on blob sidecars per block (Deneb).
pub const MAX_BLOBS_PER_BLOCK: u64 = 6;

/// EIP-4844 blob-carrying transaction type.
pub const BLOB_TX_TYPE: i16 = 3;

/// Head event arrival timestamps are stored in milliseconds, block
/// timestamps in seconds.
pub const MILLIS_PER_SECOND: i64 = 1000;

/// The area of the indexed database a check belongs to. Each suite maps to one
/// family of indexer tables.
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
    JsonSchema,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Suite {
    Blocks,
    Transactions,
    Blobs,
    EpochMetrics,
    HeadEvents,
    Validators,
}
