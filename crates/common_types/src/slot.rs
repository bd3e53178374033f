use quickcheck::Arbitrary;
use serde::{Deserialize, Serialize};

use crate::SLOTS_PER_EPOCH;

/// A beacon chain slot.
#[derive(
    Copy,
    Clone,
    Default,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::From,
    derive_more::Display,
)]
#[serde(transparent)]
pub struct Slot(pub u64);

/// A beacon chain epoch, i.e. a run of [`SLOTS_PER_EPOCH`] slots.
#[derive(
    Copy,
    Clone,
    Default,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::From,
    derive_more::Display,
)]
#[serde(transparent)]
pub struct Epoch(pub u64);

impl Slot {
    pub fn epoch(self) -> Epoch {
        Epoch(self.0 / SLOTS_PER_EPOCH)
    }

    pub fn is_epoch_start(self) -> bool {
        self.0 % SLOTS_PER_EPOCH == 0
    }
}

impl Epoch {
    pub fn start_slot(self) -> Slot {
        Slot(self.0 * SLOTS_PER_EPOCH)
    }

    /// All slots of this epoch, in ascending order.
    pub fn slots(self) -> impl Iterator<Item = Slot> {
        let start = self.start_slot().0;
        (start..start + SLOTS_PER_EPOCH).map(Slot)
    }
}

impl schemars::JsonSchema for Slot {
    fn schema_name() -> String {
        "Slot".to_owned()
    }

    fn json_schema(gen: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
        gen.subschema_for::<u64>()
    }
}

impl Arbitrary for Slot {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        // Keep values representable as `BIGINT`.
        Self(u64::arbitrary(g) >> 1)
    }
}

impl Arbitrary for Epoch {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        Self(u64::arbitrary(g) >> 1)
    }
}

#[cfg(test)]
mod tests {
    use quickcheck_macros::quickcheck;

    use super::*;

    #[quickcheck]
    fn slot_lies_within_its_epoch(slot: Slot) -> bool {
        let epoch = slot.epoch();
        epoch.start_slot() <= slot && slot.0 < epoch.start_slot().0 + SLOTS_PER_EPOCH
    }

    #[quickcheck]
    fn epoch_slots_map_back_to_epoch(epoch: u32) -> bool {
        let epoch = Epoch(epoch as u64);
        epoch.slots().all(|slot| slot.epoch() == epoch)
    }

    #[quickcheck]
    fn serde_roundtrip(slot: Slot) -> bool {
        let json = serde_json::to_string(&slot).unwrap();
        let slot2: Slot = serde_json::from_str(&json).unwrap();

        slot == slot2
    }

    #[test]
    fn epoch_boundaries() {
        assert!(Slot(0).is_epoch_start());
        assert!(Slot(64).is_epoch_start());
        assert!(!Slot(65).is_epoch_start());
        assert_eq!(Slot(4700012).epoch(), Epoch(146875));
        assert_eq!(Epoch(146875).slots().count(), 32);
    }
}
