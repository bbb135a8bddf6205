//! Records and derived artifacts
//!
//! A record is one card in the deck: user-authored payload plus two
//! derived fields (`generated_asset`, `evaluation`) that only the
//! generation pipeline ever writes.

use crate::ids::{ContainerId, RecordId, SlotId};
use crate::payload::Payload;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// URL of a generated image asset
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetUrl(pub String);

impl AssetUrl {
    #[inline]
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }
}

impl std::fmt::Display for AssetUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Structured score breakdown produced by `generate_evaluation`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Overall score in [0, 1]
    pub overall: f32,
    /// Per-dimension scores
    pub dimensions: BTreeMap<String, f32>,
    /// Optional prose summary
    pub summary: Option<String>,
}

impl Evaluation {
    /// Evaluation with only an overall score
    #[must_use]
    pub fn overall(score: f32) -> Self {
        Self {
            overall: score,
            dimensions: BTreeMap::new(),
            summary: None,
        }
    }
}

/// Stable identity of an editing target
///
/// Combines container and slot so a refetch of the same record is
/// distinguishable from a switch to a different record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    pub container: ContainerId,
    pub slot: SlotId,
}

impl RecordKey {
    #[inline]
    #[must_use]
    pub const fn new(container: ContainerId, slot: SlotId) -> Self {
        Self { container, slot }
    }
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.container, self.slot)
    }
}

/// One unit of user-authored content tied to a phase slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub container: ContainerId,
    pub slot: SlotId,
    pub payload: Payload,
    /// Set only by the generation pipeline
    pub generated_asset: Option<AssetUrl>,
    /// Set only by the generation pipeline
    pub evaluation: Option<Evaluation>,
}

impl Record {
    /// New empty record in the given slot
    #[must_use]
    pub fn new(container: ContainerId, slot: SlotId) -> Self {
        Self {
            id: RecordId::new(),
            container,
            slot,
            payload: Payload::new(),
            generated_asset: None,
            evaluation: None,
        }
    }

    /// Stable editing-target identity
    #[inline]
    #[must_use]
    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.container, self.slot)
    }

    /// Whether the record counts as filled for phase accounting
    #[must_use]
    pub fn is_filled(&self) -> bool {
        !self.payload.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_is_unfilled() {
        let r = Record::new(ContainerId::new(), SlotId(0));
        assert!(!r.is_filled());
        assert!(r.generated_asset.is_none());
        assert!(r.evaluation.is_none());
    }

    #[test]
    fn key_identifies_container_and_slot() {
        let container = ContainerId::new();
        let a = Record::new(container, SlotId(1));
        let b = Record::new(container, SlotId(2));
        assert_ne!(a.key(), b.key());
        assert_eq!(a.key(), RecordKey::new(container, SlotId(1)));
    }
}
