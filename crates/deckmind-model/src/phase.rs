//! Phase definitions
//!
//! A phase is an ordered, named group of record slots. Definitions are
//! static; fill state and gating are computed views over records, built in
//! `deckmind-phase`.

use crate::ids::SlotId;
use serde::{Deserialize, Serialize};

/// Gate locking a phase until an upstream sentinel slot is filled
///
/// Only the sentinel matters; the rest of the upstream phase may be empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseGate {
    /// Slot (in an earlier phase) whose fill state unlocks this phase
    pub upstream_sentinel: SlotId,
}

/// Static definition of one phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseSpec {
    pub name: String,
    /// Slots owned by this phase, in presentation order
    pub slots: Vec<SlotId>,
    /// Absent for ungated (first) phases
    pub gate: Option<PhaseGate>,
}

impl PhaseSpec {
    /// Ungated phase
    #[must_use]
    pub fn new(name: impl Into<String>, slots: Vec<SlotId>) -> Self {
        Self {
            name: name.into(),
            slots,
            gate: None,
        }
    }

    /// Gate this phase on an upstream sentinel slot (builder style)
    #[must_use]
    pub fn gated_on(mut self, upstream_sentinel: SlotId) -> Self {
        self.gate = Some(PhaseGate { upstream_sentinel });
        self
    }
}
