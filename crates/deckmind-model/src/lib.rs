//! Deckmind Model - core data types
//!
//! Defines the data model shared by every Deckmind crate:
//! - Records (cards) and their payloads
//! - Per-slot payload schemas and validation
//! - Candidates (insights) and rarity tiers
//! - Phase definitions and gating
//!
//! Sessions and orchestration live in `deckmind-session` and
//! `deckmind-phase`; this crate is pure data plus validation.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod candidate;
pub mod ids;
pub mod payload;
pub mod phase;
pub mod record;
pub mod schema;

// Re-exports for convenience
pub use candidate::{Candidate, Judgment, RarityTier};
pub use ids::{CandidateId, ContainerId, RecordId, SlotId};
pub use payload::{FieldValue, Payload, PayloadFingerprint};
pub use phase::{PhaseGate, PhaseSpec};
pub use record::{AssetUrl, Evaluation, Record, RecordKey};
pub use schema::{FieldKind, FieldSpec, SchemaCatalog, SchemaViolation, SlotSchema};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the Deckmind model
    pub use crate::{
        Candidate, ContainerId, Evaluation, FieldValue, Judgment, Payload, PhaseSpec, RarityTier,
        Record, RecordId, RecordKey, SlotId, SlotSchema,
    };
}
