//! Deckmind Phase - fill accounting, gating, batched generation
//!
//! A [`PhaseOrchestrator`] owns one container's phase layout: it computes
//! per-phase fill state and gating, opens edit/wizard sessions on demand,
//! and runs batched sequential generation across a phase's records with
//! fixed-interval pacing.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod orchestrator;

pub use orchestrator::{BatchReport, PhaseError, PhaseOrchestrator, PhaseStatus};
