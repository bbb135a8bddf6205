//! Deckmind Session - editing and validation activities
//!
//! The core of the system:
//! - [`EditSession`]: one record's local edit buffer and the
//!   echo-suppression protocol against remote change notifications
//! - [`WizardSession`]: step-by-step field collection over an EditSession
//! - [`GenerationCoordinator`]: the two finalize-time generations with
//!   partial-failure tolerance
//! - [`ValidationSession`] / [`ValidationFlow`]: the streaming candidate
//!   judgment state machine and its async driver
//! - [`InsightReport`] / [`ReportStore`]: derived reports with a cached,
//!   freshness-windowed read path

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod coordinator;
pub mod edit;
pub mod flow;
pub mod report;
pub mod validation;
pub mod wizard;

// Re-exports for convenience
pub use coordinator::{FinalizeOutcome, GenerationCoordinator};
pub use edit::{EditSession, EntryMode, SubmitError, SyncOutcome};
pub use flow::{PumpOutcome, ValidationFlow};
pub use report::{InsightReport, ReportStore};
pub use validation::{
    JudgmentError, SessionSnapshot, ValidationMode, ValidationSession, ValidationState,
    JUDGING_THRESHOLD,
};
pub use wizard::{WizardError, WizardSession};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving Deckmind sessions
    pub use crate::{
        EditSession, FinalizeOutcome, GenerationCoordinator, SyncOutcome, ValidationFlow,
        ValidationMode, ValidationSession, ValidationState, WizardSession,
    };
}
