//! Generation backend interface
//!
//! Three operations on different timelines: single-shot image and
//! evaluation generation (may fail independently of each other), and an
//! open-ended candidate stream whose end is signalled by stream
//! termination.

use crate::error::GenerationError;
use async_trait::async_trait;
use deckmind_model::{AssetUrl, Candidate, ContainerId, Evaluation, Payload, RecordKey, SlotId};
use futures::stream::BoxStream;

/// Stream of incrementally produced candidates
///
/// Items may individually fail (a malformed one is skipped by the
/// consumer); stream end is the end-of-generation signal.
pub type CandidateStream = BoxStream<'static, Result<Candidate, GenerationError>>;

/// Context a record evaluation is scored against
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefinitionContext {
    /// Prose definition of what the slot is meant to capture
    pub slot_definition: String,
}

/// Context for a candidate-generation run
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateContext {
    pub container: ContainerId,
    /// Present in single-record mode; absent for a full-deck run
    pub focus: Option<RecordKey>,
}

impl CandidateContext {
    /// Full-deck generation context
    #[inline]
    #[must_use]
    pub const fn full(container: ContainerId) -> Self {
        Self {
            container,
            focus: None,
        }
    }

    /// Single-record generation context
    #[inline]
    #[must_use]
    pub const fn focused(container: ContainerId, key: RecordKey) -> Self {
        Self {
            container,
            focus: Some(key),
        }
    }
}

/// Derived-artifact and candidate generation
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate an image asset for a record
    ///
    /// # Errors
    /// Any [`GenerationError`]; callers treat non-fatal failures as a
    /// failure of this call only.
    async fn generate_image(
        &self,
        slot: SlotId,
        payload: &Payload,
    ) -> Result<AssetUrl, GenerationError>;

    /// Score a record payload against its slot definition
    ///
    /// # Errors
    /// Any [`GenerationError`]; independent of `generate_image`.
    async fn generate_evaluation(
        &self,
        payload: &Payload,
        context: &DefinitionContext,
    ) -> Result<Evaluation, GenerationError>;

    /// Open a candidate stream for the given context
    ///
    /// # Errors
    /// Fails only if the stream cannot be opened at all; per-item failures
    /// arrive inside the stream.
    async fn generate_candidates(
        &self,
        context: CandidateContext,
    ) -> Result<CandidateStream, GenerationError>;
}
