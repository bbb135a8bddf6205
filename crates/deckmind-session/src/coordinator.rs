//! Finalize-time generation coordination
//!
//! Runs the image and evaluation generations for one finalize action.
//! Both calls are issued without waiting on each other; a call is skipped
//! entirely when the record already carries that derived field. Each
//! failure is caught at the call boundary and folded into `has_errors`;
//! only an authentication failure aborts the whole finalize.

use deckmind_backend::{DefinitionContext, GenerationBackend, GenerationError};
use deckmind_model::{AssetUrl, Evaluation, Payload, SlotId};
use std::sync::Arc;

/// Merged result of one finalize's generations
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizeOutcome {
    /// Newly generated asset, absent if skipped or failed
    pub image: Option<AssetUrl>,
    /// Newly generated evaluation, absent if skipped or failed
    pub evaluation: Option<Evaluation>,
    /// True if any issued call failed
    pub has_errors: bool,
}

impl FinalizeOutcome {
    /// Whether anything new arrived
    #[must_use]
    pub fn produced_anything(&self) -> bool {
        self.image.is_some() || self.evaluation.is_some()
    }
}

/// Drives the two derived-artifact generations for finalize actions
#[derive(Clone)]
pub struct GenerationCoordinator {
    backend: Arc<dyn GenerationBackend>,
}

impl GenerationCoordinator {
    /// Create a coordinator over one backend
    #[inline]
    #[must_use]
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }

    /// Run the finalize generations for one record
    ///
    /// `existing_asset` / `existing_evaluation` suppress the respective
    /// call; a record is never re-generated implicitly.
    ///
    /// # Errors
    /// Only [`GenerationError::AuthRequired`]; every other failure is
    /// recorded in the outcome's `has_errors`.
    pub async fn finalize(
        &self,
        slot: SlotId,
        payload: &Payload,
        context: &DefinitionContext,
        existing_asset: Option<&AssetUrl>,
        existing_evaluation: Option<&Evaluation>,
    ) -> Result<FinalizeOutcome, GenerationError> {
        let want_image = existing_asset.is_none();
        let want_evaluation = existing_evaluation.is_none();
        tracing::info!(%slot, want_image, want_evaluation, "finalize generations starting");

        let image_call = async {
            if !want_image {
                return Ok((None, false));
            }
            match self.backend.generate_image(slot, payload).await {
                Ok(url) => Ok((Some(url), false)),
                Err(err) if err.is_fatal() => Err(err),
                Err(err) => {
                    tracing::warn!(%slot, %err, "image generation failed");
                    Ok((None, true))
                }
            }
        };

        let evaluation_call = async {
            if !want_evaluation {
                return Ok((None, false));
            }
            match self.backend.generate_evaluation(payload, context).await {
                Ok(evaluation) => Ok((Some(evaluation), false)),
                Err(err) if err.is_fatal() => Err(err),
                Err(err) => {
                    tracing::warn!(%slot, %err, "evaluation generation failed");
                    Ok((None, true))
                }
            }
        };

        let (image_result, evaluation_result) = tokio::join!(image_call, evaluation_call);
        let (image, image_failed) = image_result?;
        let (evaluation, evaluation_failed) = evaluation_result?;

        let outcome = FinalizeOutcome {
            image,
            evaluation,
            has_errors: image_failed || evaluation_failed,
        };
        tracing::info!(
            %slot,
            produced_image = outcome.image.is_some(),
            produced_evaluation = outcome.evaluation.is_some(),
            has_errors = outcome.has_errors,
            "finalize generations done"
        );
        Ok(outcome)
    }
}
