//! Wizard session: step-by-step field collection
//!
//! Wraps one [`EditSession`] to present schema fields one at a time. Step
//! index, completed set, and review mode are session-local UI progress,
//! not authoritative data: they survive echoes and no-op syncs and reset
//! only on a true record switch.
//!
//! The wizard forwards every field change as a local edit and submits
//! exactly once, on finalize, so echo suppression is armed once per
//! finalize rather than per keystroke.

use crate::coordinator::{FinalizeOutcome, GenerationCoordinator};
use crate::edit::{EditSession, SubmitError, SyncOutcome};
use deckmind_backend::{DefinitionContext, GenerationError, RecordUpdate, RemoteRecordStore};
use deckmind_model::{FieldValue, Record, SchemaCatalog, SchemaViolation};
use std::collections::BTreeSet;

/// Wizard operation failure
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WizardError {
    /// No step at the requested position
    #[error("no such step")]
    NoSuchStep,

    /// Field edit rejected by the slot schema
    #[error(transparent)]
    Schema(#[from] SchemaViolation),

    /// Submit failed (schema or store)
    #[error(transparent)]
    Submit(#[from] SubmitError),

    /// Finalize generations aborted (authentication)
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Step-by-step field collection over one edit session
#[derive(Debug, Clone)]
pub struct WizardSession {
    edit: EditSession,
    steps: Vec<String>,
    current_step: usize,
    completed: BTreeSet<usize>,
    review_mode: bool,
}

impl WizardSession {
    /// Open a wizard over one record
    #[must_use]
    pub fn open(record: &Record, catalog: SchemaCatalog) -> Self {
        let edit = EditSession::open(record, catalog);
        let steps = Self::steps_for(&edit);
        Self {
            edit,
            steps,
            current_step: 0,
            completed: BTreeSet::new(),
            review_mode: false,
        }
    }

    fn steps_for(edit: &EditSession) -> Vec<String> {
        edit.schema().field_names().map(str::to_string).collect()
    }

    /// The wrapped edit session
    #[inline]
    #[must_use]
    pub fn edit(&self) -> &EditSession {
        &self.edit
    }

    /// Zero-based index of the step being collected
    #[inline]
    #[must_use]
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    /// Field name of the current step
    #[must_use]
    pub fn current_field(&self) -> Option<&str> {
        self.steps.get(self.current_step).map(String::as_str)
    }

    /// Whether the user is reviewing before finalize
    #[inline]
    #[must_use]
    pub fn review_mode(&self) -> bool {
        self.review_mode
    }

    /// Whether every step has a completed value
    #[must_use]
    pub fn all_steps_completed(&self) -> bool {
        self.completed.len() == self.steps.len()
    }

    /// Record the current step's value and mark it completed
    ///
    /// # Errors
    /// [`WizardError::NoSuchStep`] past the last step, or a schema
    /// violation from the edit session.
    pub fn set_current_field(&mut self, value: impl Into<FieldValue>) -> Result<(), WizardError> {
        let field = self
            .steps
            .get(self.current_step)
            .cloned()
            .ok_or(WizardError::NoSuchStep)?;
        self.edit.edit_field(&field, value)?;
        self.completed.insert(self.current_step);
        Ok(())
    }

    /// Advance to the next step, entering review after the last one
    pub fn advance(&mut self) {
        if self.current_step + 1 < self.steps.len() {
            self.current_step += 1;
        } else if self.all_steps_completed() {
            self.review_mode = true;
        }
    }

    /// Step back, leaving review mode if active
    pub fn back(&mut self) {
        if self.review_mode {
            self.review_mode = false;
        } else {
            self.current_step = self.current_step.saturating_sub(1);
        }
    }

    /// Jump to an already-presented step (review editing)
    ///
    /// # Errors
    /// [`WizardError::NoSuchStep`] if out of range.
    pub fn jump_to(&mut self, step: usize) -> Result<(), WizardError> {
        if step >= self.steps.len() {
            return Err(WizardError::NoSuchStep);
        }
        self.current_step = step;
        self.review_mode = false;
        Ok(())
    }

    /// Forward a remote notification to the edit session
    ///
    /// Wizard progress resets only on a true record switch; echoes,
    /// no-ops, and even genuine payload replacements keep the user's
    /// place.
    pub fn absorb_remote(&mut self, update: RecordUpdate) -> SyncOutcome {
        let outcome = self.edit.apply_remote(update);
        if outcome == SyncOutcome::RecordSwitched {
            self.steps = Self::steps_for(&self.edit);
            self.current_step = 0;
            self.completed.clear();
            self.review_mode = false;
        }
        outcome
    }

    /// Submit the collected payload and run the finalize generations
    ///
    /// One submit per finalize; the coordinator outcome is merged back
    /// into the edit session as a normal derived-field merge and the
    /// derived fields are persisted remotely. A partial generation
    /// failure still returns the outcome (`has_errors` set); the caller
    /// reports it without treating finalize as failed.
    ///
    /// # Errors
    /// Submit failures, or [`GenerationError::AuthRequired`] from the
    /// coordinator.
    pub async fn finalize(
        &mut self,
        store: &dyn RemoteRecordStore,
        coordinator: &GenerationCoordinator,
        context: &DefinitionContext,
    ) -> Result<FinalizeOutcome, WizardError> {
        self.edit.submit(store).await?;

        let outcome = coordinator
            .finalize(
                self.edit.key().slot,
                self.edit.payload(),
                context,
                self.edit.generated_asset(),
                self.edit.evaluation(),
            )
            .await?;

        self.edit
            .merge_derived(outcome.image.clone(), outcome.evaluation.clone());

        if outcome.produced_anything() {
            // Persist the derived fields; the resulting notification is a
            // payload no-op for the session, so nothing visible resets.
            if let Err(err) = store
                .write(
                    self.edit.record_id(),
                    self.edit.payload().clone(),
                    outcome.image.clone(),
                    outcome.evaluation.clone(),
                )
                .await
            {
                tracing::warn!(key = %self.edit.key(), %err, "derived-field write failed");
            }
        }

        Ok(outcome)
    }
}
