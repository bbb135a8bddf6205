//! Phase orchestration
//!
//! Fill state and gating are computed views over records; nothing here is
//! stored. Gating is deliberately simple: a phase is locked while the
//! upstream sentinel slot is unfilled, regardless of the rest of the
//! upstream phase.
//!
//! Batched generation runs strictly sequentially with a fixed pause
//! between items; that pacing is the only backpressure protecting the
//! generation backend. A failed item is logged and skipped, never
//! aborting the batch; only an authentication failure stops the run.

use deckmind_backend::{DefinitionContext, GenerationError, RemoteRecordStore};
use deckmind_model::{ContainerId, PhaseSpec, Record, RecordKey, SchemaCatalog, SlotId};
use deckmind_session::{EditSession, GenerationCoordinator, WizardSession};
use std::collections::BTreeSet;
use std::time::Duration;

/// Default pause between batched generation items
const DEFAULT_PACING: Duration = Duration::from_millis(750);

/// Computed view of one phase's fill state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseStatus {
    pub name: String,
    /// Records with user content
    pub filled: usize,
    /// Slots in the phase
    pub total: usize,
    /// True while the upstream sentinel is unfilled
    pub locked: bool,
}

/// Outcome of one batched generation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Eligible records the batch visited
    pub attempted: usize,
    /// Records that gained at least one derived field
    pub generated: usize,
    /// Records whose item failed (generation or store)
    pub failed: usize,
}

/// Phase orchestration failure
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PhaseError {
    /// No phase with the given name
    #[error("unknown phase: {0}")]
    UnknownPhase(String),

    /// Fatal generation failure (authentication)
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// One container's phase layout and generation driver
pub struct PhaseOrchestrator {
    container: ContainerId,
    phases: Vec<PhaseSpec>,
    catalog: SchemaCatalog,
    coordinator: GenerationCoordinator,
    pacing: Duration,
}

impl PhaseOrchestrator {
    /// Create an orchestrator for one container
    #[must_use]
    pub fn new(
        container: ContainerId,
        phases: Vec<PhaseSpec>,
        catalog: SchemaCatalog,
        coordinator: GenerationCoordinator,
    ) -> Self {
        Self {
            container,
            phases,
            catalog,
            coordinator,
            pacing: DEFAULT_PACING,
        }
    }

    /// Override the batch pacing interval (builder style)
    #[must_use]
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    #[inline]
    #[must_use]
    pub fn container(&self) -> ContainerId {
        self.container
    }

    /// Phase definitions in order
    #[must_use]
    pub fn phases(&self) -> &[PhaseSpec] {
        &self.phases
    }

    /// Compute fill state and gating for every phase
    ///
    /// `records` is the container's current record set; slots without a
    /// record count as unfilled.
    #[must_use]
    pub fn status(&self, records: &[Record]) -> Vec<PhaseStatus> {
        let filled_slots: BTreeSet<SlotId> = records
            .iter()
            .filter(|r| r.container == self.container && r.is_filled())
            .map(|r| r.slot)
            .collect();

        self.phases
            .iter()
            .map(|phase| {
                let filled = phase
                    .slots
                    .iter()
                    .filter(|slot| filled_slots.contains(slot))
                    .count();
                let locked = phase
                    .gate
                    .map(|gate| !filled_slots.contains(&gate.upstream_sentinel))
                    .unwrap_or(false);
                PhaseStatus {
                    name: phase.name.clone(),
                    filled,
                    total: phase.slots.len(),
                    locked,
                }
            })
            .collect()
    }

    /// Open an edit session on a record of this container
    #[must_use]
    pub fn open_edit(&self, record: &Record) -> EditSession {
        EditSession::open(record, self.catalog.clone())
    }

    /// Open a wizard session on a record of this container
    #[must_use]
    pub fn open_wizard(&self, record: &Record) -> WizardSession {
        WizardSession::open(record, self.catalog.clone())
    }

    /// Run batched generation across one phase's records
    ///
    /// Visits the phase's slots in order, finalizing each filled record
    /// that still lacks a derived field. Per-item failures are logged and
    /// skipped; a fixed pause separates consecutive items.
    ///
    /// # Errors
    /// [`PhaseError::UnknownPhase`], or
    /// [`GenerationError::AuthRequired`] which terminates the batch.
    pub async fn batch_generate(
        &self,
        phase_name: &str,
        store: &dyn RemoteRecordStore,
        context: &DefinitionContext,
    ) -> Result<BatchReport, PhaseError> {
        let phase = self
            .phases
            .iter()
            .find(|p| p.name == phase_name)
            .ok_or_else(|| PhaseError::UnknownPhase(phase_name.to_string()))?;

        tracing::info!(phase = phase_name, slots = phase.slots.len(), "batch generation starting");
        let mut report = BatchReport::default();

        for slot in &phase.slots {
            let key = RecordKey::new(self.container, *slot);
            let record = match store.find(key).await {
                Ok(record) => record,
                Err(err) => {
                    tracing::debug!(%key, %err, "no record for slot, skipping");
                    continue;
                }
            };
            if !record.is_filled()
                || (record.generated_asset.is_some() && record.evaluation.is_some())
            {
                continue;
            }

            if report.attempted > 0 {
                tokio::time::sleep(self.pacing).await;
            }
            report.attempted += 1;

            let outcome = self
                .coordinator
                .finalize(
                    *slot,
                    &record.payload,
                    context,
                    record.generated_asset.as_ref(),
                    record.evaluation.as_ref(),
                )
                .await?;

            if outcome.produced_anything() {
                if let Err(err) = store
                    .write(
                        record.id,
                        record.payload.clone(),
                        outcome.image.clone(),
                        outcome.evaluation.clone(),
                    )
                    .await
                {
                    tracing::warn!(%key, %err, "derived-field write failed, continuing");
                    report.failed += 1;
                    continue;
                }
                report.generated += 1;
            }
            if outcome.has_errors {
                report.failed += 1;
            }
        }

        tracing::info!(
            phase = phase_name,
            attempted = report.attempted,
            generated = report.generated,
            failed = report.failed,
            "batch generation done"
        );
        Ok(report)
    }
}
