//! Validation flow: stream plumbing, persistence, write-back
//!
//! [`ValidationFlow`] owns one [`ValidationSession`] together with its
//! candidate stream and persistence handle. It resumes a compatible
//! persisted session on start, snapshots after every state-changing
//! action, and on completion can write accepted candidates back into
//! their records.
//!
//! Cancellation is cooperative: cancelling clears the persisted resume
//! state and drops the stream; an in-flight generation simply has nobody
//! left to deliver to.

use crate::report::InsightReport;
use crate::validation::{JudgmentError, SessionSnapshot, ValidationMode, ValidationSession, ValidationState};
use deckmind_backend::{
    CandidateContext, CandidateStream, GenerationBackend, GenerationError, RemoteRecordStore,
    SessionPersistence, SessionPersistenceExt, StoreError,
};
use deckmind_model::{Candidate, FieldValue, RecordKey};
use futures::StreamExt;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Result of pulling one item from the candidate stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpOutcome {
    /// A candidate arrived and was ingested
    Ingested,
    /// An item arrived but was dropped (malformed, or session already
    /// completed)
    Skipped,
    /// The stream has ended
    Ended,
}

/// One validation activity: session + stream + persistence
pub struct ValidationFlow {
    session: ValidationSession,
    stream: Option<CandidateStream>,
    persistence: Arc<dyn SessionPersistence>,
    context_key: String,
}

impl ValidationFlow {
    /// Stable persistence key for a validation context
    #[must_use]
    pub fn context_key(context: &CandidateContext, mode: ValidationMode) -> String {
        match context.focus {
            Some(key) => format!("validation-{}-{}-{}", mode.as_str(), context.container, key.slot),
            None => format!("validation-{}-{}", mode.as_str(), context.container),
        }
    }

    /// Start (or resume) a validation activity
    ///
    /// A persisted snapshot under the same context key with the same mode
    /// is resumed; anything else starts fresh. The candidate stream is
    /// opened either way so newly generated candidates keep arriving.
    ///
    /// # Errors
    /// [`GenerationError`] if the stream cannot be opened (authentication
    /// failures surface directly, per policy).
    pub async fn start(
        mode: ValidationMode,
        context: CandidateContext,
        backend: &dyn GenerationBackend,
        persistence: Arc<dyn SessionPersistence>,
    ) -> Result<Self, GenerationError> {
        let context_key = Self::context_key(&context, mode);

        let session = match persistence
            .load_fresh::<SessionSnapshot>(&context_key, None)
            .await
            .filter(|snapshot| snapshot.mode == mode)
        {
            Some(snapshot) => {
                tracing::info!(key = %context_key, judged = snapshot.judged.len(), "resuming validation session");
                ValidationSession::resume(snapshot)
            }
            None => {
                tracing::info!(key = %context_key, ?mode, "starting validation session");
                ValidationSession::new(mode)
            }
        };

        let stream = backend.generate_candidates(context).await?;

        Ok(Self {
            session,
            stream: Some(stream),
            persistence,
            context_key,
        })
    }

    /// The underlying state machine
    #[inline]
    #[must_use]
    pub fn session(&self) -> &ValidationSession {
        &self.session
    }

    /// Pull one item from the candidate stream
    ///
    /// Malformed items are skipped with a warning; items arriving after
    /// completion are discarded. The snapshot is saved after every
    /// ingested candidate and at stream end.
    ///
    /// # Errors
    /// Only [`GenerationError::AuthRequired`] from inside the stream.
    pub async fn pump_next(&mut self) -> Result<PumpOutcome, GenerationError> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(PumpOutcome::Ended);
        };

        match stream.next().await {
            None => {
                self.stream = None;
                self.session.finish_stream();
                self.save().await;
                Ok(PumpOutcome::Ended)
            }
            Some(Ok(candidate)) => {
                if self.session.state() == ValidationState::Completed {
                    tracing::debug!(id = %candidate.id, "candidate after completion, discarded");
                    return Ok(PumpOutcome::Skipped);
                }
                self.session.ingest(candidate);
                self.save().await;
                Ok(PumpOutcome::Ingested)
            }
            Some(Err(err)) if err.is_fatal() => {
                self.stream = None;
                Err(err)
            }
            Some(Err(err)) => {
                tracing::warn!(%err, "malformed candidate skipped");
                Ok(PumpOutcome::Skipped)
            }
        }
    }

    /// Judge the current candidate as resonating
    ///
    /// # Errors
    /// Forwarded from the state machine.
    pub async fn resonate(&mut self) -> Result<(), JudgmentError> {
        self.session.resonate()?;
        self.after_judgment().await;
        Ok(())
    }

    /// Judge the current candidate as not resonating
    ///
    /// # Errors
    /// Forwarded from the state machine.
    pub async fn reject(&mut self) -> Result<(), JudgmentError> {
        self.session.reject()?;
        self.after_judgment().await;
        Ok(())
    }

    /// Open the discussion dialog (no snapshot, nothing changed)
    ///
    /// # Errors
    /// Forwarded from the state machine.
    pub fn open_discussion(&mut self) -> Result<(), JudgmentError> {
        self.session.open_discussion()
    }

    /// Close the dialog without judging
    ///
    /// # Errors
    /// Forwarded from the state machine.
    pub fn close_discussion(&mut self) -> Result<(), JudgmentError> {
        self.session.close_discussion()
    }

    /// Reject from inside the dialog and close it
    ///
    /// # Errors
    /// Forwarded from the state machine.
    pub async fn reject_from_discussion(&mut self) -> Result<(), JudgmentError> {
        self.session.reject_from_discussion()?;
        self.after_judgment().await;
        Ok(())
    }

    /// Discard the activity and its persisted resume state
    ///
    /// Performs no remote writes.
    pub async fn cancel(self) {
        tracing::info!(key = %self.context_key, "validation cancelled");
        self.persistence.clear(&self.context_key).await;
    }

    /// Build the report for a completed session
    ///
    /// `None` while the session is not completed.
    #[must_use]
    pub fn report(&self) -> Option<InsightReport> {
        if self.session.state() != ValidationState::Completed {
            return None;
        }
        Some(InsightReport::from_session(
            self.context_key.clone(),
            &self.session,
        ))
    }

    /// Write accepted candidates back into their records
    ///
    /// Appends each accepted candidate's content to the `insights` list
    /// field of its `group_key` record. Per-record failures are logged
    /// and skipped; the write-back never aborts as a whole. Returns the
    /// number of records updated.
    ///
    /// # Errors
    /// Never store errors (item-boundary policy); the `Result` is kept
    /// for future transport-level failures.
    pub async fn commit(&self, store: &dyn RemoteRecordStore) -> Result<usize, StoreError> {
        let mut grouped: BTreeMap<RecordKey, Vec<&Candidate>> = BTreeMap::new();
        for candidate in self.session.accepted() {
            grouped.entry(candidate.group_key).or_default().push(candidate);
        }

        let mut updated = 0;
        for (key, candidates) in grouped {
            match Self::append_insights(store, key, &candidates).await {
                Ok(()) => updated += 1,
                Err(err) => {
                    tracing::warn!(%key, %err, "insight write-back failed, continuing");
                }
            }
        }
        Ok(updated)
    }

    async fn append_insights(
        store: &dyn RemoteRecordStore,
        key: RecordKey,
        candidates: &[&Candidate],
    ) -> Result<(), StoreError> {
        let record = store.find(key).await?;
        let mut payload = record.payload.clone();
        let mut insights = match payload.get("insights") {
            Some(FieldValue::List(items)) => items.clone(),
            _ => Vec::new(),
        };
        for candidate in candidates {
            if !insights.contains(&candidate.content) {
                insights.push(candidate.content.clone());
            }
        }
        payload.set("insights", FieldValue::List(insights));
        store.write(record.id, payload, None, None).await
    }

    async fn after_judgment(&mut self) {
        if self.session.state() == ValidationState::Completed {
            tracing::info!(key = %self.context_key, "validation completed");
            // A completed session cannot be resumed; drop the snapshot
            self.persistence.clear(&self.context_key).await;
        } else {
            self.save().await;
        }
    }

    async fn save(&self) {
        self.persistence
            .save_now(&self.context_key, &self.session.snapshot())
            .await;
    }
}
