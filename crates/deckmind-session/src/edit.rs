//! Edit session and echo-suppression protocol
//!
//! An [`EditSession`] owns the authoritative in-memory payload for one
//! record and arbitrates between three event sources: local edits, local
//! submits, and remote change notifications (which include echoes of the
//! session's own writes).
//!
//! Remote classification is content-based: the submit path records a
//! fingerprint of the written payload and the next matching notification
//! is treated as an echo. There is no sequence number or logical clock, so
//! an edit-then-revert that fingerprints identically to an in-flight
//! submit is indistinguishable from an echo; a same-shaped concurrent
//! external change is likewise classified as one. Known limitation of the
//! protocol, kept deliberately.

use deckmind_backend::{RecordUpdate, RemoteRecordStore, StoreError};
use deckmind_model::{
    AssetUrl, Evaluation, FieldValue, Payload, PayloadFingerprint, Record, RecordId, RecordKey,
    SchemaCatalog, SchemaViolation,
};

/// How the surrounding UI should present the record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryMode {
    /// Record was empty when opened: collect fields step by step
    Wizard,
    /// Record already has data: free-form editing
    QuickEdit,
}

impl EntryMode {
    fn for_payload(payload: &Payload) -> Self {
        if payload.is_empty() {
            Self::Wizard
        } else {
            Self::QuickEdit
        }
    }
}

/// Classification of one remote notification
///
/// Returned by [`EditSession::apply_remote`] so the decision table is
/// observable and testable in isolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Notification was for a different record; session fully reset
    RecordSwitched,
    /// Echo of this session's own write; local payload untouched
    EchoSuppressed,
    /// Payload identical to the local one; derived fields merged only
    NoOp,
    /// Genuine external change; local payload replaced wholesale
    Replaced,
}

/// Submit failure
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SubmitError {
    /// Payload does not satisfy the slot schema
    #[error(transparent)]
    Schema(#[from] SchemaViolation),

    /// Remote write failed; echo-suppression state was rolled back
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One record's local edit buffer and synchronization state
#[derive(Debug, Clone)]
pub struct EditSession {
    key: RecordKey,
    record_id: RecordId,
    catalog: SchemaCatalog,
    local_payload: Payload,
    generated_asset: Option<AssetUrl>,
    evaluation: Option<Evaluation>,
    last_write_marker: Option<PayloadFingerprint>,
    suppress_next_sync: bool,
    entry_mode: EntryMode,
}

impl EditSession {
    /// Open a session over one record
    #[must_use]
    pub fn open(record: &Record, catalog: SchemaCatalog) -> Self {
        let entry_mode = EntryMode::for_payload(&record.payload);
        Self {
            key: record.key(),
            record_id: record.id,
            catalog,
            local_payload: record.payload.clone(),
            generated_asset: record.generated_asset.clone(),
            evaluation: record.evaluation.clone(),
            last_write_marker: None,
            suppress_next_sync: false,
            entry_mode,
        }
    }

    /// Identity of the record this session edits
    #[inline]
    #[must_use]
    pub fn key(&self) -> RecordKey {
        self.key
    }

    /// Remote id of the edited record
    #[inline]
    #[must_use]
    pub fn record_id(&self) -> RecordId {
        self.record_id
    }

    /// Current local payload (always reflects the latest local edit)
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.local_payload
    }

    /// Generated image asset, if any has arrived
    #[inline]
    #[must_use]
    pub fn generated_asset(&self) -> Option<&AssetUrl> {
        self.generated_asset.as_ref()
    }

    /// Evaluation result, if any has arrived
    #[inline]
    #[must_use]
    pub fn evaluation(&self) -> Option<&Evaluation> {
        self.evaluation.as_ref()
    }

    /// Presentation mode derived when the record was opened or switched
    #[inline]
    #[must_use]
    pub fn entry_mode(&self) -> EntryMode {
        self.entry_mode
    }

    /// Whether the next notification may be this session's own echo
    #[inline]
    #[must_use]
    pub fn suppression_pending(&self) -> bool {
        self.suppress_next_sync
    }

    /// Schema the session validates against
    #[must_use]
    pub fn schema(&self) -> deckmind_model::SlotSchema {
        self.catalog.for_slot(self.key.slot)
    }

    /// Merge one local field edit
    ///
    /// No remote effect; the edit is visible to the very next local read.
    ///
    /// # Errors
    /// [`SchemaViolation`] if the field is undeclared or mistyped. The
    /// buffer is untouched on error.
    pub fn edit_field(
        &mut self,
        field: &str,
        value: impl Into<FieldValue>,
    ) -> Result<(), SchemaViolation> {
        let value = value.into();
        self.schema().validate_field(field, &value)?;
        self.local_payload.set(field, value);
        Ok(())
    }

    /// Submit the local payload to the remote store
    ///
    /// Arms echo suppression before issuing the write; on write failure
    /// both the marker and the suppression flag are rolled back so a later
    /// genuine remote read is not wrongly suppressed.
    ///
    /// # Errors
    /// [`SubmitError::Schema`] before any remote call,
    /// [`SubmitError::Store`] if the write is rejected.
    pub async fn submit(&mut self, store: &dyn RemoteRecordStore) -> Result<(), SubmitError> {
        self.schema().validate_payload(&self.local_payload)?;

        let marker = self.local_payload.fingerprint();
        self.last_write_marker = Some(marker);
        self.suppress_next_sync = true;
        tracing::debug!(key = %self.key, %marker, "submitting record payload");

        match store
            .write(self.record_id, self.local_payload.clone(), None, None)
            .await
        {
            Ok(()) => Ok(()),
            Err(err) => {
                // The write never happened; a matching notification later
                // would be a genuine external change, not an echo.
                self.last_write_marker = None;
                self.suppress_next_sync = false;
                tracing::warn!(key = %self.key, %err, "submit failed, suppression rolled back");
                Err(err.into())
            }
        }
    }

    /// Apply one remote change notification
    ///
    /// Four-way decision, evaluated in order: record switch, own echo,
    /// no-op payload, genuine external change. Derived fields
    /// (asset/evaluation) are merged on every non-switch branch because
    /// this session never originates them.
    pub fn apply_remote(&mut self, update: RecordUpdate) -> SyncOutcome {
        if update.key != self.key {
            tracing::debug!(from = %self.key, to = %update.key, "record switch, full reset");
            self.reset_to(update);
            return SyncOutcome::RecordSwitched;
        }

        let incoming = update.payload.fingerprint();

        if self.suppress_next_sync && Some(incoming) == self.last_write_marker {
            self.suppress_next_sync = false;
            self.merge_derived(update.generated_asset, update.evaluation);
            tracing::debug!(key = %self.key, "own echo suppressed");
            return SyncOutcome::EchoSuppressed;
        }

        if incoming == self.local_payload.fingerprint() {
            self.merge_derived(update.generated_asset, update.evaluation);
            return SyncOutcome::NoOp;
        }

        tracing::info!(key = %self.key, "external change replaces local payload");
        self.local_payload = update.payload;
        self.merge_derived(update.generated_asset, update.evaluation);
        SyncOutcome::Replaced
    }

    /// Merge generation results into the session
    ///
    /// The finalize path feeds coordinator outcomes through here; it is
    /// the same merge the remote branches perform.
    pub fn merge_derived(&mut self, asset: Option<AssetUrl>, evaluation: Option<Evaluation>) {
        if let Some(asset) = asset {
            self.generated_asset = Some(asset);
        }
        if let Some(evaluation) = evaluation {
            self.evaluation = Some(evaluation);
        }
    }

    fn reset_to(&mut self, update: RecordUpdate) {
        self.key = update.key;
        self.record_id = update.record_id;
        self.entry_mode = EntryMode::for_payload(&update.payload);
        self.local_payload = update.payload;
        self.generated_asset = update.generated_asset;
        self.evaluation = update.evaluation;
        self.last_write_marker = None;
        self.suppress_next_sync = false;
    }
}
