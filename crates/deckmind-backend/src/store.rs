//! Remote record store interface
//!
//! CRUD plus best-effort change notifications. Delivery includes the
//! subscriber's own writes (echoes); ordering beyond arrival order is not
//! guaranteed. The echo-suppression protocol in `deckmind-session` copes
//! with both properties.

use crate::error::StoreError;
use async_trait::async_trait;
use deckmind_model::{AssetUrl, ContainerId, Evaluation, Payload, Record, RecordId, RecordKey};
use tokio::sync::mpsc;

/// One change notification for a record
#[derive(Debug, Clone, PartialEq)]
pub struct RecordUpdate {
    /// Identity of the changed record
    pub key: RecordKey,
    pub record_id: RecordId,
    pub payload: Payload,
    pub generated_asset: Option<AssetUrl>,
    pub evaluation: Option<Evaluation>,
}

impl RecordUpdate {
    /// Build an update carrying a record's current state
    #[must_use]
    pub fn from_record(record: &Record) -> Self {
        Self {
            key: record.key(),
            record_id: record.id,
            payload: record.payload.clone(),
            generated_asset: record.generated_asset.clone(),
            evaluation: record.evaluation.clone(),
        }
    }
}

/// Record CRUD + change-notification subscription
#[async_trait]
pub trait RemoteRecordStore: Send + Sync {
    /// Read one record
    ///
    /// # Errors
    /// [`StoreError::NotFound`] if the id is unknown.
    async fn read(&self, id: RecordId) -> Result<Record, StoreError>;

    /// Look up the record occupying a container slot
    ///
    /// # Errors
    /// [`StoreError::NotFound`] if the slot has no record.
    async fn find(&self, key: RecordKey) -> Result<Record, StoreError>;

    /// Write a record's payload and, optionally, derived fields
    ///
    /// `asset`/`evaluation` of `None` leave the stored derived fields
    /// untouched; only the generation pipeline passes `Some`.
    ///
    /// # Errors
    /// [`StoreError::WriteFailed`] if the write is rejected or lost.
    async fn write(
        &self,
        id: RecordId,
        payload: Payload,
        asset: Option<AssetUrl>,
        evaluation: Option<Evaluation>,
    ) -> Result<(), StoreError>;

    /// Subscribe to change notifications for one container
    ///
    /// Best effort: at least the subscriber's own writes and any external
    /// writes, in arrival order.
    async fn subscribe(
        &self,
        container: ContainerId,
    ) -> Result<mpsc::Receiver<RecordUpdate>, StoreError>;
}
