//! Testing utilities for the Deckmind workspace
//!
//! Shared fakes and fixtures: an in-memory record store with echoing
//! change notifications, a scripted generation backend, an in-memory
//! persistence store, and standard schema/record builders.

#![allow(missing_docs)]

use async_trait::async_trait;
use dashmap::DashMap;
use deckmind_backend::{
    CandidateContext, CandidateStream, GenerationBackend, GenerationError, PersistedEntry,
    RecordUpdate, RemoteRecordStore, SessionPersistence, StoreError,
};
use deckmind_model::{
    AssetUrl, Candidate, ContainerId, Evaluation, FieldKind, FieldSpec, Payload, Record, RecordId,
    RecordKey, SchemaCatalog, SlotId, SlotSchema,
};
use futures::stream;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Initialise tracing for tests (idempotent)
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .with_test_writer()
        .try_init();
}

/// Standard three-field slot schema used across tests
pub fn sample_schema() -> SlotSchema {
    SlotSchema::new()
        .with_field("title", FieldSpec::required(FieldKind::Text))
        .with_field("essence", FieldSpec::optional(FieldKind::Text))
        .with_field("insights", FieldSpec::optional(FieldKind::List))
}

/// Catalog registering [`sample_schema`] for the given slots
pub fn sample_catalog(slots: &[SlotId]) -> SchemaCatalog {
    slots
        .iter()
        .fold(SchemaCatalog::new(), |catalog, slot| {
            catalog.with_slot(*slot, sample_schema())
        })
}

/// Empty record in the given slot
pub fn empty_record(container: ContainerId, slot: SlotId) -> Record {
    Record::new(container, slot)
}

/// Record pre-filled with a title
pub fn filled_record(container: ContainerId, slot: SlotId, title: &str) -> Record {
    let mut record = Record::new(container, slot);
    record.payload.set("title", title);
    record
}

/// Candidate relating to the given record key
pub fn sample_candidate(group_key: RecordKey, content: &str, score: f32) -> Candidate {
    Candidate::new(content, group_key, score, "mentor")
}

/// In-memory record store with echoing change notifications
///
/// Every successful write is fanned out to all subscribers of the
/// record's container, including the writer's own subscription.
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: DashMap<RecordId, Record>,
    by_key: DashMap<RecordKey, RecordId>,
    subscribers: Mutex<Vec<(ContainerId, mpsc::Sender<RecordUpdate>)>>,
    fail_next_write: AtomicBool,
    writes: Mutex<Vec<RecordUpdate>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record, without notifying subscribers
    pub fn insert(&self, record: Record) {
        self.by_key.insert(record.key(), record.id);
        self.records.insert(record.id, record);
    }

    /// Make the next `write` fail with `WriteFailed`
    pub fn fail_next_write(&self) {
        self.fail_next_write.store(true, Ordering::SeqCst);
    }

    /// All successful writes, in order
    pub fn writes(&self) -> Vec<RecordUpdate> {
        self.writes.lock().clone()
    }

    /// Deliver an update to subscribers as if it were an external write
    pub async fn notify_external(&self, update: RecordUpdate) {
        self.fan_out(update).await;
    }

    /// Current state of a record
    pub fn snapshot(&self, id: RecordId) -> Option<Record> {
        self.records.get(&id).map(|r| r.value().clone())
    }

    async fn fan_out(&self, update: RecordUpdate) {
        let targets: Vec<mpsc::Sender<RecordUpdate>> = self
            .subscribers
            .lock()
            .iter()
            .filter(|(container, _)| *container == update.key.container)
            .map(|(_, tx)| tx.clone())
            .collect();
        for tx in targets {
            // Dropped receivers just miss the notification
            let _ = tx.send(update.clone()).await;
        }
    }
}

#[async_trait]
impl RemoteRecordStore for InMemoryRecordStore {
    async fn read(&self, id: RecordId) -> Result<Record, StoreError> {
        self.records
            .get(&id)
            .map(|r| r.value().clone())
            .ok_or(StoreError::NotFound)
    }

    async fn find(&self, key: RecordKey) -> Result<Record, StoreError> {
        let id = self.by_key.get(&key).map(|e| *e).ok_or(StoreError::NotFound)?;
        self.read(id).await
    }

    async fn write(
        &self,
        id: RecordId,
        payload: Payload,
        asset: Option<AssetUrl>,
        evaluation: Option<Evaluation>,
    ) -> Result<(), StoreError> {
        if self.fail_next_write.swap(false, Ordering::SeqCst) {
            return Err(StoreError::WriteFailed("injected failure".into()));
        }
        let update = {
            let mut record = self.records.get_mut(&id).ok_or(StoreError::NotFound)?;
            record.payload = payload;
            if let Some(asset) = asset {
                record.generated_asset = Some(asset);
            }
            if let Some(evaluation) = evaluation {
                record.evaluation = Some(evaluation);
            }
            RecordUpdate::from_record(&record)
        };
        self.writes.lock().push(update.clone());
        self.fan_out(update).await;
        Ok(())
    }

    async fn subscribe(
        &self,
        container: ContainerId,
    ) -> Result<mpsc::Receiver<RecordUpdate>, StoreError> {
        let (tx, rx) = mpsc::channel(64);
        self.subscribers.lock().push((container, tx));
        Ok(rx)
    }
}

/// Scripted generation backend
///
/// Image and evaluation outcomes are consumed front-to-back from queues;
/// an empty queue yields a default success. Candidate streams are either
/// a scripted batch or a live channel.
#[derive(Default)]
pub struct ScriptedGenerationBackend {
    image_outcomes: Mutex<VecDeque<Result<AssetUrl, GenerationError>>>,
    evaluation_outcomes: Mutex<VecDeque<Result<Evaluation, GenerationError>>>,
    candidate_batches: Mutex<VecDeque<Vec<Result<Candidate, GenerationError>>>>,
    live_feed: Mutex<Option<mpsc::UnboundedReceiver<Result<Candidate, GenerationError>>>>,
    image_calls: Mutex<Vec<SlotId>>,
    evaluation_calls: Mutex<Vec<Payload>>,
}

impl ScriptedGenerationBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_image(&self, outcome: Result<AssetUrl, GenerationError>) {
        self.image_outcomes.lock().push_back(outcome);
    }

    pub fn push_evaluation(&self, outcome: Result<Evaluation, GenerationError>) {
        self.evaluation_outcomes.lock().push_back(outcome);
    }

    /// Script the next candidate stream as a fixed batch
    pub fn push_candidate_batch(&self, batch: Vec<Result<Candidate, GenerationError>>) {
        self.candidate_batches.lock().push_back(batch);
    }

    /// Feed the next candidate stream live; the stream ends when the
    /// returned sender is dropped
    pub fn live_candidate_feed(&self) -> mpsc::UnboundedSender<Result<Candidate, GenerationError>> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.live_feed.lock() = Some(rx);
        tx
    }

    /// Slots `generate_image` was called for
    pub fn image_calls(&self) -> Vec<SlotId> {
        self.image_calls.lock().clone()
    }

    /// Payloads `generate_evaluation` was called with
    pub fn evaluation_calls(&self) -> Vec<Payload> {
        self.evaluation_calls.lock().clone()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedGenerationBackend {
    async fn generate_image(
        &self,
        slot: SlotId,
        _payload: &Payload,
    ) -> Result<AssetUrl, GenerationError> {
        self.image_calls.lock().push(slot);
        self.image_outcomes
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(AssetUrl::new(format!("https://assets.test/{slot}.png"))))
    }

    async fn generate_evaluation(
        &self,
        payload: &Payload,
        _context: &deckmind_backend::DefinitionContext,
    ) -> Result<Evaluation, GenerationError> {
        self.evaluation_calls.lock().push(payload.clone());
        self.evaluation_outcomes
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(Evaluation::overall(0.8)))
    }

    async fn generate_candidates(
        &self,
        _context: CandidateContext,
    ) -> Result<CandidateStream, GenerationError> {
        if let Some(rx) = self.live_feed.lock().take() {
            return Ok(Box::pin(tokio_stream_from(rx)));
        }
        let batch = self.candidate_batches.lock().pop_front().unwrap_or_default();
        Ok(Box::pin(stream::iter(batch)))
    }
}

fn tokio_stream_from(
    mut rx: mpsc::UnboundedReceiver<Result<Candidate, GenerationError>>,
) -> impl futures::Stream<Item = Result<Candidate, GenerationError>> {
    stream::poll_fn(move |cx| rx.poll_recv(cx))
}

/// In-memory session persistence
#[derive(Default)]
pub struct MemoryPersistence {
    entries: Mutex<HashMap<String, PersistedEntry>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Overwrite an entry directly (e.g. to plant a corrupt snapshot)
    pub fn put_raw(&self, key: &str, entry: PersistedEntry) {
        self.entries.lock().insert(key.to_string(), entry);
    }
}

#[async_trait]
impl SessionPersistence for MemoryPersistence {
    async fn save(&self, key: &str, entry: PersistedEntry) {
        self.entries.lock().insert(key.to_string(), entry);
    }

    async fn load(&self, key: &str) -> Option<PersistedEntry> {
        self.entries.lock().get(key).cloned()
    }

    async fn clear(&self, key: &str) {
        self.entries.lock().remove(key);
    }
}

/// Arc-wrapped fixture bundle for flow-level tests
pub struct TestHarness {
    pub store: Arc<InMemoryRecordStore>,
    pub backend: Arc<ScriptedGenerationBackend>,
    pub persistence: Arc<MemoryPersistence>,
}

impl TestHarness {
    pub fn new() -> Self {
        init_test_logging();
        Self {
            store: Arc::new(InMemoryRecordStore::new()),
            backend: Arc::new(ScriptedGenerationBackend::new()),
            persistence: Arc::new(MemoryPersistence::new()),
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
