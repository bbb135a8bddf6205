//! Report store tests
//!
//! Freshness-window behavior across the memory and durable layers.

use chrono::{Duration, Utc};
use deckmind_backend::{PersistedEntry, SessionPersistence};
use deckmind_model::{Candidate, ContainerId, RecordKey, SlotId};
use deckmind_session::{InsightReport, ReportStore};
use deckmind_test_utils::MemoryPersistence;
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn report(context_key: &str) -> InsightReport {
    let key = RecordKey::new(ContainerId::new(), SlotId(0));
    InsightReport {
        context_key: context_key.to_string(),
        accepted: vec![Candidate::new("kept insight", key, 0.9, "mentor")],
        judged_total: 15,
        generated_at: Utc::now(),
    }
}

#[tokio::test]
async fn put_then_get_round_trip() {
    let persistence = Arc::new(MemoryPersistence::new());
    let store = ReportStore::new(persistence);

    store.put(report("ctx")).await;
    let loaded = store.get("ctx").await.unwrap();
    assert_eq!(loaded.judged_total, 15);
    assert_eq!(loaded.accepted.len(), 1);
}

#[tokio::test]
async fn durable_hit_survives_a_fresh_memory_layer() {
    // Simulates a reload: a new ReportStore over the same persistence
    let persistence = Arc::new(MemoryPersistence::new());
    let first = ReportStore::new(persistence.clone());
    first.put(report("ctx")).await;
    drop(first);

    let second = ReportStore::new(persistence);
    assert!(second.get("ctx").await.is_some());
}

#[tokio::test]
async fn stale_durable_report_is_absent() {
    let persistence = Arc::new(MemoryPersistence::new());
    let stale = PersistedEntry {
        value: serde_json::to_value(report("ctx")).unwrap(),
        saved_at: Utc::now() - Duration::hours(25),
    };
    persistence.save("report-ctx", stale).await;

    let store = ReportStore::new(persistence);
    assert!(store.get("ctx").await.is_none());
}

#[tokio::test]
async fn invalidate_clears_both_layers() {
    let persistence = Arc::new(MemoryPersistence::new());
    let store = ReportStore::new(persistence.clone());
    store.put(report("ctx")).await;

    store.invalidate("ctx").await;
    assert!(store.get("ctx").await.is_none());
    assert!(!persistence.contains("report-ctx"));
}

#[tokio::test]
async fn unknown_context_is_absent() {
    let store = ReportStore::new(Arc::new(MemoryPersistence::new()));
    assert!(store.get("never-saved").await.is_none());
}
