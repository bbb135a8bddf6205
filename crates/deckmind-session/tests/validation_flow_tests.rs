//! Validation flow tests
//!
//! Streaming, persistence/resume, cancellation, and accepted-insight
//! write-back over the scripted backend and in-memory persistence.

use deckmind_backend::{CandidateContext, GenerationError, PersistedEntry, RemoteRecordStore, SessionPersistence};
use deckmind_model::{ContainerId, FieldValue, RecordKey, SlotId};
use deckmind_session::{
    PumpOutcome, ValidationFlow, ValidationMode, ValidationState,
};
use deckmind_test_utils::{filled_record, sample_candidate, TestHarness};
use pretty_assertions::assert_eq;

async fn start_flow(harness: &TestHarness, mode: ValidationMode, container: ContainerId) -> ValidationFlow {
    ValidationFlow::start(
        mode,
        CandidateContext::full(container),
        harness.backend.as_ref(),
        harness.persistence.clone(),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn pumps_candidates_until_stream_end() {
    let harness = TestHarness::new();
    let container = ContainerId::new();
    let key = RecordKey::new(container, SlotId(0));
    harness.backend.push_candidate_batch(vec![
        Ok(sample_candidate(key, "first", 0.9)),
        Ok(sample_candidate(key, "second", 0.4)),
    ]);

    let mut flow = start_flow(&harness, ValidationMode::Full, container).await;
    assert_eq!(flow.pump_next().await.unwrap(), PumpOutcome::Ingested);
    assert_eq!(flow.pump_next().await.unwrap(), PumpOutcome::Ingested);
    assert_eq!(flow.pump_next().await.unwrap(), PumpOutcome::Ended);
    assert_eq!(flow.pump_next().await.unwrap(), PumpOutcome::Ended);

    assert!(flow.session().streaming_complete());
    assert_eq!(flow.session().seen().len(), 2);
}

#[tokio::test]
async fn malformed_items_are_skipped_not_fatal() {
    let harness = TestHarness::new();
    let container = ContainerId::new();
    let key = RecordKey::new(container, SlotId(0));
    harness.backend.push_candidate_batch(vec![
        Ok(sample_candidate(key, "good", 0.8)),
        Err(GenerationError::MalformedResponse("bad shape".into())),
        Ok(sample_candidate(key, "also good", 0.6)),
    ]);

    let mut flow = start_flow(&harness, ValidationMode::Full, container).await;
    assert_eq!(flow.pump_next().await.unwrap(), PumpOutcome::Ingested);
    assert_eq!(flow.pump_next().await.unwrap(), PumpOutcome::Skipped);
    assert_eq!(flow.pump_next().await.unwrap(), PumpOutcome::Ingested);
    assert_eq!(flow.session().seen().len(), 2);
}

#[tokio::test]
async fn auth_failure_inside_stream_is_fatal() {
    let harness = TestHarness::new();
    let container = ContainerId::new();
    let key = RecordKey::new(container, SlotId(0));
    harness.backend.push_candidate_batch(vec![
        Ok(sample_candidate(key, "one", 0.8)),
        Err(GenerationError::AuthRequired),
    ]);

    let mut flow = start_flow(&harness, ValidationMode::Full, container).await;
    flow.pump_next().await.unwrap();
    assert_eq!(flow.pump_next().await, Err(GenerationError::AuthRequired));
}

#[tokio::test]
async fn judgments_persist_and_resume() {
    let harness = TestHarness::new();
    let container = ContainerId::new();
    let key = RecordKey::new(container, SlotId(0));
    harness.backend.push_candidate_batch(
        (0..4)
            .map(|i| Ok(sample_candidate(key, &format!("insight {i}"), 0.7)))
            .collect(),
    );

    let mut flow = start_flow(&harness, ValidationMode::Full, container).await;
    while flow.pump_next().await.unwrap() == PumpOutcome::Ingested {}
    flow.resonate().await.unwrap();
    flow.reject().await.unwrap();
    drop(flow); // interruption

    // A second run with an empty stream resumes where the first stopped
    let resumed = start_flow(&harness, ValidationMode::Full, container).await;
    assert_eq!(resumed.session().judged().len(), 2);
    assert_eq!(resumed.session().seen().len(), 4);
    assert_eq!(
        resumed.session().state(),
        ValidationState::Judging { waiting: false }
    );
}

#[tokio::test]
async fn resume_starts_with_a_live_stream() {
    // First run: the stream ends and every seen candidate gets judged
    let harness = TestHarness::new();
    let container = ContainerId::new();
    let key = RecordKey::new(container, SlotId(0));
    harness.backend.push_candidate_batch(
        (0..5)
            .map(|i| Ok(sample_candidate(key, &format!("insight {i}"), 0.7)))
            .collect(),
    );

    let mut flow = start_flow(&harness, ValidationMode::Full, container).await;
    while flow.pump_next().await.unwrap() != PumpOutcome::Ended {}
    for _ in 0..5 {
        flow.resonate().await.unwrap();
    }
    assert!(flow.session().stream_exhausted());
    drop(flow); // interruption

    // The resumed run opens a fresh stream; the old run's stream end must
    // not carry over, so the session waits for new candidates instead of
    // reporting exhaustion
    let feed = harness.backend.live_candidate_feed();
    let mut resumed = start_flow(&harness, ValidationMode::Full, container).await;
    assert!(!resumed.session().stream_exhausted());
    assert_eq!(
        resumed.session().state(),
        ValidationState::Judging { waiting: true }
    );

    feed.send(Ok(sample_candidate(key, "fresh arrival", 0.6))).unwrap();
    assert_eq!(resumed.pump_next().await.unwrap(), PumpOutcome::Ingested);
    assert_eq!(resumed.session().seen().len(), 6);
}

#[tokio::test]
async fn corrupt_snapshot_starts_fresh() {
    let harness = TestHarness::new();
    let container = ContainerId::new();

    let context = CandidateContext::full(container);
    let context_key = ValidationFlow::context_key(&context, ValidationMode::Full);
    harness.persistence.put_raw(
        &context_key,
        PersistedEntry {
            value: serde_json::json!({"definitely": "not a snapshot"}),
            saved_at: chrono::Utc::now(),
        },
    );

    let flow = start_flow(&harness, ValidationMode::Full, container).await;
    assert_eq!(flow.session().seen().len(), 0);
    assert_eq!(flow.session().state(), ValidationState::Collecting);
}

#[tokio::test]
async fn mode_mismatch_does_not_resume() {
    let harness = TestHarness::new();
    let container = ContainerId::new();
    let key = RecordKey::new(container, SlotId(0));

    // Single-record keys differ from full keys, so a single-record
    // snapshot can never be loaded into a full session in the first place
    let single_context = CandidateContext::focused(container, key);
    let full_context = CandidateContext::full(container);
    assert_ne!(
        ValidationFlow::context_key(&single_context, ValidationMode::SingleRecord),
        ValidationFlow::context_key(&full_context, ValidationMode::Full),
    );
}

#[tokio::test]
async fn cancel_clears_persisted_state() {
    let harness = TestHarness::new();
    let container = ContainerId::new();
    let key = RecordKey::new(container, SlotId(0));
    harness.backend.push_candidate_batch(vec![
        Ok(sample_candidate(key, "a", 0.7)),
    ]);

    let mut flow = start_flow(&harness, ValidationMode::Full, container).await;
    flow.pump_next().await.unwrap();

    let context = CandidateContext::full(container);
    let context_key = ValidationFlow::context_key(&context, ValidationMode::Full);
    assert!(harness.persistence.contains(&context_key));

    flow.cancel().await;
    assert!(!harness.persistence.contains(&context_key));
    assert!(harness.store.writes().is_empty());
}

#[tokio::test]
async fn completion_clears_snapshot_and_builds_report() {
    let harness = TestHarness::new();
    let container = ContainerId::new();
    let key = RecordKey::new(container, SlotId(0));
    let feed = harness.backend.live_candidate_feed();

    let mut flow = start_flow(&harness, ValidationMode::SingleRecord, container).await;
    for i in 0..3 {
        feed.send(Ok(sample_candidate(key, &format!("late {i}"), 0.95)))
            .unwrap();
        flow.pump_next().await.unwrap();
    }

    flow.resonate().await.unwrap();
    flow.reject().await.unwrap();
    assert!(flow.report().is_none());
    flow.resonate().await.unwrap();

    assert_eq!(flow.session().state(), ValidationState::Completed);
    let context = CandidateContext::full(container);
    let context_key = ValidationFlow::context_key(&context, ValidationMode::SingleRecord);
    assert!(!harness.persistence.contains(&context_key));

    let report = flow.report().unwrap();
    assert_eq!(report.judged_total, 3);
    assert_eq!(report.accepted.len(), 2);

    // Candidates still streaming in after completion are discarded
    feed.send(Ok(sample_candidate(key, "too late", 0.9))).unwrap();
    assert_eq!(flow.pump_next().await.unwrap(), PumpOutcome::Skipped);
}

#[tokio::test]
async fn commit_writes_accepted_insights_back() {
    let harness = TestHarness::new();
    let container = ContainerId::new();
    let key_a = RecordKey::new(container, SlotId(0));
    let key_b = RecordKey::new(container, SlotId(1));
    harness.store.insert(filled_record(container, SlotId(0), "Card A"));
    harness.store.insert(filled_record(container, SlotId(1), "Card B"));

    harness.backend.push_candidate_batch(vec![
        Ok(sample_candidate(key_a, "sees patterns early", 0.9)),
        Ok(sample_candidate(key_b, "works in long arcs", 0.8)),
        Ok(sample_candidate(key_a, "trusts the process", 0.7)),
    ]);

    let mut flow = start_flow(&harness, ValidationMode::SingleRecord, container).await;
    while flow.pump_next().await.unwrap() == PumpOutcome::Ingested {}
    flow.resonate().await.unwrap();
    flow.reject().await.unwrap();
    flow.resonate().await.unwrap();

    let updated = flow.commit(harness.store.as_ref()).await.unwrap();
    assert_eq!(updated, 1);

    let record_a = harness.store.find(key_a).await.unwrap();
    assert_eq!(
        record_a.payload.get("insights"),
        Some(&FieldValue::List(vec![
            "sees patterns early".into(),
            "trusts the process".into(),
        ]))
    );
    // Card B's only candidate was rejected
    let record_b = harness.store.find(key_b).await.unwrap();
    assert!(record_b.payload.get("insights").is_none());
}

#[tokio::test]
async fn end_to_end_short_stream_stays_in_judging() {
    // Full session, 5 candidates ever produced, 3 resonates + 2 rejects:
    // the session must remain judging, not auto-complete
    let harness = TestHarness::new();
    let container = ContainerId::new();
    let key = RecordKey::new(container, SlotId(0));
    let feed = harness.backend.live_candidate_feed();

    let mut flow = start_flow(&harness, ValidationMode::Full, container).await;
    for i in 0..5 {
        feed.send(Ok(sample_candidate(key, &format!("insight {i}"), 0.8)))
            .unwrap();
        assert_eq!(flow.pump_next().await.unwrap(), PumpOutcome::Ingested);
        if i == 2 {
            // Judging became available exactly at the third candidate
            assert_eq!(
                flow.session().state(),
                ValidationState::Judging { waiting: false }
            );
        }
    }

    flow.resonate().await.unwrap();
    flow.resonate().await.unwrap();
    flow.resonate().await.unwrap();
    flow.reject().await.unwrap();
    flow.reject().await.unwrap();

    drop(feed); // stream ends with only 5 ever produced
    assert_eq!(flow.pump_next().await.unwrap(), PumpOutcome::Ended);

    assert_eq!(
        flow.session().state(),
        ValidationState::Judging { waiting: false }
    );
    assert!(flow.session().stream_exhausted());
    assert!(flow.report().is_none());
}
