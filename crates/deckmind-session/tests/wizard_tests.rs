//! Wizard session tests
//!
//! Wizard progress is session-local UI state: it survives echoes and
//! no-op syncs and resets only on a true record switch. Finalize covers
//! the generation coordinator's partial-failure tolerance end to end.

use deckmind_backend::{DefinitionContext, GenerationError, RecordUpdate};
use deckmind_model::{AssetUrl, ContainerId, Evaluation, SlotId};
use deckmind_session::{GenerationCoordinator, SyncOutcome, WizardSession};
use deckmind_test_utils::{empty_record, filled_record, sample_catalog, TestHarness};
use pretty_assertions::assert_eq;

fn wizard(harness: &TestHarness) -> WizardSession {
    let container = ContainerId::new();
    let record = empty_record(container, SlotId(0));
    harness.store.insert(record.clone());
    WizardSession::open(&record, sample_catalog(&[SlotId(0), SlotId(1)]))
}

fn fill_all_steps(wizard: &mut WizardSession) {
    // Schema order: essence, insights, title
    while !wizard.all_steps_completed() {
        match wizard.current_field().unwrap() {
            "insights" => wizard
                .set_current_field(deckmind_model::FieldValue::List(vec!["seed".into()]))
                .unwrap(),
            field => {
                let value = format!("value for {field}");
                wizard.set_current_field(value).unwrap();
            }
        }
        wizard.advance();
    }
}

#[tokio::test]
async fn steps_follow_schema_order() {
    let harness = TestHarness::new();
    let mut w = wizard(&harness);

    // Canonical (BTreeMap) order of the sample schema
    assert_eq!(w.current_field(), Some("essence"));
    w.set_current_field("steady").unwrap();
    w.advance();
    assert_eq!(w.current_field(), Some("insights"));
}

#[tokio::test]
async fn review_mode_after_last_completed_step() {
    let harness = TestHarness::new();
    let mut w = wizard(&harness);
    fill_all_steps(&mut w);
    w.advance();
    assert!(w.review_mode());

    w.back();
    assert!(!w.review_mode());
}

#[tokio::test]
async fn progress_survives_echo_and_noop_sync() {
    let harness = TestHarness::new();
    let mut w = wizard(&harness);
    w.set_current_field("an essence").unwrap();
    w.advance();
    let step_before = w.current_step();

    // A notification byte-identical to what the wizard last forwarded
    let noop = RecordUpdate {
        key: w.edit().key(),
        record_id: w.edit().record_id(),
        payload: w.edit().payload().clone(),
        generated_asset: None,
        evaluation: None,
    };
    assert_eq!(w.absorb_remote(noop), SyncOutcome::NoOp);
    assert_eq!(w.current_step(), step_before);
    assert!(!w.review_mode());
}

#[tokio::test]
async fn record_switch_resets_progress() {
    let harness = TestHarness::new();
    let mut w = wizard(&harness);
    w.set_current_field("an essence").unwrap();
    w.advance();
    assert_ne!(w.current_step(), 0);

    let other = filled_record(w.edit().key().container, SlotId(1), "Other");
    let outcome = w.absorb_remote(RecordUpdate::from_record(&other));
    assert_eq!(outcome, SyncOutcome::RecordSwitched);
    assert_eq!(w.current_step(), 0);
    assert!(!w.review_mode());
    assert!(!w.all_steps_completed());
}

#[tokio::test]
async fn finalize_submits_once_and_persists_derived_fields() {
    let harness = TestHarness::new();
    let mut w = wizard(&harness);
    fill_all_steps(&mut w);

    let coordinator = GenerationCoordinator::new(harness.backend.clone());
    let outcome = w
        .finalize(harness.store.as_ref(), &coordinator, &DefinitionContext::default())
        .await
        .unwrap();

    assert!(!outcome.has_errors);
    assert!(outcome.image.is_some());
    assert!(outcome.evaluation.is_some());

    // Two writes: the submit, then the derived-field write
    let writes = harness.store.writes();
    assert_eq!(writes.len(), 2);
    assert!(writes[0].generated_asset.is_none());
    assert!(writes[1].generated_asset.is_some());

    let stored = harness.store.snapshot(w.edit().record_id()).unwrap();
    assert!(stored.generated_asset.is_some());
    assert!(stored.evaluation.is_some());
}

#[tokio::test]
async fn finalize_tolerates_partial_generation_failure() {
    let harness = TestHarness::new();
    let mut w = wizard(&harness);
    fill_all_steps(&mut w);

    harness
        .backend
        .push_image(Err(GenerationError::Transient("image service down".into())));
    harness.backend.push_evaluation(Ok(Evaluation::overall(0.85)));

    let coordinator = GenerationCoordinator::new(harness.backend.clone());
    let outcome = w
        .finalize(harness.store.as_ref(), &coordinator, &DefinitionContext::default())
        .await
        .unwrap();

    assert!(outcome.has_errors);
    assert!(outcome.image.is_none());
    assert_eq!(outcome.evaluation.as_ref().map(|e| e.overall), Some(0.85));

    // The surviving evaluation is persisted despite the image failure
    let stored = harness.store.snapshot(w.edit().record_id()).unwrap();
    assert_eq!(stored.evaluation.map(|e| e.overall), Some(0.85));
    assert!(stored.generated_asset.is_none());
}

#[tokio::test]
async fn finalize_skips_generations_that_already_exist() {
    let harness = TestHarness::new();
    let container = ContainerId::new();
    let mut record = filled_record(container, SlotId(0), "Pre-imaged");
    record.generated_asset = Some(AssetUrl::new("https://assets.test/existing.png"));
    harness.store.insert(record.clone());

    let mut w = WizardSession::open(&record, sample_catalog(&[SlotId(0)]));
    fill_all_steps(&mut w);

    let coordinator = GenerationCoordinator::new(harness.backend.clone());
    let outcome = w
        .finalize(harness.store.as_ref(), &coordinator, &DefinitionContext::default())
        .await
        .unwrap();

    // Image untouched, evaluation generated
    assert!(outcome.image.is_none());
    assert!(outcome.evaluation.is_some());
    assert!(harness.backend.image_calls().is_empty());
    assert_eq!(harness.backend.evaluation_calls().len(), 1);
}

#[tokio::test]
async fn auth_failure_aborts_finalize() {
    let harness = TestHarness::new();
    let mut w = wizard(&harness);
    fill_all_steps(&mut w);

    harness.backend.push_image(Err(GenerationError::AuthRequired));

    let coordinator = GenerationCoordinator::new(harness.backend.clone());
    let err = w
        .finalize(harness.store.as_ref(), &coordinator, &DefinitionContext::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        deckmind_session::WizardError::Generation(GenerationError::AuthRequired)
    ));
}
