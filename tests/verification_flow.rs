// tests/verification_flow.rs
mod common;

use std::sync::Arc;
use std::time::Duration;

use biobind::core::binding::CredentialLedger;
use biobind::core::enrollment::EnrollmentOrchestrator;
use biobind::core::identity::types::CredentialBinding;
use biobind::core::verification::VerificationOrchestrator;
use biobind::utils::error::IdentityError;
use tempfile::tempdir;

use common::{frame, CancellingAuthenticator, CountingLedger, TestStack, WidthKeyedEngine};

const REFERENCE_WIDTH: u32 = 40;
const LIVE_WIDTH: u32 = 41;

fn verifier(stack: &TestStack) -> VerificationOrchestrator {
    VerificationOrchestrator::new(
        stack.extractor.clone(),
        stack.credentials.clone(),
        stack.binder.clone(),
        stack.templates.clone(),
        0.5,
        Duration::from_secs(5),
    )
}

async fn enroll(stack: &TestStack, wallet: &str) {
    EnrollmentOrchestrator::new(
        stack.extractor.clone(),
        stack.credentials.clone(),
        stack.binder.clone(),
        stack.templates.clone(),
        Duration::from_secs(5),
    )
    .enroll(wallet, &frame(REFERENCE_WIDTH))
    .await
    .unwrap();
}

/// Stack sharing one engine, authenticator and ledger, with the reference
/// face pre-scripted.
async fn stack_with_reference(
    tmp: &std::path::Path,
    reference: Vec<f32>,
    live: Vec<f32>,
) -> (TestStack, Arc<WidthKeyedEngine>, Arc<CountingLedger>) {
    let engine = Arc::new(WidthKeyedEngine::new());
    engine.script(REFERENCE_WIDTH, reference);
    engine.script(LIVE_WIDTH, live);
    let ledger = Arc::new(CountingLedger::new());

    let stack = TestStack::new(
        engine.clone(),
        common::software_authenticator(),
        ledger.clone(),
        tmp,
    )
    .await;

    (stack, engine, ledger)
}

#[tokio::test]
async fn end_to_end_verification_passes_both_factors() {
    let tmp = tempdir().unwrap();
    // distance(live, reference) = 0.3, under the 0.5 threshold.
    let (stack, _engine, _ledger) =
        stack_with_reference(tmp.path(), vec![0.0, 0.0], vec![0.3, 0.0]).await;
    enroll(&stack, "0xABC").await;

    let outcome = verifier(&stack)
        .verify("0xABC", &frame(LIVE_WIDTH))
        .await
        .unwrap();

    assert!(outcome.fingerprint_verified);
    assert!(outcome.face_verified);
    assert!(outcome.combined);
}

#[tokio::test]
async fn distant_live_face_rejects_the_face_factor() {
    let tmp = tempdir().unwrap();
    let (stack, _engine, _ledger) =
        stack_with_reference(tmp.path(), vec![0.0, 0.0], vec![0.9, 0.0]).await;
    enroll(&stack, "0xABC").await;

    let outcome = verifier(&stack)
        .verify("0xABC", &frame(LIVE_WIDTH))
        .await
        .unwrap();

    assert!(outcome.fingerprint_verified);
    assert!(!outcome.face_verified);
    assert!(!outcome.combined);
}

#[tokio::test]
async fn threshold_is_a_strict_bound() {
    // Exactly at the threshold: rejected.
    {
        let tmp = tempdir().unwrap();
        let (stack, _engine, _ledger) =
            stack_with_reference(tmp.path(), vec![0.0, 0.0], vec![0.5, 0.0]).await;
        enroll(&stack, "0xABC").await;

        let outcome = verifier(&stack)
            .verify("0xABC", &frame(LIVE_WIDTH))
            .await
            .unwrap();
        assert!(!outcome.face_verified);
    }

    // Just under the threshold: accepted.
    {
        let tmp = tempdir().unwrap();
        let (stack, _engine, _ledger) =
            stack_with_reference(tmp.path(), vec![0.0, 0.0], vec![0.4999, 0.0]).await;
        enroll(&stack, "0xABC").await;

        let outcome = verifier(&stack)
            .verify("0xABC", &frame(LIVE_WIDTH))
            .await
            .unwrap();
        assert!(outcome.face_verified);
        assert!(outcome.combined);
    }
}

#[tokio::test]
async fn unenrolled_wallet_rejects_at_the_fingerprint_gate() {
    let tmp = tempdir().unwrap();
    let (stack, engine, _ledger) =
        stack_with_reference(tmp.path(), vec![0.0, 0.0], vec![0.1, 0.0]).await;

    let calls_before = engine.detect_calls();
    let outcome = verifier(&stack)
        .verify("0xNOBODY", &frame(LIVE_WIDTH))
        .await
        .unwrap();

    assert!(!outcome.fingerprint_verified);
    assert!(!outcome.combined);
    // The face factor never ran.
    assert_eq!(engine.detect_calls(), calls_before);
}

#[tokio::test]
async fn cancelled_assertion_aborts_before_the_face_check() {
    let tmp = tempdir().unwrap();
    let (stack, engine, ledger) =
        stack_with_reference(tmp.path(), vec![0.0, 0.0], vec![0.1, 0.0]).await;
    enroll(&stack, "0xABC").await;

    // Same stores, but the authenticator now cancels every prompt.
    let cancelled_stack = TestStack::new(
        engine.clone(),
        Arc::new(CancellingAuthenticator),
        ledger.clone(),
        tmp.path(),
    )
    .await;

    let calls_before = engine.detect_calls();
    let err = verifier(&cancelled_stack)
        .verify("0xABC", &frame(LIVE_WIDTH))
        .await
        .unwrap_err();

    assert!(matches!(err, IdentityError::UserCancelled));
    assert_eq!(engine.detect_calls(), calls_before);
}

#[tokio::test]
async fn binding_without_templates_is_no_reference_data() {
    let tmp = tempdir().unwrap();
    let (stack, _engine, ledger) =
        stack_with_reference(tmp.path(), vec![0.0, 0.0], vec![0.1, 0.0]).await;

    // Register a binding by hand, without ever storing a template.
    let credential = stack.credentials.create_credential("0xABC").await.unwrap();
    ledger
        .register_binding(CredentialBinding::new("0xABC", "some-hash", credential))
        .await
        .unwrap();

    let err = verifier(&stack)
        .verify("0xABC", &frame(LIVE_WIDTH))
        .await
        .unwrap_err();

    assert!(matches!(err, IdentityError::NoReferenceData(_)));
}

#[tokio::test]
async fn live_frame_without_a_face_is_retryable() {
    let tmp = tempdir().unwrap();
    let (stack, _engine, _ledger) =
        stack_with_reference(tmp.path(), vec![0.0, 0.0], vec![0.1, 0.0]).await;
    enroll(&stack, "0xABC").await;

    // Width 77 was never scripted: no face in the live frame.
    let err = verifier(&stack)
        .verify("0xABC", &frame(77))
        .await
        .unwrap_err();

    assert!(matches!(err, IdentityError::NoFaceDetected));
    assert!(err.is_retryable());
}
