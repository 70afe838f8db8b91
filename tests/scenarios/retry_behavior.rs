//! Test: Retry Behavior - retrying recoverable failures inside a step

use crate::helpers::*;
use stagehand::{retry, Action, Failure, Pipeline, Step};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Fails until the given attempt, then succeeds
fn flaky(calls: &Arc<AtomicU32>, succeed_on: u32, failure: Failure) -> Action<()> {
    let calls = calls.clone();
    Action::new(move |_| {
        let attempt = calls.fetch_add(1, Ordering::SeqCst) + 1;
        let outcome = if attempt >= succeed_on {
            Ok(())
        } else {
            Err(failure.clone())
        };
        async move { outcome }
    })
}

/// Flaky step succeeds within its retry budget
#[tokio::test]
async fn test_retry_until_success() {
    let calls = Arc::new(AtomicU32::new(0));
    let action = flaky(&calls, 3, Failure::recoverable("connection reset")).retry(3);
    let pipeline = Pipeline::new("test").sequential(Step::new("download", action));

    let (report, console) = run_pipeline(&pipeline).await;

    assert_pipeline_succeeded(&report);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(console.contains("Retrying, attempt 2"));
    assert!(console.contains("Retrying, attempt 3"));
    assert!(!console.contains("Retrying, attempt 4"));
}

/// Exhausted retries fail the step with the last failure
#[tokio::test]
async fn test_retry_exhausted() {
    let calls = Arc::new(AtomicU32::new(0));
    let action = retry(2, flaky(&calls, 10, Failure::recoverable("still broken")));
    let pipeline = Pipeline::new("test").sequential(Step::new("download", action));

    let (report, _) = run_pipeline(&pipeline).await;

    assert_pipeline_failed(&report);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    let failure = assert_step_failed(&report, "download");
    assert_eq!(*failure, Failure::recoverable("still broken"));
}

/// Abort is never retried
#[tokio::test]
async fn test_abort_is_not_retried() {
    let calls = Arc::new(AtomicU32::new(0));
    let action = flaky(&calls, 10, Failure::abort("bad configuration")).retry(5);
    let pipeline = Pipeline::new("test").sequential(Step::new("configure", action));

    let (report, console) = run_pipeline(&pipeline).await;

    assert_pipeline_failed(&report);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!console.contains("Retrying"));
    assert!(assert_step_failed(&report, "configure").is_abort());
}

/// Retries inside a parallel stage carry the step prefix
#[tokio::test]
async fn test_retry_notice_is_prefixed_in_parallel() {
    let calls = Arc::new(AtomicU32::new(0));
    let journal = Journal::new();
    let pipeline = Pipeline::new("ci").parallel([
        Step::new("fetch", flaky(&calls, 2, Failure::recoverable("timeout")).retry(2)),
        journal.step("lint"),
    ]);

    let (report, console) = run_pipeline(&pipeline).await;

    assert_pipeline_succeeded(&report);
    assert!(console.contains("fetch | Retrying, attempt 2"));
}

/// A panic ends the step on the first attempt
#[tokio::test]
async fn test_panic_is_not_retried() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let action = Action::<()>::new(move |_| {
        let counter = counter.clone();
        async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 10 {
                panic!("corrupt cache");
            }
            Ok(())
        }
    })
    .retry(3);
    let pipeline = Pipeline::new("test").sequential(Step::new("restore", action));

    let (report, console) = run_pipeline(&pipeline).await;

    assert_pipeline_failed(&report);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!console.contains("Retrying"));
    assert!(matches!(assert_step_failed(&report, "restore"), Failure::Unhandled(_)));
}
