//! Test: Failure Handling - how step failures are reported

use crate::helpers::*;
use stagehand::{Failure, Pipeline, Step};

/// A panicking step fails the run instead of crashing it
#[tokio::test]
async fn test_panic_is_reported_as_unhandled() {
    let pipeline = Pipeline::new("build").sequential(Step::from_fn("explode", |ctx| async move {
        if ctx.pipeline_name() == "build" {
            panic!("index out of bounds");
        }
        Ok(())
    }));

    let (report, console) = run_pipeline(&pipeline).await;

    assert_pipeline_failed(&report);
    let failure = assert_step_failed(&report, "explode");
    assert_eq!(*failure, Failure::Unhandled("panic: index out of bounds".to_string()));
    assert!(console.contains("index out of bounds"));
}

/// `?` on an anyhow error inside a step becomes an unhandled failure
#[tokio::test]
async fn test_anyhow_errors_propagate() {
    let pipeline = Pipeline::new("build").sequential(Step::from_fn("read", |_| async {
        let manifest: Result<String, anyhow::Error> = Err(anyhow::anyhow!("manifest missing"));
        manifest?;
        Ok::<(), Failure>(())
    }));

    let (report, _) = run_pipeline(&pipeline).await;

    let failure = assert_step_failed(&report, "read");
    assert!(matches!(failure, Failure::Unhandled(message) if message.contains("manifest missing")));
}

/// Every failure message is printed, in order
#[tokio::test]
async fn test_all_failure_messages_are_printed() {
    let journal = Journal::new();
    let failure = Failure::Recoverable(vec![
        "error: unused variable `x`".to_string(),
        "error: aborting due to previous error".to_string(),
    ]);
    let pipeline = Pipeline::new("build").sequential(journal.failing("compile", failure));

    let (report, console) = run_pipeline(&pipeline).await;

    assert_pipeline_failed(&report);
    let lines = console.lines();
    let first = lines.iter().position(|line| line.contains("unused variable"));
    let second = lines.iter().position(|line| line.contains("aborting due to"));
    assert!(first.is_some() && first < second);
}

/// An abort from a parallel step still lets its siblings finish
#[tokio::test]
async fn test_abort_in_parallel_stage() {
    let journal = Journal::new();
    let pipeline = Pipeline::new("ci")
        .parallel([
            journal.failing("guard", Failure::abort("missing credentials")),
            journal.sleeping("compile", std::time::Duration::from_millis(30)),
        ])
        .sequential(journal.step("deploy"));

    let (report, _) = run_pipeline(&pipeline).await;

    assert_pipeline_failed(&report);
    assert!(assert_step_failed(&report, "guard").is_abort());
    assert_step_succeeded(&report, "compile");
    assert_step_not_run(&report, "deploy");
}

/// The summary lists every attempted step with its status
#[tokio::test]
async fn test_summary_lists_steps() {
    let journal = Journal::new();
    let pipeline = Pipeline::new("ci")
        .sequential(journal.step("compile"))
        .sequential_if(false, journal.step("bench"))
        .sequential(journal.failing("test", Failure::recoverable("2 tests failed")));

    let (_, console) = run_pipeline(&pipeline).await;

    assert!(console.contains("Summary: ci"));
    assert!(console.contains("compile  Succeeded"));
    assert!(console.contains("bench    Skipped"));
    assert!(console.contains("test     Failed"));
    assert!(console.contains("Pipeline ci failed"));
}
