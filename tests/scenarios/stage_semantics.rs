//! Test: Stage Semantics - sequential, parallel and conditional stages

use crate::helpers::*;
use stagehand::{Failure, Pipeline, Pipelines, Step};
use std::time::{Duration, Instant};

/// A failing sequential stage stops the pipeline
#[tokio::test]
async fn test_sequential_halts_after_failure() {
    let journal = Journal::new();
    let pipeline = Pipeline::new("build")
        .sequential(journal.step("s1"))
        .sequential(journal.failing("s2", Failure::recoverable("compile error")))
        .sequential(journal.step("s3"));

    let (report, _) = run_pipeline(&pipeline).await;

    assert_pipeline_failed(&report);
    assert_eq!(result_names(&report), vec!["s1", "s2"]);
    assert_step_not_run(&report, "s3");
    assert_eq!(journal.entries(), vec!["s1", "s2"]);
}

/// A false stage condition skips every step of the stage
#[tokio::test]
async fn test_parallel_conditional_false_skips_all() {
    let journal = Journal::new();
    let pipeline = Pipeline::new("build")
        .parallel_if(false, [journal.step("a"), journal.step("b")])
        .sequential(journal.step("after"));

    let (report, _) = run_pipeline(&pipeline).await;

    assert_pipeline_succeeded(&report);
    assert_step_skipped(&report, "a");
    assert_step_skipped(&report, "b");
    assert_step_succeeded(&report, "after");
    assert_eq!(journal.entries(), vec!["after"]);
}

#[tokio::test]
async fn test_sequential_conditional() {
    let journal = Journal::new();
    let pipeline = Pipeline::new("release")
        .sequential_if(true, journal.step("build"))
        .sequential_if(false, journal.step("publish"));

    let (report, _) = run_pipeline(&pipeline).await;

    assert_pipeline_succeeded(&report);
    assert_step_succeeded(&report, "build");
    assert_step_skipped(&report, "publish");
}

/// Per-step conditions: only chosen steps run, results stay in order
#[tokio::test]
async fn test_individual_conditions_keep_declaration_order() {
    let journal = Journal::new();
    let pipeline = Pipeline::new("ci").parallel_each([
        (journal.step("s1"), Some(true)),
        (journal.step("s2"), Some(false)),
        (journal.step("s3"), None),
    ]);

    let (report, _) = run_pipeline(&pipeline).await;

    assert_pipeline_succeeded(&report);
    assert_eq!(result_names(&report), vec!["s1", "s2", "s3"]);
    assert_step_succeeded(&report, "s1");
    assert_step_skipped(&report, "s2");
    assert_step_succeeded(&report, "s3");

    let mut ran = journal.entries();
    ran.sort();
    assert_eq!(ran, vec!["s1", "s3"]);
}

/// Results follow declaration order even when later steps finish first
#[tokio::test]
async fn test_individual_results_ignore_finish_order() {
    let journal = Journal::new();
    let pipeline = Pipeline::new("ci").parallel_each([
        (journal.finishing("s1", Duration::from_millis(100)), Some(true)),
        (journal.finishing("s2", Duration::ZERO), Some(false)),
        (journal.finishing("s3", Duration::ZERO), None),
    ]);

    let (report, _) = run_pipeline(&pipeline).await;

    assert_pipeline_succeeded(&report);
    assert_eq!(journal.entries(), vec!["s3", "s1"]);
    assert_eq!(result_names(&report), vec!["s1", "s2", "s3"]);
    assert_step_skipped(&report, "s2");
}

/// Every step sees the width of the longest step name in the run
#[tokio::test]
async fn test_steps_see_run_wide_name_width() {
    let journal = Journal::new();
    let step = |name: &str| {
        let journal = journal.clone();
        Step::from_fn(name, move |ctx| {
            let journal = journal.clone();
            async move {
                journal.record(&ctx.name_width().to_string());
                Ok(())
            }
        })
    };
    let pipeline = Pipeline::new("build")
        .sequential(step("fmt"))
        .parallel([step("compile"), step("doc")]);

    run_pipeline(&pipeline).await;

    assert_eq!(journal.entries(), vec!["7", "7", "7"]);
}

/// Step timings reach the report
#[tokio::test]
async fn test_end_to_end_timing() {
    let journal = Journal::new();
    let pipeline =
        Pipeline::new("build").sequential(journal.sleeping("wait", Duration::from_millis(80)));

    let (report, console) = run_pipeline(&pipeline).await;

    assert_eq!(report.exit_code(), 0);
    assert!(report.total_time() >= Duration::from_millis(80));
    assert!(console.contains("Pipeline build succeeded"));
}

/// Parallel steps overlap in time
#[tokio::test]
async fn test_parallel_steps_run_concurrently() {
    let journal = Journal::new();
    let delay = Duration::from_millis(200);
    let pipeline = Pipeline::new("ci").parallel([
        journal.sleeping("lint", delay),
        journal.sleeping("compile", delay),
        journal.sleeping("docs", delay),
    ]);

    let started = Instant::now();
    let (report, _) = run_pipeline(&pipeline).await;

    assert_pipeline_succeeded(&report);
    assert!(started.elapsed() < delay * 3);
    assert_eq!(result_names(&report), vec!["lint", "compile", "docs"]);
}

/// A failed parallel stage waits for its siblings, then stops the pipeline
#[tokio::test]
async fn test_parallel_failure_stops_pipeline() {
    let journal = Journal::new();
    let pipeline = Pipeline::new("ci")
        .parallel([
            journal.sleeping("ok", Duration::from_millis(50)),
            journal.failing("failing", Failure::recoverable("tests failed")),
        ])
        .sequential(journal.step("publish"));

    let (report, console) = run_pipeline(&pipeline).await;

    assert_eq!(report.exit_code(), 1);
    assert_eq!(report.results.len(), 2);
    assert_step_succeeded(&report, "ok");
    assert_step_failed(&report, "failing");
    assert_step_not_run(&report, "publish");
    assert!(console.contains("failing | tests failed"));
}

/// Derived pipelines run the base stages first
#[tokio::test]
async fn test_derived_pipeline() {
    let journal = Journal::new();
    let build = Pipeline::new("build").sequential(journal.step("compile"));
    let test = Pipeline::create_from(&build, "test").sequential(journal.step("test"));
    let pipelines = Pipelines::new().default_pipeline(build).add(test);

    let (report, _) = run_pipeline(pipelines.find("test").unwrap()).await;

    assert_pipeline_succeeded(&report);
    assert_eq!(journal.entries(), vec!["compile", "test"]);
    assert_eq!(pipelines.default_target().unwrap().stages.len(), 1);
}

/// Extra arguments are visible to every step
#[tokio::test]
async fn test_extra_args_reach_every_step() {
    let journal = Journal::new();
    let step = |name: &str| {
        let journal = journal.clone();
        Step::from_fn(name, move |ctx| {
            let journal = journal.clone();
            async move {
                journal.record(&ctx.extra_args().join(" "));
                Ok(())
            }
        })
    };
    let pipeline = Pipeline::new("test").parallel([step("unit"), step("doc")]);

    run_pipeline_with(
        &pipeline,
        Default::default(),
        vec!["--nocapture".to_string()],
    )
    .await;

    assert_eq!(journal.entries(), vec!["--nocapture", "--nocapture"]);
}

/// Two sequential sleeps add up in the reported total
#[tokio::test]
async fn test_sequential_times_add_up() {
    let journal = Journal::new();
    let pipeline = Pipeline::new("build")
        .sequential(journal.sleeping("first", Duration::from_millis(50)))
        .sequential(journal.sleeping("second", Duration::from_millis(30)));

    let (report, _) = run_pipeline(&pipeline).await;

    assert_eq!(report.exit_code(), 0);
    assert!(report.total_time() >= Duration::from_millis(80));
}

/// `[ok, failing]` exits 1 with both results recorded
#[tokio::test]
async fn test_ok_then_failing() {
    let journal = Journal::new();
    let pipeline = Pipeline::new("build")
        .sequential(journal.step("ok"))
        .sequential(journal.failing("failing", Failure::recoverable("boom")));

    let (report, _) = run_pipeline(&pipeline).await;

    assert_eq!(report.exit_code(), 1);
    assert_eq!(report.results.len(), 2);
    assert!(report.results[1].is_failed());
}
