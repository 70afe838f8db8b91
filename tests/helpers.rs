//! Test utility functions for stagehand scenarios

#![allow(dead_code)]

use stagehand::{
    Action, ExecutionEngine, Failure, MemoryConsole, Pipeline, RunReport, Step, StepResult,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Records the order in which steps start
#[derive(Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: &str) {
        self.entries.lock().unwrap().push(entry.to_string());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    /// Step that records its name and succeeds
    pub fn step(&self, name: &str) -> Step {
        self.sleeping(name, Duration::ZERO)
    }

    /// Step that records its name, sleeps, then succeeds
    pub fn sleeping(&self, name: &str, delay: Duration) -> Step {
        let journal = self.clone();
        let entry = name.to_string();
        Step::from_fn(name, move |_| {
            let journal = journal.clone();
            let entry = entry.clone();
            async move {
                journal.record(&entry);
                tokio::time::sleep(delay).await;
                Ok(())
            }
        })
    }

    /// Step that sleeps, then records its name and succeeds
    pub fn finishing(&self, name: &str, delay: Duration) -> Step {
        let journal = self.clone();
        let entry = name.to_string();
        Step::from_fn(name, move |_| {
            let journal = journal.clone();
            let entry = entry.clone();
            async move {
                tokio::time::sleep(delay).await;
                journal.record(&entry);
                Ok(())
            }
        })
    }

    /// Step that records its name and fails with `failure`
    pub fn failing(&self, name: &str, failure: Failure) -> Step {
        let journal = self.clone();
        let entry = name.to_string();
        let action = Action::<()>::new(move |_| {
            journal.record(&entry);
            let failure = failure.clone();
            async move { Err(failure) }
        });
        Step::new(name, action)
    }
}

/// Run a pipeline against an in-memory console
pub async fn run_pipeline(pipeline: &Pipeline) -> (RunReport, Arc<MemoryConsole>) {
    run_pipeline_with(pipeline, CancellationToken::new(), Vec::new()).await
}

pub async fn run_pipeline_with(
    pipeline: &Pipeline,
    cancellation: CancellationToken,
    extra_args: Vec<String>,
) -> (RunReport, Arc<MemoryConsole>) {
    let console = Arc::new(MemoryConsole::new());
    let report = ExecutionEngine::new(console.clone())
        .run(pipeline, cancellation, extra_args)
        .await;
    (report, console)
}

/// Step names in result order
pub fn result_names(report: &RunReport) -> Vec<String> {
    report
        .results
        .iter()
        .map(|result| result.step().name.clone())
        .collect()
}

fn find<'a>(report: &'a RunReport, name: &str) -> &'a StepResult {
    report
        .result(name)
        .unwrap_or_else(|| panic!("no result for step '{}'", name))
}

/// Assert that the run succeeded
pub fn assert_pipeline_succeeded(report: &RunReport) {
    assert!(
        report.is_success(),
        "expected pipeline to succeed, results: {:?}",
        result_names(report)
    );
    assert_eq!(report.exit_code(), 0);
}

/// Assert that the run failed
pub fn assert_pipeline_failed(report: &RunReport) {
    assert!(!report.is_success(), "expected pipeline to fail");
    assert_eq!(report.exit_code(), 1);
}

pub fn assert_step_succeeded(report: &RunReport, name: &str) {
    assert!(
        matches!(find(report, name), StepResult::Success(..)),
        "expected step '{}' to succeed",
        name
    );
}

pub fn assert_step_skipped(report: &RunReport, name: &str) {
    assert!(find(report, name).is_skipped(), "expected step '{}' to be skipped", name);
}

/// Assert that a step failed and return its failure
pub fn assert_step_failed<'a>(report: &'a RunReport, name: &str) -> &'a Failure {
    find(report, name)
        .failure()
        .unwrap_or_else(|| panic!("expected step '{}' to fail", name))
}

/// Assert that no result was recorded for a step
pub fn assert_step_not_run(report: &RunReport, name: &str) {
    assert!(report.result(name).is_none(), "step '{}' should not have run", name);
}
