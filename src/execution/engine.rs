//! Main execution engine - walks a pipeline's stages and runs its steps

use crate::{
    console::{prefix_color, ConsoleSink, Message, Prefix, Style},
    core::{Context, Failure, Pipeline, PrefixPolicy, RunReport, RunStat, Stage, Step, StepResult},
    execution::{executor::run_step, summary},
    process::ProcessMonitor,
};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Everything shared by the steps of one run
struct RunScope {
    pipeline_name: String,
    name_width: usize,
    monitor: ProcessMonitor,
    extra_args: Arc<[String]>,
    cancellation: CancellationToken,
}

/// Runs pipelines
pub struct ExecutionEngine {
    console: Arc<dyn ConsoleSink>,
    prefix_policy: PrefixPolicy,
}

impl ExecutionEngine {
    pub fn new(console: Arc<dyn ConsoleSink>) -> Self {
        Self {
            console,
            prefix_policy: PrefixPolicy::default(),
        }
    }

    pub fn with_prefix_policy(mut self, prefix_policy: PrefixPolicy) -> Self {
        self.prefix_policy = prefix_policy;
        self
    }

    /// Run `pipeline` to completion or first failure
    ///
    /// Firing `cancellation` kills every process spawned through the run's
    /// process monitor. The summary is printed before returning.
    pub async fn run(
        &self,
        pipeline: &Pipeline,
        cancellation: CancellationToken,
        extra_args: Vec<String>,
    ) -> RunReport {
        let mut report = RunReport::new(&pipeline.name);
        info!(
            "Starting pipeline execution: {} ({})",
            pipeline.name, report.run_id
        );

        let scope = RunScope {
            pipeline_name: pipeline.name.clone(),
            name_width: pipeline.longest_step_name(),
            monitor: ProcessMonitor::start(),
            extra_args: Arc::from(extra_args),
            cancellation,
        };
        let finished = CancellationToken::new();
        let watcher = watch_cancellation(&scope, finished.clone());

        for stage in &pipeline.stages {
            let (results, keep_going) = self.run_stage(&scope, stage).await;
            report.results.extend(results);
            if !keep_going {
                break;
            }
        }

        finished.cancel();
        if let Err(e) = watcher.await {
            warn!("cancellation watcher ended abnormally: {}", e);
        }
        if let Err(e) = scope.monitor.shutdown().await {
            warn!("process monitor was already stopped: {}", e);
        }

        info!(
            "Pipeline execution finished: {} - {}",
            pipeline.name,
            if report.is_success() { "succeeded" } else { "failed" }
        );
        summary::print(self.console.as_ref(), &report);

        report
    }

    /// Run one stage; the flag says whether the pipeline continues
    async fn run_stage(&self, scope: &RunScope, stage: &Stage) -> (Vec<StepResult>, bool) {
        match stage {
            Stage::Sequential(step) => self.run_sequential(scope, step).await,
            Stage::Parallel(steps) => self.run_parallel(scope, steps).await,
            Stage::SequentialConditional(step, condition) => {
                if *condition {
                    self.run_sequential(scope, step).await
                } else {
                    (self.skip([step]), true)
                }
            }
            Stage::ParallelConditional(steps, condition) => {
                if *condition {
                    self.run_parallel(scope, steps).await
                } else {
                    (self.skip(steps), true)
                }
            }
            Stage::ParallelIndividualConditional(steps) => {
                self.run_individually_conditional(scope, steps).await
            }
        }
    }

    fn skip<'a>(&self, steps: impl IntoIterator<Item = &'a Step>) -> Vec<StepResult> {
        steps.into_iter().map(|step| self.skip_one(step)).collect()
    }

    fn skip_one(&self, step: &Step) -> StepResult {
        debug!("Skipping step: {}", step.name);
        self.console.write(&[
            Message::verbose("Skipping: ").styled(step.name.clone(), Style::new().dim())
        ]);
        StepResult::Skipped(step.clone())
    }

    /// Results for a stage that never started because the run was cancelled
    fn cancelled(&self, steps: &[Step]) -> (Vec<StepResult>, bool) {
        warn!("Run cancelled before stage started");
        self.console.write(&[Message::error("Pipeline cancelled")]);
        let results = steps
            .iter()
            .map(|step| {
                let stat = RunStat {
                    step_name: step.name.clone(),
                    execution_time: Duration::ZERO,
                };
                StepResult::Failed(step.clone(), stat, Failure::abort("Pipeline cancelled"))
            })
            .collect();
        (results, false)
    }

    fn context(&self, scope: &RunScope, step: &Step, is_parallel: bool) -> Context {
        let text = format!("{:<width$}", step.name, width = scope.name_width);
        let color = is_parallel.then(|| prefix_color(&step.name));

        Context::new(
            &scope.pipeline_name,
            &step.name,
            self.console.clone(),
            scope.monitor.clone(),
        )
        .parallel(is_parallel)
        .with_prefix(Prefix::new(text, color))
        .with_prefix_policy(self.prefix_policy)
        .with_name_width(scope.name_width)
        .with_extra_args(scope.extra_args.clone())
        .with_cancellation(scope.cancellation.clone())
    }

    async fn run_sequential(&self, scope: &RunScope, step: &Step) -> (Vec<StepResult>, bool) {
        if scope.cancellation.is_cancelled() {
            return self.cancelled(std::slice::from_ref(step));
        }

        self.console.write(&[Message::info("Step: ")
            .styled(step.name.clone(), Style::new().bold())]);

        let ctx = self.context(scope, step, false);
        match run_step(ctx.clone(), step).await {
            Ok(stat) => (vec![StepResult::Success(step.clone(), stat)], true),
            Err((stat, failure)) => {
                ctx.write(failure.to_console());
                (vec![StepResult::Failed(step.clone(), stat, failure)], false)
            }
        }
    }

    /// Run every step concurrently and wait for all of them
    ///
    /// Siblings keep running after one fails. Results keep declaration order.
    async fn run_parallel(&self, scope: &RunScope, steps: &[Step]) -> (Vec<StepResult>, bool) {
        if steps.is_empty() {
            return (Vec::new(), true);
        }
        if scope.cancellation.is_cancelled() {
            return self.cancelled(steps);
        }

        let names: Vec<&str> = steps.iter().map(|step| step.name.as_str()).collect();
        self.console.write(&[Message::info("Parallel: ")
            .styled(names.join(", "), Style::new().bold())]);

        let handles: Vec<JoinHandle<Result<RunStat, (RunStat, Failure)>>> = steps
            .iter()
            .map(|step| {
                let ctx = self.context(scope, step, true);
                let step = step.clone();
                tokio::spawn(async move {
                    let outcome = run_step(ctx.clone(), &step).await;
                    if let Err((_, failure)) = &outcome {
                        ctx.write(failure.to_console());
                    }
                    outcome
                })
            })
            .collect();

        let results: Vec<StepResult> = steps
            .iter()
            .zip(join_all(handles).await)
            .map(|(step, joined)| match joined {
                Ok(Ok(stat)) => StepResult::Success(step.clone(), stat),
                Ok(Err((stat, failure))) => StepResult::Failed(step.clone(), stat, failure),
                Err(e) => {
                    let stat = RunStat {
                        step_name: step.name.clone(),
                        execution_time: Duration::ZERO,
                    };
                    StepResult::Failed(step.clone(), stat, Failure::Unhandled(e.to_string()))
                }
            })
            .collect();

        let keep_going = !results.iter().any(StepResult::is_failed);
        (results, keep_going)
    }

    /// Evaluate each step's condition, run the chosen ones as one parallel
    /// batch and report them together with the skipped ones in declaration
    /// order
    async fn run_individually_conditional(
        &self,
        scope: &RunScope,
        steps: &[(Step, Option<bool>)],
    ) -> (Vec<StepResult>, bool) {
        let mut ordered: Vec<(usize, StepResult)> = Vec::with_capacity(steps.len());
        let mut run: Vec<(usize, Step)> = Vec::new();
        for (index, (step, condition)) in steps.iter().enumerate() {
            if condition.unwrap_or(true) {
                run.push((index, step.clone()));
            } else {
                ordered.push((index, self.skip_one(step)));
            }
        }

        let (indices, run_steps): (Vec<usize>, Vec<Step>) = run.into_iter().unzip();
        let (results, keep_going) = self.run_parallel(scope, &run_steps).await;
        ordered.extend(indices.into_iter().zip(results));

        ordered.sort_by_key(|(index, _)| *index);
        (ordered.into_iter().map(|(_, result)| result).collect(), keep_going)
    }
}

/// Kill every tracked process when the run is cancelled
fn watch_cancellation(scope: &RunScope, finished: CancellationToken) -> JoinHandle<()> {
    let cancellation = scope.cancellation.clone();
    let monitor = scope.monitor.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = cancellation.cancelled() => {
                warn!("Cancellation requested, killing running processes");
                if let Err(e) = monitor.kill_all().await {
                    warn!("could not kill running processes: {}", e);
                }
            }
            _ = finished.cancelled() => {}
        }
    })
}
