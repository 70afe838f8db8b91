//! Run results

use crate::core::{Failure, Step};
use chrono::{DateTime, Utc};
use std::time::Duration;
use uuid::Uuid;

/// Timing for one step invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStat {
    pub step_name: String,
    pub execution_time: Duration,
}

/// Outcome of one step within a run
#[derive(Debug, Clone)]
pub enum StepResult {
    Success(Step, RunStat),
    Failed(Step, RunStat, Failure),
    Skipped(Step),
}

impl StepResult {
    pub fn step(&self) -> &Step {
        match self {
            StepResult::Success(step, _) | StepResult::Failed(step, _, _) | StepResult::Skipped(step) => {
                step
            }
        }
    }

    /// Time spent in the step; skips take none
    pub fn execution_time(&self) -> Duration {
        match self {
            StepResult::Success(_, stat) | StepResult::Failed(_, stat, _) => stat.execution_time,
            StepResult::Skipped(_) => Duration::ZERO,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StepResult::Failed(..))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, StepResult::Skipped(_))
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            StepResult::Failed(_, _, failure) => Some(failure),
            _ => None,
        }
    }
}

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Unique id of this run
    pub run_id: Uuid,

    pub pipeline_name: String,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// Results in stage order
    pub results: Vec<StepResult>,
}

impl RunReport {
    pub fn new(pipeline_name: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            pipeline_name: pipeline_name.into(),
            started_at: Utc::now(),
            results: Vec::new(),
        }
    }

    /// Sum of the time spent in every attempted step
    pub fn total_time(&self) -> Duration {
        self.results.iter().map(StepResult::execution_time).sum()
    }

    /// A run succeeds when no step failed
    pub fn is_success(&self) -> bool {
        !self.results.iter().any(StepResult::is_failed)
    }

    /// Process exit code for the run
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    /// Result for the first step called `name`
    pub fn result(&self, name: &str) -> Option<&StepResult> {
        self.results.iter().find(|result| result.step().name == name)
    }
}
