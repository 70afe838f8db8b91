//! Stage - an execution policy over one or more steps

use crate::core::Step;

/// How a group of steps is run
#[derive(Debug, Clone)]
pub enum Stage {
    /// One step on the calling task
    Sequential(Step),
    /// Every step concurrently; the stage waits for all of them
    Parallel(Vec<Step>),
    /// `Sequential` when the condition holds, skipped otherwise
    SequentialConditional(Step, bool),
    /// `Parallel` when the condition holds, skipped otherwise
    ParallelConditional(Vec<Step>, bool),
    /// Parallel batch where each step carries its own optional condition
    ///
    /// A step without a condition always runs.
    ParallelIndividualConditional(Vec<(Step, Option<bool>)>),
}

impl Stage {
    /// Every step declared by the stage, in declaration order
    pub fn steps(&self) -> Vec<&Step> {
        match self {
            Stage::Sequential(step) | Stage::SequentialConditional(step, _) => vec![step],
            Stage::Parallel(steps) | Stage::ParallelConditional(steps, _) => steps.iter().collect(),
            Stage::ParallelIndividualConditional(steps) => {
                steps.iter().map(|(step, _)| step).collect()
            }
        }
    }

    /// Whether the stage runs its steps concurrently
    pub fn is_parallel(&self) -> bool {
        !matches!(
            self,
            Stage::Sequential(_) | Stage::SequentialConditional(..)
        )
    }

    /// Length of the longest step name in the stage
    pub fn longest_step_name(&self) -> usize {
        self.steps()
            .iter()
            .map(|step| step.name.chars().count())
            .max()
            .unwrap_or(0)
    }
}
