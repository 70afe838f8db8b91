//! Step executor - runs a single step with timing

use crate::core::{Context, Failure, RunStat, Step};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tracing::{debug, error};

/// Run one step and time it
///
/// This is the only place panics from user code are caught; they come back
/// as [`Failure::Unhandled`]. Retries composed inside the action are part of
/// the same measurement.
pub async fn run_step(ctx: Context, step: &Step) -> Result<RunStat, (RunStat, Failure)> {
    debug!("Executing step: {}", step.name);
    let started = Instant::now();

    let outcome = AssertUnwindSafe(step.action.run(ctx)).catch_unwind().await;

    let stat = RunStat {
        step_name: step.name.clone(),
        execution_time: started.elapsed(),
    };

    match outcome {
        Ok(Ok(())) => {
            debug!("Step {} succeeded in {:?}", step.name, stat.execution_time);
            Ok(stat)
        }
        Ok(Err(failure)) => {
            debug!("Step {} failed: {}", step.name, failure);
            Err((stat, failure))
        }
        Err(panic) => {
            let failure = Failure::from_panic(panic);
            error!("Step {} panicked: {}", step.name, failure);
            Err((stat, failure))
        }
    }
}
