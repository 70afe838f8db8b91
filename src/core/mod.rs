//! Core domain models
//!
//! Actions and their combinators, steps, stages, pipelines, and the result
//! types produced by a run.

pub mod action;
pub mod context;
pub mod control;
pub mod failure;
pub mod pipeline;
pub mod stage;
pub mod state;
pub mod step;

pub use action::{context, Action, Outcome};
pub use context::{Context, PrefixPolicy};
pub use control::{memo, memo_race, retry};
pub use failure::Failure;
pub use pipeline::{Pipeline, Pipelines};
pub use stage::Stage;
pub use state::{RunReport, RunStat, StepResult};
pub use step::Step;
