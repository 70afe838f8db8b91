//! stagehand - build and task pipelines written as Rust programs
//!
//! A pipeline is an ordered list of stages; each stage runs one or more
//! [`Step`]s, sequentially or in parallel. Steps wrap [`Action`]s, which
//! compose with `map`, `bind`, `zip`, [`retry`], [`memo`] and [`memo_race`].

pub mod cli;
pub mod console;
pub mod core;
pub mod execution;
pub mod process;

// Re-export commonly used types
pub use crate::cli::{run_with_args, Cli, DriverError};
pub use crate::console::{ConsoleSink, MemoryConsole, Message, TerminalConsole, Verbosity};
pub use crate::core::{context, memo, memo_race, retry};
pub use crate::core::{Action, Context, Failure, Outcome, Pipeline, Pipelines, Stage, Step};
pub use crate::core::{PrefixPolicy, RunReport, RunStat, StepResult};
pub use crate::execution::ExecutionEngine;
pub use crate::process::{Cmd, ExitCodeCheck, ProcessMonitor, ProcessResult, Redirect};
