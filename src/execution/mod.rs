//! Pipeline execution engine

pub mod engine;
pub mod executor;
pub mod summary;

pub use engine::ExecutionEngine;
pub use executor::run_step;
