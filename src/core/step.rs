//! Step domain model

use crate::core::{Action, Context, Outcome};
use std::future::Future;

/// A named action - the smallest unit a user writes
///
/// Names are for display only and need not be unique.
#[derive(Debug, Clone)]
pub struct Step {
    pub name: String,
    pub action: Action<()>,
}

impl Step {
    pub fn new(name: impl Into<String>, action: Action<()>) -> Self {
        Self {
            name: name.into(),
            action,
        }
    }

    /// Create a step directly from an async closure
    pub fn from_fn<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Outcome<()>> + Send + 'static,
    {
        Self::new(name, Action::new(f))
    }
}
