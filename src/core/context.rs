//! Step context - everything an action can see while it runs

use crate::console::{ConsoleSink, Message, Prefix};
use crate::process::ProcessMonitor;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// When console lines get the step prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrefixPolicy {
    /// Always prefix step output
    Always,
    /// Never prefix step output
    Never,
    /// Prefix only while running inside a parallel stage
    #[default]
    Parallel,
}

/// Context for one step invocation
///
/// Created fresh by the engine for every step it starts and never mutated
/// afterwards. Cloning is cheap.
#[derive(Clone)]
pub struct Context {
    pipeline_name: Arc<str>,
    step_name: Arc<str>,
    is_parallel: bool,
    console: Arc<dyn ConsoleSink>,
    prefix: Prefix,
    prefix_policy: PrefixPolicy,
    name_width: usize,
    process_monitor: ProcessMonitor,
    extra_args: Arc<[String]>,
    cancellation: CancellationToken,
}

impl Context {
    /// Context for a sequential invocation of `step_name`
    pub fn new(
        pipeline_name: &str,
        step_name: &str,
        console: Arc<dyn ConsoleSink>,
        process_monitor: ProcessMonitor,
    ) -> Self {
        Self {
            pipeline_name: pipeline_name.into(),
            step_name: step_name.into(),
            is_parallel: false,
            console,
            prefix: Prefix::new(step_name, None),
            prefix_policy: PrefixPolicy::default(),
            name_width: step_name.chars().count(),
            process_monitor,
            extra_args: Arc::from(Vec::new()),
            cancellation: CancellationToken::new(),
        }
    }

    /// Mark the context as belonging to a parallel stage
    pub fn parallel(mut self, is_parallel: bool) -> Self {
        self.is_parallel = is_parallel;
        self
    }

    pub fn with_prefix(mut self, prefix: Prefix) -> Self {
        self.prefix = prefix;
        self
    }

    pub fn with_prefix_policy(mut self, policy: PrefixPolicy) -> Self {
        self.prefix_policy = policy;
        self
    }

    /// Width of the longest step name in the run
    pub fn with_name_width(mut self, name_width: usize) -> Self {
        self.name_width = name_width;
        self
    }

    pub fn with_extra_args(mut self, extra_args: Arc<[String]>) -> Self {
        self.extra_args = extra_args;
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn pipeline_name(&self) -> &str {
        &self.pipeline_name
    }

    pub fn step_name(&self) -> &str {
        &self.step_name
    }

    pub fn is_parallel(&self) -> bool {
        self.is_parallel
    }

    pub fn console(&self) -> &Arc<dyn ConsoleSink> {
        &self.console
    }

    pub fn prefix(&self) -> &Prefix {
        &self.prefix
    }

    pub fn prefix_policy(&self) -> PrefixPolicy {
        self.prefix_policy
    }

    pub fn name_width(&self) -> usize {
        self.name_width
    }

    pub fn process_monitor(&self) -> &ProcessMonitor {
        &self.process_monitor
    }

    /// Arguments passed after `--` on the command line
    pub fn extra_args(&self) -> &[String] {
        &self.extra_args
    }

    /// Cancellation signal of the whole run
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Whether console lines from this context carry the step prefix
    pub fn uses_prefix(&self) -> bool {
        match self.prefix_policy {
            PrefixPolicy::Always => true,
            PrefixPolicy::Never => false,
            PrefixPolicy::Parallel => self.is_parallel,
        }
    }

    /// Write messages, applying the prefix policy
    pub fn write(&self, messages: impl IntoIterator<Item = Message>) {
        let prefix = self.uses_prefix().then(|| self.prefix.clone());
        let messages: Vec<Message> = messages
            .into_iter()
            .map(|message| message.with_prefix(prefix.clone()))
            .collect();
        if !messages.is_empty() {
            self.console.write(&messages);
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("pipeline_name", &self.pipeline_name)
            .field("step_name", &self.step_name)
            .field("is_parallel", &self.is_parallel)
            .field("prefix", &self.prefix)
            .field("prefix_policy", &self.prefix_policy)
            .field("extra_args", &self.extra_args)
            .finish_non_exhaustive()
    }
}
