//! Pipeline domain model

use crate::core::{Stage, Step};

/// A named, ordered sequence of stages
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// Pipeline name
    pub name: String,

    /// Stages in execution order
    pub stages: Vec<Stage>,
}

impl Pipeline {
    /// Create an empty pipeline
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
        }
    }

    /// Start a new pipeline from a copy of `base`'s stages
    ///
    /// `base` itself is left untouched.
    pub fn create_from(base: &Pipeline, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: base.stages.clone(),
        }
    }

    pub fn add_stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Append a sequential stage
    pub fn sequential(self, step: Step) -> Self {
        self.add_stage(Stage::Sequential(step))
    }

    /// Append a parallel stage
    pub fn parallel(self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.add_stage(Stage::Parallel(steps.into_iter().collect()))
    }

    /// Append a sequential stage that only runs when `condition` holds
    pub fn sequential_if(self, condition: bool, step: Step) -> Self {
        self.add_stage(Stage::SequentialConditional(step, condition))
    }

    /// Append a parallel stage that only runs when `condition` holds
    pub fn parallel_if(self, condition: bool, steps: impl IntoIterator<Item = Step>) -> Self {
        self.add_stage(Stage::ParallelConditional(
            steps.into_iter().collect(),
            condition,
        ))
    }

    /// Append a parallel stage whose steps each carry their own condition
    pub fn parallel_each(self, steps: impl IntoIterator<Item = (Step, Option<bool>)>) -> Self {
        self.add_stage(Stage::ParallelIndividualConditional(
            steps.into_iter().collect(),
        ))
    }

    /// Longest step name across every stage, used to align output prefixes
    pub fn longest_step_name(&self) -> usize {
        self.stages
            .iter()
            .map(Stage::longest_step_name)
            .max()
            .unwrap_or(0)
    }

    /// Total number of declared steps
    pub fn step_count(&self) -> usize {
        self.stages.iter().map(|stage| stage.steps().len()).sum()
    }
}

/// The set of pipelines a build script exposes
#[derive(Debug, Clone, Default)]
pub struct Pipelines {
    pipelines: Vec<Pipeline>,
    default: Option<String>,
}

impl Pipelines {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pipeline
    ///
    /// A later pipeline with the same name replaces the earlier one.
    pub fn add(mut self, pipeline: Pipeline) -> Self {
        self.pipelines.retain(|existing| existing.name != pipeline.name);
        self.pipelines.push(pipeline);
        self
    }

    /// Register a pipeline and run it when no name is given
    pub fn default_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.default = Some(pipeline.name.clone());
        self.add(pipeline)
    }

    /// Find a pipeline by name
    pub fn find(&self, name: &str) -> Option<&Pipeline> {
        self.pipelines.iter().find(|pipeline| pipeline.name == name)
    }

    /// The default pipeline, if one was registered
    pub fn default_target(&self) -> Option<&Pipeline> {
        self.default.as_deref().and_then(|name| self.find(name))
    }

    /// Registered pipeline names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.pipelines.iter().map(|pipeline| pipeline.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }
}
