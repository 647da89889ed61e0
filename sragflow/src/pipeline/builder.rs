//! Sequencer builder with validation.

use super::sequencer::{Sequencer, StepSpec, Target};
use super::BranchPolicy;
use crate::core::{PipelineState, Transition};
use crate::errors::{ContractErrorInfo, PipelineValidationError};
use crate::events::{EventSink, LoggingEventSink};
use crate::steps::{FnStep, Step};
use std::collections::HashMap;
use std::sync::Arc;

/// Builder for creating a validated [`Sequencer`].
///
/// Steps run in the order they are added.
pub struct SequencerBuilder {
    name: String,
    steps: Vec<StepSpec>,
    policy: BranchPolicy,
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for SequencerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequencerBuilder")
            .field("name", &self.name)
            .field("steps", &self.step_names())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl SequencerBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            policy: BranchPolicy::default(),
            sink: Arc::new(LoggingEventSink::debug()),
        }
    }

    /// Registers a step.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or already registered.
    pub fn add_step(
        mut self,
        name: impl Into<String>,
        step: Arc<dyn Step>,
    ) -> Result<Self, PipelineValidationError> {
        let name = name.into();

        if name.trim().is_empty() {
            return Err(PipelineValidationError::new("Step name cannot be empty")
                .with_error_info(ContractErrorInfo::new(
                    "SEQUENCER-001-EMPTY_NAME",
                    "Steps must have a non-empty name",
                )));
        }

        if self.steps.iter().any(|spec| spec.name == name) {
            return Err(PipelineValidationError::new(format!(
                "Step '{}' is already registered in pipeline '{}'",
                name, self.name
            ))
            .with_steps(vec![name.clone()])
            .with_error_info(
                ContractErrorInfo::new(
                    "SEQUENCER-001-DUPLICATE",
                    format!("Duplicate step name '{name}'"),
                )
                .with_context_entry("pipeline", self.name.clone())
                .with_fix_hint("Step names must be unique within a pipeline."),
            ));
        }

        self.steps.push(StepSpec { name, step });
        Ok(self)
    }

    /// Registers a step backed by a synchronous function.
    ///
    /// # Errors
    ///
    /// Same as [`add_step`](Self::add_step).
    pub fn add_fn_step<F>(self, name: impl Into<String>, func: F) -> Result<Self, PipelineValidationError>
    where
        F: Fn(PipelineState) -> PipelineState + Send + Sync + 'static,
    {
        let name = name.into();
        let step = Arc::new(FnStep::new(name.clone(), func));
        self.add_step(name, step)
    }

    /// Sets the branch policy.
    #[must_use]
    pub fn with_policy(mut self, policy: BranchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the event sink receiving step entry/exit events.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the registered step names in order.
    #[must_use]
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|spec| spec.name.as_str()).collect()
    }

    /// Freezes the graph.
    ///
    /// Wires `CONTINUE` from every step to its successor (the terminal for
    /// the last step) and `END` from every step to the terminal.
    ///
    /// # Errors
    ///
    /// Returns an error if no step was registered.
    pub fn compile(self) -> Result<Sequencer, PipelineValidationError> {
        if self.steps.is_empty() {
            return Err(PipelineValidationError::new(format!(
                "Pipeline '{}' has no steps",
                self.name
            ))
            .with_error_info(
                ContractErrorInfo::new("SEQUENCER-002-EMPTY", "Cannot compile an empty pipeline")
                    .with_fix_hint("Add at least one step before compiling."),
            ));
        }

        let last = self.steps.len() - 1;
        let mut edges = HashMap::with_capacity(self.steps.len() * 2);
        for idx in 0..=last {
            let next = if idx == last {
                Target::Terminal
            } else {
                Target::Step(idx + 1)
            };
            edges.insert((idx, Transition::Continue), next);
            edges.insert((idx, Transition::End), Target::Terminal);
        }

        validate_edges(&self.steps, &edges)?;

        Ok(Sequencer::new(self.name, self.steps, edges, self.policy, self.sink))
    }
}

fn validate_edges(
    steps: &[StepSpec],
    edges: &HashMap<(usize, Transition), Target>,
) -> Result<(), PipelineValidationError> {
    let unwired: Vec<String> = steps
        .iter()
        .enumerate()
        .filter(|(idx, _)| {
            !edges.contains_key(&(*idx, Transition::Continue))
                || !edges.contains_key(&(*idx, Transition::End))
        })
        .map(|(_, spec)| spec.name.clone())
        .collect();

    if unwired.is_empty() {
        return Ok(());
    }

    Err(PipelineValidationError::new(format!(
        "Steps without both CONTINUE and END transitions: {}",
        unwired.join(", ")
    ))
    .with_steps(unwired)
    .with_error_info(ContractErrorInfo::new(
        "SEQUENCER-003-UNWIRED",
        "Every step needs a CONTINUE and an END transition",
    )))
}
