//! The compiled sequencer: a linear chain of steps with post-step
//! verification and conditional transitions.

use super::BranchPolicy;
use crate::core::{PipelineState, Transition};
use crate::events::{self, EventSink};
use crate::steps::Step;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Where a transition leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The step at this position in declaration order.
    Step(usize),
    /// End of the run.
    Terminal,
}

/// A named step registered in a pipeline.
#[derive(Debug, Clone)]
pub(crate) struct StepSpec {
    pub(crate) name: String,
    pub(crate) step: Arc<dyn Step>,
}

/// Result of one pipeline invocation.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// Identifier used to correlate the run's log lines and events.
    pub run_id: Uuid,
    /// The state returned by the last executed step.
    pub state: PipelineState,
    /// Names of the steps that ran, in order.
    pub executed: Vec<String>,
    /// The step whose verification returned END, if the run stopped early.
    pub halted_at: Option<String>,
    /// Total execution time in milliseconds.
    pub duration_ms: f64,
}

impl PipelineRun {
    /// Returns true when the final stage is `error` or `fatal_error`.
    #[must_use]
    pub fn failed(&self) -> bool {
        self.state.is_failed()
    }
}

/// An immutable, compiled pipeline.
///
/// Built by [`SequencerBuilder::compile`](super::SequencerBuilder::compile).
/// Each call to [`invoke`](Self::invoke) runs the steps strictly one after
/// the other on the caller's task.
pub struct Sequencer {
    name: String,
    steps: Vec<StepSpec>,
    edges: HashMap<(usize, Transition), Target>,
    policy: BranchPolicy,
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for Sequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequencer")
            .field("name", &self.name)
            .field("steps", &self.step_names())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Sequencer {
    pub(crate) fn new(
        name: String,
        steps: Vec<StepSpec>,
        edges: HashMap<(usize, Transition), Target>,
        policy: BranchPolicy,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            name,
            steps,
            edges,
            policy,
            sink,
        }
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the step names in execution order.
    #[must_use]
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|spec| spec.name.as_str()).collect()
    }

    /// Returns the branch policy.
    #[must_use]
    pub fn policy(&self) -> BranchPolicy {
        self.policy
    }

    /// Looks up the transition table.
    ///
    /// Returns `None` if `from` is not a step of this pipeline.
    #[must_use]
    pub fn successor(&self, from: &str, on: Transition) -> Option<Target> {
        let idx = self.steps.iter().position(|spec| spec.name == from)?;
        self.edges.get(&(idx, on)).copied()
    }

    /// Runs the pipeline and returns the final state.
    pub async fn invoke(&self, initial: PipelineState) -> PipelineState {
        self.run(initial).await.state
    }

    /// Runs the pipeline and returns the final state plus an execution trace.
    ///
    /// A step that panics is not recovered: the panic unwinds through this
    /// call.
    pub async fn run(&self, initial: PipelineState) -> PipelineRun {
        let run_id = Uuid::new_v4();
        let start = Instant::now();
        let mut state = initial;
        let mut executed = Vec::with_capacity(self.steps.len());
        let mut halted_at = None;
        let mut cursor = Target::Step(0);

        info!(pipeline = %self.name, run_id = %run_id, steps = self.steps.len(), "Starting pipeline");

        while let Target::Step(idx) = cursor {
            let Some(spec) = self.steps.get(idx) else {
                break;
            };

            self.sink.try_emit(
                events::STEP_STARTED,
                Some(json!({
                    "pipeline": &self.name,
                    "run_id": run_id.to_string(),
                    "step": &spec.name,
                    "stage": state.stage.as_str(),
                })),
            );

            let step_start = Instant::now();
            let span = info_span!("step", pipeline = %self.name, step = %spec.name, run_id = %run_id);
            state = spec.step.run(state).instrument(span).await;
            let step_duration_ms = step_start.elapsed().as_secs_f64() * 1000.0;
            executed.push(spec.name.clone());

            let transition = self.policy.verify(&state);

            self.sink.try_emit(
                events::STEP_COMPLETED,
                Some(json!({
                    "pipeline": &self.name,
                    "run_id": run_id.to_string(),
                    "step": &spec.name,
                    "stage": state.stage.as_str(),
                    "transition": transition,
                    "duration_ms": step_duration_ms,
                })),
            );

            if state.is_failed() {
                warn!(
                    pipeline = %self.name,
                    step = %spec.name,
                    stage = %state.stage,
                    error = state.error_message().unwrap_or("unknown"),
                    "Step failed"
                );
            } else {
                debug!(pipeline = %self.name, step = %spec.name, stage = %state.stage, %transition, "Step finished");
            }

            if transition == Transition::End {
                halted_at = Some(spec.name.clone());
            }
            cursor = self
                .edges
                .get(&(idx, transition))
                .copied()
                .unwrap_or(Target::Terminal);
        }

        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        let event = if halted_at.is_some() {
            events::PIPELINE_HALTED
        } else {
            events::PIPELINE_COMPLETED
        };
        self.sink.try_emit(
            event,
            Some(json!({
                "pipeline": &self.name,
                "run_id": run_id.to_string(),
                "stage": state.stage.as_str(),
                "executed": &executed,
                "halted_at": &halted_at,
                "duration_ms": duration_ms,
            })),
        );
        info!(
            pipeline = %self.name,
            run_id = %run_id,
            stage = %state.stage,
            executed = executed.len(),
            duration_ms,
            "Pipeline finished"
        );

        PipelineRun {
            run_id,
            state,
            executed,
            halted_at,
            duration_ms,
        }
    }
}
