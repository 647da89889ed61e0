//! Mock steps for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::core::{PipelineState, StageTag};
use crate::steps::Step;

/// Shared, ordered record of which steps ran.
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// A step that records calls and sets a configurable stage tag.
#[derive(Debug)]
pub struct RecordingStep {
    label: String,
    tag: StageTag,
    error: Option<String>,
    calls: Mutex<usize>,
    seen: Mutex<Vec<StageTag>>,
    log: Option<CallLog>,
}

impl RecordingStep {
    /// Creates a step that sets `tag` and succeeds.
    #[must_use]
    pub fn new(tag: impl Into<StageTag>) -> Self {
        Self {
            label: String::new(),
            tag: tag.into(),
            error: None,
            calls: Mutex::new(0),
            seen: Mutex::new(Vec::new()),
            log: None,
        }
    }

    /// Creates a step that fails with `error`.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        let mut step = Self::new(StageTag::Error);
        step.error = Some(message.into());
        step
    }

    /// Appends `label` to the shared log on each call.
    #[must_use]
    pub fn logged(mut self, label: impl Into<String>, log: CallLog) -> Self {
        self.label = label.into();
        self.log = Some(log);
        self
    }

    /// Returns the number of times the step ran.
    #[must_use]
    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }

    /// Returns the stage tags this step received, one per call.
    #[must_use]
    pub fn seen_stages(&self) -> Vec<StageTag> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl Step for RecordingStep {
    async fn run(&self, state: PipelineState) -> PipelineState {
        *self.calls.lock() += 1;
        self.seen.lock().push(state.stage.clone());
        if let Some(log) = &self.log {
            log.lock().push(self.label.clone());
        }

        match &self.error {
            Some(message) => state.fail(message.clone()),
            None => state.with_stage(self.tag.clone()),
        }
    }
}

/// A step that panics, modelling a step that forgot to catch its own errors.
#[derive(Debug)]
pub struct PanickingStep {
    message: String,
}

impl PanickingStep {
    /// Creates a panicking step.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl Step for PanickingStep {
    async fn run(&self, _state: PipelineState) -> PipelineState {
        panic!("{}", self.message);
    }
}
