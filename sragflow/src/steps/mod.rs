//! Step trait and function-based steps.
//!
//! Steps are the units of work a [`Sequencer`](crate::pipeline::Sequencer)
//! chains together. A step takes the current state and returns it, possibly
//! mutated. It must not fail out-of-band: every error is encoded into the
//! returned state's stage tag.

use crate::core::{PipelineState, StageTag};
use async_trait::async_trait;
use std::fmt::{Debug, Display};

/// Trait for pipeline steps.
#[async_trait]
pub trait Step: Send + Sync + Debug {
    /// Runs the step.
    ///
    /// # Arguments
    ///
    /// * `state` - The state produced by the previous step (or the initial state)
    ///
    /// # Returns
    ///
    /// The state to hand to the branch policy. Failures are reported by
    /// setting `stage` to `error`, never by panicking.
    async fn run(&self, state: PipelineState) -> PipelineState;
}

/// A step backed by a synchronous function.
pub struct FnStep<F>
where
    F: Fn(PipelineState) -> PipelineState + Send + Sync,
{
    label: String,
    func: F,
}

impl<F> FnStep<F>
where
    F: Fn(PipelineState) -> PipelineState + Send + Sync,
{
    /// Creates a new function-based step.
    pub fn new(label: impl Into<String>, func: F) -> Self {
        Self {
            label: label.into(),
            func,
        }
    }
}

impl<F> Debug for FnStep<F>
where
    F: Fn(PipelineState) -> PipelineState + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStep").field("label", &self.label).finish()
    }
}

#[async_trait]
impl<F> Step for FnStep<F>
where
    F: Fn(PipelineState) -> PipelineState + Send + Sync,
{
    async fn run(&self, state: PipelineState) -> PipelineState {
        (self.func)(state)
    }
}

/// Folds a step outcome into the state.
///
/// `Ok(tag)` becomes the new stage; an error sets `error` and records its
/// message. Keys written before the failure are kept.
pub fn settle<E: Display>(state: PipelineState, outcome: Result<StageTag, E>) -> PipelineState {
    match outcome {
        Ok(tag) => state.with_stage(tag),
        Err(err) => state.fail(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::keys;

    #[tokio::test]
    async fn test_fn_step() {
        let step = FnStep::new("tag", |state: PipelineState| state.with_stage("tagged"));

        let out = step.run(PipelineState::new()).await;
        assert_eq!(out.stage, StageTag::milestone("tagged"));
        assert!(format!("{step:?}").contains("tag"));
    }

    #[test]
    fn test_settle() {
        let ok = settle::<String>(PipelineState::new(), Ok(StageTag::milestone("news_inserted")));
        assert_eq!(ok.stage.as_str(), "news_inserted");

        let state = PipelineState::new().with_value(keys::NEWS, serde_json::json!([]));
        let failed = settle(state, Err::<StageTag, _>("search offline"));
        assert!(failed.is_failed());
        assert_eq!(failed.error_message(), Some("search offline"));
        assert!(failed.contains_key(keys::NEWS));
    }
}
