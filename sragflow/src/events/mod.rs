//! Event sink system for pipeline observability.
//!
//! The sequencer publishes step entry/exit and run completion events through
//! an [`EventSink`]. Sinks are injected per pipeline; there is no global sink.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, RecordedEvent};

/// Event emitted before a step runs.
pub const STEP_STARTED: &str = "step.started";
/// Event emitted after a step returned and its transition was evaluated.
pub const STEP_COMPLETED: &str = "step.completed";
/// Event emitted when a run reached the terminal after its last step.
pub const PIPELINE_COMPLETED: &str = "pipeline.completed";
/// Event emitted when a run stopped early.
pub const PIPELINE_HALTED: &str = "pipeline.halted";
