//! Event sinks receiving pipeline lifecycle events.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, Level};

/// Receives lifecycle events from a running pipeline.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emits an event, waiting for the sink if it needs to.
    async fn emit(&self, event_type: &str, data: Option<Value>);

    /// Emits an event without waiting. Sink errors are swallowed.
    fn try_emit(&self, event_type: &str, data: Option<Value>);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event_type: &str, _data: Option<Value>) {}

    fn try_emit(&self, _event_type: &str, _data: Option<Value>) {}
}

/// Writes events as `tracing` records.
///
/// The `pipeline`, `step` and `stage` members of the event data become
/// structured fields; the rest is logged as-is.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Logs at `level`. Anything other than DEBUG logs at INFO.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Logs at DEBUG.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    fn log_event(&self, event_type: &str, data: Option<&Value>) {
        let field = |name: &str| {
            data.and_then(|data| data.get(name))
                .and_then(Value::as_str)
                .unwrap_or("-")
                .to_string()
        };
        let (pipeline, step, stage) = (field("pipeline"), field("step"), field("stage"));

        if self.level == Level::DEBUG {
            debug!(event = event_type, %pipeline, %step, %stage, data = ?data, "Pipeline event");
        } else {
            info!(event = event_type, %pipeline, %step, %stage, "Pipeline event");
        }
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event_type: &str, data: Option<Value>) {
        self.log_event(event_type, data.as_ref());
    }

    fn try_emit(&self, event_type: &str, data: Option<Value>) {
        self.log_event(event_type, data.as_ref());
    }
}

/// One event held by a [`CollectingEventSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    /// Event name, e.g. `step.completed`.
    pub event_type: String,
    /// Event data; `Null` when none was sent.
    pub data: Value,
}

impl RecordedEvent {
    /// The step the event refers to, if any.
    #[must_use]
    pub fn step(&self) -> Option<&str> {
        self.data.get("step").and_then(Value::as_str)
    }

    /// The stage tag carried by the event, if any.
    #[must_use]
    pub fn stage(&self) -> Option<&str> {
        self.data.get("stage").and_then(Value::as_str)
    }
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: Mutex<Vec<RecordedEvent>>,
}

impl CollectingEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all events.
    #[must_use]
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().clone()
    }

    /// Returns the number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns true if nothing was emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Returns the events whose type starts with `type_prefix`.
    #[must_use]
    pub fn events_of_type(&self, type_prefix: &str) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.event_type.starts_with(type_prefix))
            .cloned()
            .collect()
    }

    fn record(&self, event_type: &str, data: Option<Value>) {
        self.events.lock().push(RecordedEvent {
            event_type: event_type.to_string(),
            data: data.unwrap_or(Value::Null),
        });
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event_type: &str, data: Option<Value>) {
        self.record(event_type, data);
    }

    fn try_emit(&self, event_type: &str, data: Option<Value>) {
        self.record(event_type, data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_noop_sink() {
        let sink = NoOpEventSink;
        sink.emit("step.started", None).await;
        sink.try_emit("step.started", Some(json!({"step": "insert_data"})));
    }

    #[test]
    fn test_logging_sink_accepts_partial_data() {
        let sink = LoggingEventSink::debug();
        tokio_test::block_on(sink.emit("step.started", Some(json!({"step": "insert_data"}))));
        LoggingEventSink::default().try_emit("pipeline.completed", None);
    }

    #[tokio::test]
    async fn test_collecting_sink_filter_and_accessors() {
        let sink = CollectingEventSink::new();
        assert!(sink.is_empty());

        sink.emit("step.started", Some(json!({"step": "insert_news", "stage": "start"})))
            .await;
        sink.try_emit("step.completed", Some(json!({"step": "insert_news", "stage": "error"})));
        sink.try_emit("pipeline.halted", None);

        assert_eq!(sink.len(), 3);
        let steps = sink.events_of_type("step.");
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[1].step(), Some("insert_news"));
        assert_eq!(steps[1].stage(), Some("error"));

        let last = &sink.events()[2];
        assert_eq!(last.event_type, "pipeline.halted");
        assert_eq!(last.data, Value::Null);
        assert_eq!(last.step(), None);
    }
}
