//! The stage-tagged state threaded through a pipeline run.

use super::StageTag;
use crate::errors::StateError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Well-known payload keys.
pub mod keys {
    /// Requested report date (`YYYY-MM-DD`).
    pub const REPORT_DATE: &str = "report_date";
    /// Date actually used for queries after verification.
    pub const RESOLVED_DATE: &str = "resolved_date";
    /// Present when the requested date was replaced.
    pub const DATE_SUBSTITUTION: &str = "date_substitution";
    /// Ordered list of requested section identifiers.
    pub const SECTIONS: &str = "sections";
    /// Aggregated surveillance data.
    pub const DATA: &str = "data";
    /// News items for the report window.
    pub const NEWS: &str = "news";
    /// Per-section analyses in generation order.
    pub const DRAFTS: &str = "drafts";
    /// The synthesized final report.
    pub const REPORT: &str = "report";
    /// Chart files produced for the report.
    pub const GRAPHICS: &str = "graphics";
    /// Path of the rendered document.
    pub const REPORT_PATH: &str = "report_path";
    /// Number of rows bulk-loaded.
    pub const ROWS_LOADED: &str = "rows_loaded";
    /// Error message written by a failing step.
    pub const ERROR: &str = "error";
}

/// The mutable record passed from step to step.
///
/// `stage` tells the branch policy whether the run may continue; `payload`
/// is a free-form bag of JSON values keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    /// The active status tag.
    #[serde(default)]
    pub stage: StageTag,
    /// Step data.
    #[serde(default)]
    pub payload: Map<String, Value>,
}

impl PipelineState {
    /// Creates a fresh state tagged `start`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a raw payload value.
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }

    /// Returns the raw payload value for a key.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Checks if a payload key exists.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.payload.contains_key(key)
    }

    /// Decodes a payload entry, returning `None` when the key is absent.
    ///
    /// # Errors
    ///
    /// Returns `StateError::Decode` when the stored value has another shape.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StateError> {
        self.payload
            .get(key)
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|source| StateError::Decode {
                    key: key.to_string(),
                    source,
                })
            })
            .transpose()
    }

    /// Decodes a payload entry that must be present.
    ///
    /// # Errors
    ///
    /// Returns `StateError::Missing` or `StateError::Decode`.
    pub fn require<T: DeserializeOwned>(&self, key: &str) -> Result<T, StateError> {
        self.get(key)?
            .ok_or_else(|| StateError::Missing(key.to_string()))
    }

    /// Encodes a value into the payload, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns `StateError::Encode` if the value cannot be serialized.
    pub fn set<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), StateError> {
        let encoded = serde_json::to_value(value).map_err(|source| StateError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.payload.insert(key.to_string(), encoded);
        Ok(())
    }

    /// Sets the stage tag.
    pub fn set_stage(&mut self, stage: impl Into<StageTag>) {
        self.stage = stage.into();
    }

    /// Returns the state with a new stage tag.
    #[must_use]
    pub fn with_stage(mut self, stage: impl Into<StageTag>) -> Self {
        self.set_stage(stage);
        self
    }

    /// Marks the state as failed and records the message under `error`.
    #[must_use]
    pub fn fail(mut self, message: impl Into<String>) -> Self {
        self.stage = StageTag::Error;
        self.payload
            .insert(keys::ERROR.to_string(), Value::String(message.into()));
        self
    }

    /// Returns the recorded error message, if any.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.payload.get(keys::ERROR).and_then(Value::as_str)
    }

    /// Returns true when the tag is `error` or `fatal_error`.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.stage.is_error()
    }
}
