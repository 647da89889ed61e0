//! Stage tags and the transitions they map to.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The status tag carried by a [`PipelineState`](super::PipelineState).
///
/// Besides the well-known tags, steps may report a named success milestone
/// (e.g. `database_created`). Serialized as a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StageTag {
    /// Initial tag of a fresh run.
    Start,
    /// Generic success.
    Success,
    /// Normal completion signalled before the last declared step.
    End,
    /// A step failed; downstream steps must not run.
    Error,
    /// An unrecoverable failure.
    FatalError,
    /// A step-specific success milestone.
    Milestone(String),
}

impl Default for StageTag {
    fn default() -> Self {
        Self::Start
    }
}

impl StageTag {
    /// Creates a milestone tag.
    #[must_use]
    pub fn milestone(name: impl Into<String>) -> Self {
        Self::from(name.into())
    }

    /// Returns the string form of the tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Start => "start",
            Self::Success => "success",
            Self::End => "end",
            Self::Error => "error",
            Self::FatalError => "fatal_error",
            Self::Milestone(name) => name,
        }
    }

    /// Returns true for `error` and `fatal_error`.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error | Self::FatalError)
    }
}

impl fmt::Display for StageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for StageTag {
    fn from(value: String) -> Self {
        match value.as_str() {
            "start" => Self::Start,
            "success" => Self::Success,
            "end" => Self::End,
            "error" => Self::Error,
            "fatal_error" => Self::FatalError,
            _ => Self::Milestone(value),
        }
    }
}

impl From<&str> for StageTag {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<StageTag> for String {
    fn from(tag: StageTag) -> Self {
        match tag {
            StageTag::Milestone(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

/// Outcome label of the verification that follows every step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Transition {
    /// Proceed to the next declared step (or finish after the last one).
    Continue,
    /// Stop the run and return the current state.
    End,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continue => write!(f, "CONTINUE"),
            Self::End => write!(f, "END"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_tags_round_trip_through_strings() {
        for raw in ["start", "success", "end", "error", "fatal_error"] {
            let tag = StageTag::from(raw);
            assert!(!matches!(tag, StageTag::Milestone(_)), "{raw} parsed as milestone");
            assert_eq!(tag.to_string(), raw);
        }
    }

    #[test]
    fn test_milestone_tag() {
        let tag = StageTag::milestone("database_already_exists");
        assert_eq!(tag, StageTag::Milestone("database_already_exists".to_string()));
        assert_eq!(tag.as_str(), "database_already_exists");
        assert!(!tag.is_error());
    }

    #[test]
    fn test_error_tags() {
        assert!(StageTag::Error.is_error());
        assert!(StageTag::FatalError.is_error());
        assert!(!StageTag::End.is_error());
        assert!(!StageTag::Start.is_error());
    }

    #[test]
    fn test_stage_tag_serialize() {
        let json = serde_json::to_string(&StageTag::FatalError).unwrap();
        assert_eq!(json, r#""fatal_error""#);

        let tag: StageTag = serde_json::from_str(r#""table_created""#).unwrap();
        assert_eq!(tag, StageTag::milestone("table_created"));
    }

    #[test]
    fn test_transition_display() {
        assert_eq!(Transition::Continue.to_string(), "CONTINUE");
        assert_eq!(Transition::End.to_string(), "END");
        assert_eq!(serde_json::to_string(&Transition::End).unwrap(), r#""END""#);
    }
}
