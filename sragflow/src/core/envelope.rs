//! The success/error response envelope shared by collaborators.

use serde::{Deserialize, Serialize};

/// A result tagged `success` or `error`.
///
/// Serializes as `{"status": "success", "response": ...}` or
/// `{"status": "error", "response": "<message>"}`. The payload can only be
/// reached by matching on the variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "response")]
pub enum Envelope<T> {
    /// The call succeeded.
    #[serde(rename = "success")]
    Success(T),
    /// The call failed; carries an explanatory message.
    #[serde(rename = "error")]
    Failure(String),
}

impl<T> Envelope<T> {
    /// Creates a failure envelope.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure(message.into())
    }

    /// Returns true for `Success`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns the status label (`"success"` or `"error"`).
    #[must_use]
    pub fn status(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Failure(_) => "error",
        }
    }

    /// Returns the payload when successful.
    #[must_use]
    pub fn success(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failure(_) => None,
        }
    }

    /// Consumes the envelope, returning the payload when successful.
    #[must_use]
    pub fn into_success(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failure(_) => None,
        }
    }

    /// Maps the payload of a successful envelope.
    #[must_use]
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        match self {
            Self::Success(value) => Envelope::Success(f(value)),
            Self::Failure(message) => Envelope::Failure(message),
        }
    }
}

impl<T, E: std::fmt::Display> From<Result<T, E>> for Envelope<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(err) => Self::Failure(err.to_string()),
        }
    }
}
