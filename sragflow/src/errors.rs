//! Error types for the sragflow pipelines.
//!
//! Library code reports failures through the enums below; only the binary
//! edge collapses them into `anyhow::Error`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for sragflow operations.
#[derive(Debug, Error)]
pub enum SragflowError {
    /// A pipeline validation error occurred.
    #[error("{0}")]
    Validation(#[from] PipelineValidationError),

    /// Reading or writing the pipeline payload failed.
    #[error("{0}")]
    State(#[from] StateError),

    /// A storage operation failed.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// An external collaborator failed.
    #[error("{0}")]
    Collaborator(#[from] CollaboratorError),

    /// Configuration could not be loaded.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// A date argument was rejected.
    #[error("{0}")]
    Date(#[from] DateError),

    /// A step could not produce its output.
    #[error("{0}")]
    Step(String),
}

/// Metadata about a contract error for better diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ContractErrorInfo {
    /// Error code (e.g., "SEQUENCER-001-DUPLICATE").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ContractErrorInfo {
    /// Creates a new contract error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Error raised when a pipeline cannot be assembled.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The error message.
    pub message: String,
    /// The steps involved in the error.
    pub steps: Vec<String>,
    /// Optional contract error info.
    pub error_info: Option<ContractErrorInfo>,
}

impl PipelineValidationError {
    /// Creates a new pipeline validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            steps: Vec::new(),
            error_info: None,
        }
    }

    /// Sets the steps involved.
    #[must_use]
    pub fn with_steps(mut self, steps: Vec<String>) -> Self {
        self.steps = steps;
        self
    }

    /// Sets the contract error info.
    #[must_use]
    pub fn with_error_info(mut self, info: ContractErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }

    /// Returns the contract error code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.error_info.as_ref().map(|info| info.code.as_str())
    }
}

/// Error raised when a payload entry cannot be decoded or encoded.
#[derive(Debug, Error)]
pub enum StateError {
    /// A required payload key is absent.
    #[error("payload key '{0}' is missing")]
    Missing(String),

    /// A payload value does not have the expected shape.
    #[error("payload key '{key}' could not be decoded: {source}")]
    Decode {
        /// The payload key.
        key: String,
        /// The underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// A value could not be serialized into the payload.
    #[error("payload key '{key}' could not be encoded: {source}")]
    Encode {
        /// The payload key.
        key: String,
        /// The underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

/// Error raised by the relational store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store is not configured (e.g., missing server URL).
    #[error("store is not configured: {0}")]
    NotConfigured(String),

    /// The database rejected a statement or the connection failed.
    #[error("database error: {0}")]
    Database(String),

    /// The store holds no records at all.
    #[error("no records available in the store")]
    NoData,

    /// Reading the input file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The input file is malformed.
    #[error("malformed input: {0}")]
    Csv(#[from] csv::Error),
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Error raised by an external collaborator (search, LLM, plotter, renderer).
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// The collaborator is not configured.
    #[error("{collaborator} is unavailable: {reason}")]
    Unavailable {
        /// Collaborator name.
        collaborator: &'static str,
        /// Why it cannot be used.
        reason: String,
    },

    /// A remote service answered with an error or could not be reached.
    #[error("{collaborator} request failed: {message}")]
    Request {
        /// Collaborator name.
        collaborator: &'static str,
        /// Error description.
        message: String,
    },

    /// The collaborator answered with something we cannot use.
    #[error("{collaborator} returned an invalid response: {message}")]
    InvalidResponse {
        /// Collaborator name.
        collaborator: &'static str,
        /// Error description.
        message: String,
    },

    /// An external program exited unsuccessfully.
    #[error("{program} exited with {status}: {stderr}")]
    Process {
        /// Program name.
        program: String,
        /// Exit status description.
        status: String,
        /// Captured standard error.
        stderr: String,
    },

    /// IO error while talking to a collaborator.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CollaboratorError {
    /// Creates an invalid-response error.
    #[must_use]
    pub fn invalid(collaborator: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            collaborator,
            message: message.into(),
        }
    }

    /// Creates a request error.
    #[must_use]
    pub fn request(collaborator: &'static str, message: impl Into<String>) -> Self {
        Self::Request {
            collaborator,
            message: message.into(),
        }
    }
}

/// Error raised when the configuration is invalid.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable holds an unparsable value.
    #[error("invalid value for {key}: {value}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Offending value.
        value: String,
    },

    /// A database identifier is not allowed.
    #[error("invalid database identifier '{0}'")]
    InvalidIdentifier(String),
}

/// Error raised when a report date cannot be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid date format: {input}. Use YYYY-MM-DD or 'today'")]
pub struct DateError {
    /// The rejected input.
    pub input: String,
}
