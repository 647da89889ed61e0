//! Core domain model types for sragflow.
//!
//! This module contains the fundamental types threaded through every pipeline:
//! - The stage tag carried by the state and the transition it maps to
//! - The stage-tagged pipeline state with its payload bag
//! - The success/error response envelope

mod envelope;
mod state;
mod status;

pub use envelope::Envelope;
pub use state::{keys, PipelineState};
pub use status::{StageTag, Transition};
