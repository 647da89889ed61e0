//! Pipeline building and execution.
//!
//! This module provides:
//! - The sequencer builder with step-name validation
//! - The compiled sequencer with verify-and-branch transitions
//! - Branch policies deciding CONTINUE vs END after each step

mod builder;
mod policy;
mod sequencer;

pub use builder::SequencerBuilder;
pub use policy::BranchPolicy;
pub use sequencer::{PipelineRun, Sequencer, Target};
