//! Testing utilities for sragflow pipelines.
//!
//! This module provides:
//! - Mock steps for exercising the sequencer
//! - In-memory fakes of every external collaborator
//! - Record fixtures and load-file writers

mod fakes;
mod fixtures;
mod mocks;

pub use fakes::{
    AuthorCall, MemoryStore, RecordingPlotter, RecordingRenderer, ScriptedAuthor, ScriptedModel,
    StaticNews,
};
pub use fixtures::{record_on, surveillance_records, write_load_file};
pub use mocks::{CallLog, PanickingStep, RecordingStep};
