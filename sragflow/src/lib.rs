//! # Sragflow
//!
//! Stage-tagged pipelines that load Brazilian SRAG (Severe Acute
//! Respiratory Syndrome) surveillance records into PostgreSQL and turn
//! them into a technical report.
//!
//! The crate provides:
//!
//! - **Sequencer**: a linear chain of steps with post-step verification
//!   driven by a stage tag on the pipeline state
//! - **Aggregation queries**: case, death, ICU and vaccination counts
//!   bucketed by day, month or year
//! - **Report generation**: news search, section-by-section analysis,
//!   charts and a rendered document behind swappable collaborator traits
//! - **Load and setup**: database creation, table recreation and bulk load
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sragflow::prelude::*;
//!
//! let pipeline = build_report_pipeline(&deps)?;
//! let state = initial_report_state(report_date, &DEFAULT_SECTIONS)?;
//! let run = pipeline.run(state).await;
//! assert!(!run.failed());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod analysis;
pub mod collaborators;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod load;
pub mod observability;
pub mod pipeline;
pub mod query;
pub mod records;
pub mod report;
pub mod runner;
pub mod steps;
pub mod store;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::analysis::{FinalReport, ReportAuthor, SectionId, DEFAULT_SECTIONS};
    pub use crate::collaborators::{ChartPlotter, LanguageModel, NewsSearch, ReportRenderer};
    pub use crate::config::AppConfig;
    pub use crate::core::{keys, Envelope, PipelineState, StageTag, Transition};
    pub use crate::errors::{
        CollaboratorError, ConfigError, ContractErrorInfo, DateError, PipelineValidationError,
        SragflowError, StateError, StoreError,
    };
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::load::{build_load_pipeline, build_setup_pipeline};
    pub use crate::pipeline::{BranchPolicy, PipelineRun, Sequencer, SequencerBuilder};
    pub use crate::query::{AggregationService, DataRequest, GroupBy, Metric, Table};
    pub use crate::report::{build_report_pipeline, initial_report_state, ReportDeps, ReportPaths};
    pub use crate::steps::Step;
    pub use crate::store::{RecordSource, Warehouse};
}
