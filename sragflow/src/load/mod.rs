//! The setup and load pipelines.
//!
//! Setup: `create_database → create_table`.
//! Load: `create_database → create_table → insert_data`.

mod steps;

pub use steps::{CreateDatabase, CreateTable, LoadData};

use crate::errors::PipelineValidationError;
use crate::pipeline::{Sequencer, SequencerBuilder};
use crate::store::Warehouse;
use std::path::PathBuf;
use std::sync::Arc;

/// Name of the setup pipeline.
pub const SETUP_PIPELINE: &str = "setup";

/// Name of the load pipeline.
pub const LOAD_PIPELINE: &str = "load";

fn schema_steps(
    name: &str,
    warehouse: &Arc<dyn Warehouse>,
) -> Result<SequencerBuilder, PipelineValidationError> {
    SequencerBuilder::new(name)
        .add_step("create_database", Arc::new(CreateDatabase::new(warehouse.clone())))?
        .add_step("create_table", Arc::new(CreateTable::new(warehouse.clone())))
}

/// Registers the setup steps on a builder.
///
/// # Errors
///
/// Returns an error if step registration fails.
pub fn setup_pipeline(warehouse: &Arc<dyn Warehouse>) -> Result<SequencerBuilder, PipelineValidationError> {
    schema_steps(SETUP_PIPELINE, warehouse)
}

/// Registers the load steps on a builder.
///
/// # Errors
///
/// Returns an error if step registration fails.
pub fn load_pipeline(
    warehouse: &Arc<dyn Warehouse>,
    input: impl Into<PathBuf>,
) -> Result<SequencerBuilder, PipelineValidationError> {
    schema_steps(LOAD_PIPELINE, warehouse)?
        .add_step("insert_data", Arc::new(LoadData::new(warehouse.clone(), input)))
}

/// Builds and compiles the setup pipeline.
///
/// # Errors
///
/// Returns an error if the pipeline cannot be compiled.
pub fn build_setup_pipeline(warehouse: &Arc<dyn Warehouse>) -> Result<Sequencer, PipelineValidationError> {
    setup_pipeline(warehouse)?.compile()
}

/// Builds and compiles the load pipeline.
///
/// # Errors
///
/// Returns an error if the pipeline cannot be compiled.
pub fn build_load_pipeline(
    warehouse: &Arc<dyn Warehouse>,
    input: impl Into<PathBuf>,
) -> Result<Sequencer, PipelineValidationError> {
    load_pipeline(warehouse, input)?.compile()
}
