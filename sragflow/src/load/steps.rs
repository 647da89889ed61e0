//! Steps of the setup and load pipelines.

use crate::core::{keys, PipelineState, StageTag};
use crate::errors::SragflowError;
use crate::steps::{settle, Step};
use crate::store::{DatabaseCreation, Warehouse};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Creates the target database; an existing one is not an error.
#[derive(Debug)]
pub struct CreateDatabase {
    warehouse: Arc<dyn Warehouse>,
}

impl CreateDatabase {
    /// Creates the step.
    #[must_use]
    pub fn new(warehouse: Arc<dyn Warehouse>) -> Self {
        Self { warehouse }
    }
}

#[async_trait]
impl Step for CreateDatabase {
    async fn run(&self, state: PipelineState) -> PipelineState {
        let outcome = self.warehouse.create_database().await.map(|created| match created {
            DatabaseCreation::Created => StageTag::milestone("database_created"),
            DatabaseCreation::AlreadyExists => StageTag::milestone("database_already_exists"),
        });
        settle(state, outcome)
    }
}

/// Drops and recreates `influd_data`.
#[derive(Debug)]
pub struct CreateTable {
    warehouse: Arc<dyn Warehouse>,
}

impl CreateTable {
    /// Creates the step.
    #[must_use]
    pub fn new(warehouse: Arc<dyn Warehouse>) -> Self {
        Self { warehouse }
    }
}

#[async_trait]
impl Step for CreateTable {
    async fn run(&self, state: PipelineState) -> PipelineState {
        let outcome = self
            .warehouse
            .recreate_table()
            .await
            .map(|()| StageTag::milestone("table_created"));
        settle(state, outcome)
    }
}

/// Bulk-loads the input file in one transaction.
#[derive(Debug)]
pub struct LoadData {
    warehouse: Arc<dyn Warehouse>,
    input: PathBuf,
}

impl LoadData {
    /// Creates the step.
    #[must_use]
    pub fn new(warehouse: Arc<dyn Warehouse>, input: impl Into<PathBuf>) -> Self {
        Self {
            warehouse,
            input: input.into(),
        }
    }

    async fn execute(&self, state: &mut PipelineState) -> Result<StageTag, SragflowError> {
        let rows = self.warehouse.bulk_load(&self.input).await?;
        state.set(keys::ROWS_LOADED, &rows)?;
        info!(rows, input = %self.input.display(), "Data loaded");
        Ok(StageTag::milestone("data_ETL_completed"))
    }
}

#[async_trait]
impl Step for LoadData {
    async fn run(&self, mut state: PipelineState) -> PipelineState {
        let outcome = self.execute(&mut state).await;
        settle(state, outcome)
    }
}
