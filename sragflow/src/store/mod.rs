//! Storage ports.
//!
//! [`RecordSource`] answers aggregation queries for the report pipeline;
//! [`Warehouse`] creates and fills the `influd_data` table for the load
//! pipeline. The PostgreSQL implementation lives behind the `postgres`
//! feature; tests use [`MemoryStore`](crate::testing::MemoryStore).

#[cfg(feature = "postgres")]
mod postgres;

#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;

use crate::errors::StoreError;
use crate::query::{AggregationQuery, BucketRow};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::path::Path;

/// Read side of the store.
#[async_trait]
pub trait RecordSource: Send + Sync + Debug {
    /// Runs one aggregation and returns its buckets.
    async fn aggregate(&self, query: &AggregationQuery) -> Result<Vec<BucketRow>, StoreError>;

    /// Returns true if any record was notified on `date`.
    async fn has_records_on(&self, date: NaiveDate) -> Result<bool, StoreError>;

    /// Returns the most recent notification date, if any record exists.
    async fn latest_record_date(&self) -> Result<Option<NaiveDate>, StoreError>;
}

/// Outcome of [`Warehouse::create_database`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseCreation {
    /// The database was created.
    Created,
    /// The database existed already.
    AlreadyExists,
}

/// Write side of the store.
///
/// Concurrent loads into the same table are not supported.
#[async_trait]
pub trait Warehouse: Send + Sync + Debug {
    /// Creates the target database.
    async fn create_database(&self) -> Result<DatabaseCreation, StoreError>;

    /// Drops and recreates `influd_data` in one transaction.
    async fn recreate_table(&self) -> Result<(), StoreError>;

    /// Loads a semicolon-delimited file atomically, returning the row count.
    async fn bulk_load(&self, path: &Path) -> Result<u64, StoreError>;
}
