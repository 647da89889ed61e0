//! Aggregation query layer.
//!
//! Builds time-bucketed summaries of the surveillance records:
//! - [`Metric`] and [`GroupBy`] allow-list what can be counted and how
//! - [`AggregationQuery`] renders a parameterized statement
//! - [`AggregationService`] runs queries through a [`RecordSource`](crate::store::RecordSource)
//!   and wraps the outcome in an [`Envelope`](crate::core::Envelope)

mod builder;
mod metric;
mod service;
mod table;

pub use builder::{AggregationQuery, DateRange, QueryParam};
pub use metric::{DataRequest, GroupBy, Metric};
pub use service::{AggregationPayload, AggregationService, MetricTables};
pub use table::{BucketRow, Table};
