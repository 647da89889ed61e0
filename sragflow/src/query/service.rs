//! Aggregation fetchers returning enveloped tables.

use super::{AggregationQuery, DataRequest, GroupBy, Metric, Table};
use crate::core::Envelope;
use crate::store::RecordSource;
use chrono::NaiveDate;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Per-metric results of an `all` fetch.
pub type MetricTables = BTreeMap<Metric, Envelope<Table>>;

/// What a dispatched fetch returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AggregationPayload {
    /// Every metric, keyed by name.
    All(MetricTables),
    /// A single metric.
    Single(Table),
}

/// Runs aggregation queries against a [`RecordSource`].
#[derive(Debug, Clone)]
pub struct AggregationService {
    source: Arc<dyn RecordSource>,
}

impl AggregationService {
    /// Creates a service over a record source.
    #[must_use]
    pub fn new(source: Arc<dyn RecordSource>) -> Self {
        Self { source }
    }

    /// Fetches one table.
    ///
    /// A failing query yields an `error` envelope with a placeholder message.
    pub async fn fetch(&self, query: AggregationQuery) -> Envelope<Table> {
        match self.source.aggregate(&query).await {
            Ok(rows) => {
                debug!(metric = %query.metric, rows = rows.len(), "Aggregation fetched");
                Envelope::Success(Table::new(query.header(), rows))
            }
            Err(err) => {
                warn!(metric = %query.metric, error = %err, "Aggregation failed");
                Envelope::failure(format!("Could not fetch {} data: {err}", query.metric))
            }
        }
    }

    /// Fetches every metric with the same grouping and range.
    ///
    /// Returns `error` only when every metric failed; otherwise failed
    /// metrics keep their placeholder envelope.
    pub async fn fetch_all(
        &self,
        group_by: GroupBy,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Envelope<MetricTables> {
        let fetches = Metric::ALL.into_iter().map(|metric| async move {
            let query = AggregationQuery::new(metric, group_by).with_range(start, end);
            (metric, self.fetch(query).await)
        });
        let tables: MetricTables = join_all(fetches).await.into_iter().collect();

        if tables.values().all(|table| !table.is_success()) {
            return Envelope::failure("Could not fetch any metric");
        }
        Envelope::Success(tables)
    }

    /// Fetches by dispatch key: a metric name or `all`.
    pub async fn dispatch(
        &self,
        key: &str,
        group_by: GroupBy,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Envelope<AggregationPayload> {
        match key.parse::<DataRequest>() {
            Ok(DataRequest::All) => self
                .fetch_all(group_by, start, end)
                .await
                .map(AggregationPayload::All),
            Ok(DataRequest::Metric(metric)) => self
                .fetch(AggregationQuery::new(metric, group_by).with_range(start, end))
                .await
                .map(AggregationPayload::Single),
            Err(message) => Envelope::failure(message),
        }
    }
}
