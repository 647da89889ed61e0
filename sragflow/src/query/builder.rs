//! Parameterized aggregation statements.

use super::{GroupBy, Metric};
use crate::records::TABLE_NAME;
use chrono::{Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Inclusive date interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First day included.
    pub start: NaiveDate,
    /// Last day included.
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a range.
    #[must_use]
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The `days` days ending at `end`.
    #[must_use]
    pub fn trailing_days(end: NaiveDate, days: i64) -> Self {
        Self::new(end - Duration::days(days), end)
    }

    /// The `months` calendar months ending at `end`.
    #[must_use]
    pub fn trailing_months(end: NaiveDate, months: u32) -> Self {
        let start = end.checked_sub_months(Months::new(months)).unwrap_or(end);
        Self::new(start, end)
    }

    /// The `years` years ending at `end`.
    #[must_use]
    pub fn trailing_years(end: NaiveDate, years: u32) -> Self {
        Self::trailing_months(end, years.saturating_mul(12))
    }

    /// Returns true if `date` falls inside the range.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// A value bound to a statement placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryParam {
    /// Text parameter.
    Text(String),
    /// Date parameter.
    Date(NaiveDate),
}

/// One time-bucketed aggregation over `influd_data`.
///
/// Only allow-listed metrics and units reach the statement text; every
/// caller-supplied value is bound as a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationQuery {
    /// What to count.
    pub metric: Metric,
    /// Bucket unit.
    pub group_by: GroupBy,
    /// Optional inclusive date filter.
    pub range: Option<DateRange>,
}

impl AggregationQuery {
    /// Creates an unfiltered query.
    #[must_use]
    pub fn new(metric: Metric, group_by: GroupBy) -> Self {
        Self {
            metric,
            group_by,
            range: None,
        }
    }

    /// Applies a date filter; it only takes effect when both bounds are given.
    #[must_use]
    pub fn with_range(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.range = match (start, end) {
            (Some(start), Some(end)) => Some(DateRange::new(start, end)),
            _ => None,
        };
        self
    }

    /// Renders the SQL statement.
    #[must_use]
    pub fn sql(&self) -> String {
        let column = self.metric.date_column();
        let values = self
            .metric
            .value_columns()
            .iter()
            .map(|(expr, alias)| format!("{expr} AS {alias}"))
            .collect::<Vec<_>>()
            .join(", ");

        let filter = if self.range.is_some() {
            format!(" WHERE {column} BETWEEN $2 AND $3")
        } else {
            String::new()
        };

        format!(
            "SELECT date_trunc($1, {column}::timestamp)::date AS bucket, {values} \
             FROM {TABLE_NAME}{filter} GROUP BY 1 ORDER BY 1"
        )
    }

    /// Returns the bound parameters in placeholder order.
    #[must_use]
    pub fn params(&self) -> Vec<QueryParam> {
        let mut params = vec![QueryParam::Text(self.group_by.unit().to_string())];
        if let Some(range) = self.range {
            params.push(QueryParam::Date(range.start));
            params.push(QueryParam::Date(range.end));
        }
        params
    }

    /// Returns the result header: bucket label then value columns.
    #[must_use]
    pub fn header(&self) -> Vec<String> {
        std::iter::once(self.group_by.label().to_string())
            .chain(
                self.metric
                    .value_columns()
                    .iter()
                    .map(|(_, alias)| (*alias).to_string()),
            )
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_unbounded_query_has_no_filter() {
        let query = AggregationQuery::new(Metric::Deaths, GroupBy::Year);

        assert!(query.range.is_none());
        assert!(!query.sql().contains("BETWEEN"));
        assert_eq!(query.params(), vec![QueryParam::Text("year".to_string())]);
    }

    #[test]
    fn test_single_bound_is_ignored() {
        let query = AggregationQuery::new(Metric::TotalCases, GroupBy::Day)
            .with_range(Some(date(2024, 8, 1)), None);

        assert!(query.range.is_none());
        assert_eq!(query.params().len(), 1);
    }

    #[test]
    fn test_bounded_query_binds_dates() {
        let query = AggregationQuery::new(Metric::IcuAdmissions, GroupBy::Month)
            .with_range(Some(date(2023, 8, 28)), Some(date(2024, 8, 28)));

        assert_eq!(
            query.sql(),
            "SELECT date_trunc($1, data_entrada_uti::timestamp)::date AS bucket, \
             COUNT(*) FILTER (WHERE internado_uti = 1) AS internacoes_uti \
             FROM influd_data WHERE data_entrada_uti BETWEEN $2 AND $3 GROUP BY 1 ORDER BY 1"
        );
        assert_eq!(
            query.params(),
            vec![
                QueryParam::Text("month".to_string()),
                QueryParam::Date(date(2023, 8, 28)),
                QueryParam::Date(date(2024, 8, 28)),
            ]
        );
    }

    #[test]
    fn test_header_uses_localized_label() {
        let query = AggregationQuery::new(Metric::Vaccinations, GroupBy::Month);
        assert_eq!(query.header(), vec!["mês", "vacinados_covid", "vacinados_gripe"]);
    }

    #[test]
    fn test_trailing_ranges() {
        let end = date(2024, 8, 28);
        assert_eq!(DateRange::trailing_days(end, 30).start, date(2024, 7, 29));
        assert_eq!(DateRange::trailing_months(end, 12).start, date(2023, 8, 28));
        assert_eq!(DateRange::trailing_years(end, 4).start, date(2020, 8, 28));
        assert!(DateRange::trailing_days(end, 30).contains(end));
    }
}
