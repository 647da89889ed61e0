//! Surveillance data gathered for one report.

use super::DataSlice;
use crate::core::Envelope;
use crate::query::{MetricTables, Table};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// The three aggregations a report is written from.
///
/// A failed aggregation is stored empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportData {
    /// Every metric grouped by year over the trailing four years.
    #[serde(default)]
    pub all_years: MetricTables,
    /// Daily cases over the trailing 30 days.
    #[serde(default)]
    pub monthly: Table,
    /// Monthly cases over the trailing 12 months.
    #[serde(default)]
    pub one_year_interval: Table,
}

impl ReportData {
    /// Returns the part of the data a section is written from.
    #[must_use]
    pub fn view(&self, slice: DataSlice) -> DataView<'_> {
        match slice {
            DataSlice::Full => DataView::Full(&self.all_years),
            DataSlice::Daily => DataView::Daily(&self.monthly),
            DataSlice::Monthly => DataView::Monthly(&self.one_year_interval),
        }
    }
}

/// A borrowed slice of [`ReportData`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DataView<'a> {
    /// Every metric.
    Full(&'a MetricTables),
    /// Last 30 days, by day.
    Daily(&'a Table),
    /// Last 12 months, by month.
    Monthly(&'a Table),
}

impl DataView<'_> {
    /// Which slice this is.
    #[must_use]
    pub fn slice(&self) -> DataSlice {
        match self {
            Self::Full(_) => DataSlice::Full,
            Self::Daily(_) => DataSlice::Daily,
            Self::Monthly(_) => DataSlice::Monthly,
        }
    }

    /// Renders the data as CSV blocks for a prompt.
    #[must_use]
    pub fn to_prompt_text(&self) -> String {
        match self {
            Self::Full(tables) => {
                let mut text = String::new();
                for (metric, table) in *tables {
                    let _ = writeln!(text, "### {metric}");
                    match table {
                        Envelope::Success(table) => text.push_str(&table_text(table)),
                        Envelope::Failure(message) => {
                            let _ = writeln!(text, "(unavailable: {message})");
                        }
                    }
                }
                text
            }
            Self::Daily(table) | Self::Monthly(table) => table_text(table),
        }
    }
}

fn table_text(table: &Table) -> String {
    if table.is_empty() {
        return "(no data)\n".to_string();
    }
    table.to_csv().unwrap_or_default()
}
