//! Tabular aggregation results.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One bucket of an aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketRow {
    /// Start of the bucket.
    pub bucket: NaiveDate,
    /// Display label (`2024-08-28`, `2024-08`, `2024`).
    pub label: String,
    /// One count per value column.
    pub counts: Vec<i64>,
}

/// Header plus rows, sorted by bucket ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Bucket label followed by value column names.
    pub header: Vec<String>,
    /// Rows, one per bucket.
    pub rows: Vec<BucketRow>,
}

impl Table {
    /// Builds a table, sorting rows by bucket.
    #[must_use]
    pub fn new(header: Vec<String>, mut rows: Vec<BucketRow>) -> Self {
        rows.sort_by_key(|row| row.bucket);
        Self { header, rows }
    }

    /// Returns true if there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns `(label, first count)` pairs for charting.
    #[must_use]
    pub fn series(&self) -> Vec<(String, i64)> {
        self.rows
            .iter()
            .map(|row| (row.label.clone(), row.counts.first().copied().unwrap_or(0)))
            .collect()
    }

    /// Renders the table as comma-separated text with a header line.
    ///
    /// # Errors
    ///
    /// Returns an error if the CSV writer fails.
    pub fn to_csv(&self) -> Result<String, csv::Error> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.header)?;
        for row in &self.rows {
            let mut record = Vec::with_capacity(row.counts.len() + 1);
            record.push(row.label.clone());
            record.extend(row.counts.iter().map(ToString::to_string));
            writer.write_record(&record)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|err| csv::Error::from(err.into_error()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(y: i32, m: u32, count: i64) -> BucketRow {
        BucketRow {
            bucket: NaiveDate::from_ymd_opt(y, m, 1).unwrap(),
            label: format!("{y}-{m:02}"),
            counts: vec![count],
        }
    }

    #[test]
    fn test_rows_sorted_by_bucket() {
        let table = Table::new(
            vec!["mês".into(), "total_casos".into()],
            vec![row(2024, 3, 5), row(2023, 12, 2), row(2024, 1, 9)],
        );
        let labels: Vec<_> = table.rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["2023-12", "2024-01", "2024-03"]);
    }

    #[test]
    fn test_to_csv() {
        let table = Table::new(
            vec!["mês".into(), "total_casos".into()],
            vec![row(2024, 2, 7), row(2024, 1, 3)],
        );
        assert_eq!(table.to_csv().unwrap(), "mês,total_casos\n2024-01,3\n2024-02,7\n");
        assert_eq!(
            table.series(),
            vec![("2024-01".to_string(), 3), ("2024-02".to_string(), 7)]
        );
    }
}
