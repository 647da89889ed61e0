//! Allow-listed metrics and grouping units.

use crate::records::InfludRecord;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An epidemiological metric that can be aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Notified cases.
    TotalCases,
    /// COVID-19 and influenza vaccinated cases.
    Vaccinations,
    /// ICU admissions.
    IcuAdmissions,
    /// Deaths.
    Deaths,
}

impl Metric {
    /// All metrics, in report order.
    pub const ALL: [Self; 4] = [
        Self::TotalCases,
        Self::Vaccinations,
        Self::IcuAdmissions,
        Self::Deaths,
    ];

    /// Returns the dispatch key.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TotalCases => "total_cases",
            Self::Vaccinations => "vaccinations",
            Self::IcuAdmissions => "icu_admissions",
            Self::Deaths => "deaths",
        }
    }

    /// Column whose date places a record in a bucket.
    #[must_use]
    pub fn date_column(self) -> &'static str {
        match self {
            Self::TotalCases | Self::Vaccinations => "data_preenchimento",
            Self::IcuAdmissions => "data_entrada_uti",
            Self::Deaths => "data_evolucao",
        }
    }

    /// Aggregate expressions and their column labels.
    #[must_use]
    pub fn value_columns(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::TotalCases => &[("COUNT(*)", "total_casos")],
            Self::Vaccinations => &[
                ("COUNT(*) FILTER (WHERE vacina_covid = 1)", "vacinados_covid"),
                ("COUNT(*) FILTER (WHERE vacina_gripe = 1)", "vacinados_gripe"),
            ],
            Self::IcuAdmissions => &[("COUNT(*) FILTER (WHERE internado_uti = 1)", "internacoes_uti")],
            Self::Deaths => &[("COUNT(*) FILTER (WHERE evolucao = 2)", "obitos")],
        }
    }

    /// The date a record contributes to, mirroring [`date_column`](Self::date_column).
    #[must_use]
    pub fn event_date(self, record: &InfludRecord) -> Option<NaiveDate> {
        match self {
            Self::TotalCases | Self::Vaccinations => record.data_preenchimento,
            Self::IcuAdmissions => record.data_entrada_uti,
            Self::Deaths => record.data_evolucao,
        }
    }

    /// Per-column contribution of one record, mirroring [`value_columns`](Self::value_columns).
    #[must_use]
    pub fn contribution(self, record: &InfludRecord) -> Vec<i64> {
        let flag = |set: bool| i64::from(set);
        match self {
            Self::TotalCases => vec![1],
            Self::Vaccinations => vec![
                flag(record.vacina_covid == Some(1)),
                flag(record.vacina_gripe == Some(1)),
            ],
            Self::IcuAdmissions => vec![flag(record.admitted_to_icu())],
            Self::Deaths => vec![flag(record.died())],
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|metric| metric.as_str() == s)
            .ok_or_else(|| format!("unknown metric '{s}'"))
    }
}

/// Time bucket unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    /// One bucket per day.
    Day,
    /// One bucket per calendar month.
    Month,
    /// One bucket per calendar year.
    Year,
}

impl GroupBy {
    /// The `date_trunc` field name, bound as a query parameter.
    #[must_use]
    pub fn unit(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    /// Localized header label of the bucket column.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Day => "dia",
            Self::Month => "mês",
            Self::Year => "ano",
        }
    }

    /// Truncates a date to the start of its bucket.
    #[must_use]
    pub fn truncate(self, date: NaiveDate) -> NaiveDate {
        match self {
            Self::Day => date,
            Self::Month => date.with_day(1).unwrap_or(date),
            Self::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date),
        }
    }

    /// Formats a bucket start as its row label.
    #[must_use]
    pub fn format(self, bucket: NaiveDate) -> String {
        match self {
            Self::Day => bucket.format("%Y-%m-%d").to_string(),
            Self::Month => bucket.format("%Y-%m").to_string(),
            Self::Year => bucket.format("%Y").to_string(),
        }
    }
}

impl FromStr for GroupBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(Self::Day),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            other => Err(format!("unknown grouping unit '{other}'")),
        }
    }
}

/// What a fetch should return: one metric or all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataRequest {
    /// A single metric.
    Metric(Metric),
    /// Every metric, keyed by name.
    All,
}

impl FromStr for DataRequest {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            return Ok(Self::All);
        }
        s.parse::<Metric>()
            .map(Self::Metric)
            .map_err(|_| format!("invalid data request '{s}'"))
    }
}
