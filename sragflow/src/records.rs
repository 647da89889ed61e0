//! The `influd_data` record layout and the delimited input file reader.

use crate::errors::StoreError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Target table of the load pipeline.
pub const TABLE_NAME: &str = "influd_data";

/// Loadable columns in file order.
pub const COLUMNS: [&str; 13] = [
    "origin_id",
    "data_preenchimento",
    "vacina_covid",
    "vacina_gripe",
    "internado_hospital",
    "data_internacao_hospital",
    "internado_uti",
    "data_entrada_uti",
    "data_saida_uti",
    "diagnostico_final",
    "evolucao",
    "data_evolucao",
    "data_primeiro_sintoma",
];

/// Field delimiter of the input file.
pub const DELIMITER: u8 = b';';

/// `evolucao` value recorded for deaths.
pub const EVOLUTION_DEATH: i32 = 2;

/// One SRAG notification as stored in `influd_data`.
///
/// Flags are 0/1 integers; an empty input field maps to `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfludRecord {
    /// Identifier of the notification in the source dataset.
    pub origin_id: i64,
    /// Notification date.
    pub data_preenchimento: Option<NaiveDate>,
    /// COVID-19 vaccination flag.
    pub vacina_covid: Option<i32>,
    /// Influenza vaccination flag.
    pub vacina_gripe: Option<i32>,
    /// Hospitalization flag.
    pub internado_hospital: Option<i32>,
    /// Hospital admission date.
    pub data_internacao_hospital: Option<NaiveDate>,
    /// ICU admission flag.
    pub internado_uti: Option<i32>,
    /// ICU entry date.
    pub data_entrada_uti: Option<NaiveDate>,
    /// ICU exit date.
    pub data_saida_uti: Option<NaiveDate>,
    /// Final diagnosis code.
    pub diagnostico_final: Option<i32>,
    /// Outcome code (`2` = death).
    pub evolucao: Option<i32>,
    /// Outcome date.
    pub data_evolucao: Option<NaiveDate>,
    /// First symptom date.
    pub data_primeiro_sintoma: Option<NaiveDate>,
}

impl InfludRecord {
    /// Returns true if the record reports an ICU admission.
    #[must_use]
    pub fn admitted_to_icu(&self) -> bool {
        self.internado_uti == Some(1)
    }

    /// Returns true if the record reports a death.
    #[must_use]
    pub fn died(&self) -> bool {
        self.evolucao == Some(EVOLUTION_DEATH)
    }
}

/// Reads a semicolon-delimited file in [`COLUMNS`] order.
///
/// The first line is always skipped, whatever it contains. Fields are
/// matched by position, not by header name.
///
/// # Errors
///
/// Returns `StoreError::Csv` on the first malformed row.
pub fn read_delimited(path: &Path) -> Result<Vec<InfludRecord>, StoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        records.push(row.deserialize::<InfludRecord>(None)?);
    }
    Ok(records)
}
