//! Record fixtures.

use crate::errors::StoreError;
use crate::records::{InfludRecord, DELIMITER, EVOLUTION_DEATH};
use chrono::{Duration, NaiveDate};
use std::path::Path;

/// A record notified on `date` with no flags set.
#[must_use]
pub fn record_on(origin_id: i64, date: NaiveDate) -> InfludRecord {
    InfludRecord {
        origin_id,
        data_preenchimento: Some(date),
        ..InfludRecord::default()
    }
}

/// One record per day for `days` days ending at `end`.
///
/// Every third record is vaccinated against COVID-19, every fifth went to
/// the ICU and every seventh died, with the event dates set accordingly.
#[must_use]
pub fn surveillance_records(end: NaiveDate, days: i64) -> Vec<InfludRecord> {
    (0..days)
        .map(|offset| {
            let date = end - Duration::days(offset);
            let mut record = record_on(offset + 1, date);
            record.vacina_covid = Some(i32::from(offset % 3 == 0));
            record.vacina_gripe = Some(i32::from(offset % 4 == 0));
            if offset % 5 == 0 {
                record.internado_uti = Some(1);
                record.data_entrada_uti = Some(date);
            }
            if offset % 7 == 0 {
                record.evolucao = Some(EVOLUTION_DEATH);
                record.data_evolucao = Some(date);
            }
            record
        })
        .collect()
}

/// Writes records as a semicolon-delimited load file with a header row.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_load_file(path: &Path, records: &[InfludRecord]) -> Result<(), StoreError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(DELIMITER)
        .from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}
