//! Report date verification.

use crate::errors::StoreError;
use crate::store::RecordSource;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// The requested report date and the date actually used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateResolution {
    /// Date asked for.
    pub requested: NaiveDate,
    /// Date with data.
    pub resolved: NaiveDate,
}

impl DateResolution {
    /// Returns true if the requested date was replaced.
    #[must_use]
    pub fn substituted(&self) -> bool {
        self.requested != self.resolved
    }
}

/// Checks that the store has records on `requested`.
///
/// When it does not, the most recent date with records is used instead and
/// a warning is logged.
///
/// # Errors
///
/// Returns the store error, or `StoreError::NoData` if the store is empty.
pub async fn verify_report_date(
    source: &dyn RecordSource,
    requested: NaiveDate,
) -> Result<DateResolution, StoreError> {
    if source.has_records_on(requested).await? {
        return Ok(DateResolution {
            requested,
            resolved: requested,
        });
    }

    let resolved = source
        .latest_record_date()
        .await?
        .ok_or(StoreError::NoData)?;
    warn!(%requested, %resolved, "No records on the requested date, using the latest available date");
    Ok(DateResolution {
        requested,
        resolved,
    })
}
