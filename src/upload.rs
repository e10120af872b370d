//! Local inspection of CSV files before they are uploaded.
//!
//! The service rejects malformed files server-side; checking the basics
//! here saves a round trip and gives the operator a row count and date
//! range for the file they are about to send.

use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;

/// What a quick scan of an upload candidate found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSummary {
    pub rows: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

/// Reads `path` as CSV and checks it carries a `ds` date column.
///
/// # Errors
///
/// Fails when the file cannot be read, is not CSV, or has no `ds` column.
/// Unparseable dates in individual rows are tolerated; the date range
/// simply omits them.
pub fn inspect_csv(path: &Path) -> Result<UploadSummary> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to read CSV file {}", path.display()))?;

    let headers = reader.headers().context("CSV file has no header row")?;
    let ds_index = match headers.iter().position(|h| h.trim() == "ds") {
        Some(i) => i,
        None => bail!("CSV file {} has no 'ds' column", path.display()),
    };

    let mut rows = 0;
    let mut first_date: Option<NaiveDate> = None;
    let mut last_date: Option<NaiveDate> = None;

    for record in reader.records() {
        let record = record.context("failed to parse CSV row")?;
        rows += 1;
        if let Some(raw) = record.get(ds_index) {
            if let Ok(date) = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
                if first_date.is_none_or(|d| date < d) {
                    first_date = Some(date);
                }
                if last_date.is_none_or(|d| date > d) {
                    last_date = Some(date);
                }
            }
        }
    }

    Ok(UploadSummary {
        rows,
        first_date,
        last_date,
    })
}
