/*!
 * Read case records from CSV files.
 *
 * The expected header is
 *
 * ```text
 * location_id,latitude,longitude,event_dates,disease,group_id
 * ```
 *
 * `event_dates` is a `;` separated list of `YYYY-MM-DD` dates and may be empty. `group_id` may be
 * empty too.
 */
use crate::{error::RecordError, event::RawCaseRecord, EpiClusterResult};
use chrono::NaiveDate;
use serde::Deserialize;
use std::{io::Read, path::Path};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Deserialize)]
struct CaseRow {
    location_id: u64,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    event_dates: String,
    disease: String,
    #[serde(default)]
    group_id: Option<u64>,
}

impl CaseRow {
    fn into_record(self, origin: &str, line: Option<u64>) -> Result<RawCaseRecord, RecordError> {
        let event_dates = parse_dates(&self.event_dates).map_err(|msg| RecordError {
            origin: origin.to_owned(),
            line,
            msg,
        })?;

        Ok(RawCaseRecord {
            location_id: self.location_id,
            latitude: self.latitude,
            longitude: self.longitude,
            event_dates,
            disease_label: self.disease,
            group_id: self.group_id,
        })
    }
}

/// Parse a `;` separated list of dates, blanks are skipped.
pub fn parse_dates(dates: &str) -> Result<Vec<NaiveDate>, String> {
    dates
        .split(';')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(|d| {
            NaiveDate::parse_from_str(d, DATE_FORMAT)
                .map_err(|err| format!("invalid date '{}': {}", d, err))
        })
        .collect()
}

/// Load every case record in a CSV file.
pub fn read_case_records<P: AsRef<Path>>(path: P) -> EpiClusterResult<Vec<RawCaseRecord>> {
    let path = path.as_ref();
    let f = std::fs::File::open(path)?;

    read_case_records_from(f, &path.display().to_string())
}

/**
 * Load every case record from a CSV reader.
 *
 * #Arguments
 * rdr - the CSV text, including the header.
 * origin - a name for the input used in error messages.
 */
pub fn read_case_records_from<R: Read>(
    rdr: R,
    origin: &str,
) -> EpiClusterResult<Vec<RawCaseRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(rdr);

    let record_error = |line: Option<u64>, msg: String| RecordError {
        origin: origin.to_owned(),
        line,
        msg,
    };

    let headers = rdr
        .headers()
        .map_err(|err| record_error(Some(1), err.to_string()))?
        .clone();

    let mut records = vec![];
    for row in rdr.records() {
        let row = row.map_err(|err| {
            record_error(err.position().map(|p| p.line()), err.to_string())
        })?;

        let line = row.position().map(|p| p.line());
        let case_row: CaseRow = row
            .deserialize(Some(&headers))
            .map_err(|err| record_error(line, err.to_string()))?;

        records.push(case_row.into_record(origin, line)?);
    }

    log::debug!("read {} case records from {}", records.len(), origin);

    Ok(records)
}
