//! PTB-XL per-record metadata table (`ptbxl_database.csv`)

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{PhysioNetError, Result};
use crate::models::{DiagnosticCodeRaw, MetadataRow, SampleRate, Sex};

/// Columns of `ptbxl_database.csv` this crate reads; others are ignored
#[derive(Debug, Deserialize)]
struct DatabaseRow {
    ecg_id: String,
    patient_id: String,
    age: String,
    sex: String,
    report: String,
    scp_codes: String,
    filename_lr: String,
    filename_hr: String,
}

/// One row of the metadata table, before clinical fields are interpreted
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataEntry {
    pub record_id: u32,
    pub patient_id: String,
    pub age: String,
    pub sex: String,
    pub report: String,
    pub scp_codes: String,
    pub filename_lr: String,
    pub filename_hr: String,
}

impl MetadataEntry {
    /// Archive-relative filename (without extension) for `sample_rate`
    pub fn filename(&self, sample_rate: SampleRate) -> &str {
        match sample_rate {
            SampleRate::High => &self.filename_hr,
            SampleRate::Low => &self.filename_lr,
        }
    }

    /// Interpret the clinical columns
    pub fn to_metadata_row(&self) -> Result<MetadataRow> {
        let patient_id = parse_whole_number(&self.patient_id, "patient_id")?.ok_or_else(|| {
            PhysioNetError::Parse(format!("record {} has no patient_id", self.record_id))
        })?;
        let age = parse_whole_number(&self.age, "age")?;

        let sex_code = parse_whole_number(&self.sex, "sex")?
            .and_then(|code| u8::try_from(code).ok())
            .and_then(Sex::from_code)
            .ok_or_else(|| {
                PhysioNetError::Parse(format!(
                    "record {} has invalid sex code '{}'",
                    self.record_id, self.sex
                ))
            })?;

        Ok(MetadataRow {
            record_id: self.record_id,
            patient_id,
            age,
            sex: sex_code,
            report: self.report.clone(),
            scp_codes: parse_scp_codes(&self.scp_codes)?,
        })
    }
}

/// Reader over a locally cached metadata table
#[derive(Debug, Clone)]
pub struct MetadataTable {
    path: PathBuf,
}

impl MetadataTable {
    pub fn load(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Scan the table for `record_id`
    pub fn find(&self, record_id: u32) -> Result<Option<MetadataEntry>> {
        let mut reader = csv::Reader::from_path(&self.path)?;

        for row in reader.deserialize::<DatabaseRow>() {
            let row = row?;
            if parse_whole_number(&row.ecg_id, "ecg_id")? != Some(record_id) {
                continue;
            }

            return Ok(Some(MetadataEntry {
                record_id,
                patient_id: row.patient_id,
                age: row.age,
                sex: row.sex,
                report: row.report,
                scp_codes: row.scp_codes,
                filename_lr: row.filename_lr,
                filename_hr: row.filename_hr,
            }));
        }

        Ok(None)
    }
}

/// Numeric cells may be float-encoded (`"15709.0"`); empty means absent
fn parse_whole_number(value: &str, column: &str) -> Result<Option<u32>> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }

    let number: f64 = value
        .parse()
        .map_err(|_| PhysioNetError::Parse(format!("{} '{}' is not a number", column, value)))?;

    if number.fract() != 0.0 || number < 0.0 || number > f64::from(u32::MAX) {
        return Err(PhysioNetError::Parse(format!(
            "{} '{}' is not a whole number",
            column, value
        )));
    }
    Ok(Some(number as u32))
}

/// Keep only `[A-Za-z0-9_]`
pub fn sanitize_code(token: &str) -> String {
    token
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// Parse the `scp_codes` field
///
/// Accepts `CODE1:0.9,CODE2:0.3` as well as the dict literal the archive
/// ships (`{'NORM': 100.0, 'SR': 0.0}`).
pub fn parse_scp_codes(field: &str) -> Result<Vec<DiagnosticCodeRaw>> {
    let mut codes = Vec::new();

    for item in field.split(',') {
        if item
            .trim_matches(|c: char| c.is_whitespace() || c == '{' || c == '}')
            .is_empty()
        {
            continue;
        }

        let (code_token, confidence_token) = item.split_once(':').ok_or_else(|| {
            PhysioNetError::Parse(format!("scp code entry '{}' has no confidence", item))
        })?;

        let code = sanitize_code(code_token);
        if code.is_empty() {
            return Err(PhysioNetError::Parse(format!(
                "scp code entry '{}' has no code",
                item
            )));
        }

        let confidence_text: String = confidence_token
            .chars()
            .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | 'e' | 'E'))
            .collect();
        let confidence = confidence_text.parse().map_err(|_| {
            PhysioNetError::Parse(format!(
                "scp code {} has invalid confidence '{}'",
                code, confidence_token
            ))
        })?;

        codes.push(DiagnosticCodeRaw { code, confidence });
    }

    Ok(codes)
}
