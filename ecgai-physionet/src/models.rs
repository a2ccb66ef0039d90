//! Domain types for PTB-XL records

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PhysioNetError;

/// Recording resolution available in the archive
///
/// The archive keeps one directory tree per resolution (`records100/`,
/// `records500/`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum SampleRate {
    /// 100 Hz, `filename_lr`
    Low,
    /// 500 Hz, `filename_hr`
    #[default]
    High,
}

impl SampleRate {
    pub fn hz(self) -> u32 {
        match self {
            SampleRate::Low => 100,
            SampleRate::High => 500,
        }
    }
}

impl TryFrom<u32> for SampleRate {
    type Error = PhysioNetError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            100 => Ok(SampleRate::Low),
            500 => Ok(SampleRate::High),
            other => Err(PhysioNetError::InvalidSampleRate(other)),
        }
    }
}

impl From<SampleRate> for u32 {
    fn from(rate: SampleRate) -> Self {
        rate.hz()
    }
}

impl fmt::Display for SampleRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz", self.hz())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    /// Archive encoding: 0 = male, 1 = female
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Sex::Male),
            1 => Some(Sex::Female),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
        }
    }
}

/// One `(code, confidence)` entry of a record's `scp_codes` field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticCodeRaw {
    /// SCP code, restricted to `[A-Za-z0-9_]`
    pub code: String,
    pub confidence: f64,
}

/// SCP code joined with its statement description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticCode {
    pub scp_code: String,
    pub description: String,
    pub confidence: f64,
}

/// Clinical attributes of one record, built per lookup
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataRow {
    pub record_id: u32,
    pub patient_id: u32,
    pub age: Option<u32>,
    pub sex: Sex,
    pub report: String,
    pub scp_codes: Vec<DiagnosticCodeRaw>,
}

/// Archive location of a record's signal files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPath {
    /// Base record name, e.g. `00001_hr`
    pub record_name: String,
    /// Archive directory with trailing slash, e.g. `ptb-xl/records500/00000/`
    pub archive_directory: String,
}

/// Decoded signal as returned by a [`crate::wfdb::SignalReader`]
#[derive(Debug, Clone, PartialEq)]
pub struct SignalRecord {
    pub record_name: String,
    /// Effective sampling frequency in Hz
    pub sampling_frequency: f64,
    pub lead_names: Vec<String>,
    /// Physical values, one row per lead
    pub leads: Vec<Vec<f64>>,
}

impl SignalRecord {
    /// Check the shape a record must have before it can be assembled
    pub fn is_well_formed(&self) -> bool {
        let Some(first) = self.leads.first() else {
            return false;
        };
        !first.is_empty()
            && self.leads.iter().all(|lead| lead.len() == first.len())
            && self.lead_names.len() == self.leads.len()
            && self.sampling_frequency.is_finite()
            && self.sampling_frequency > 0.0
    }
}

/// Fully assembled record handed to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcgRecord {
    pub record_id: u32,
    pub record_name: String,
    pub database_name: String,
    pub sample_rate: f64,
    pub lead_names: Vec<String>,
    /// leads × samples
    pub leads: Vec<Vec<f64>>,
    pub age: Option<u32>,
    pub sex: Sex,
    pub report: String,
    pub diagnostic_codes: Vec<DiagnosticCode>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_rate_accepts_only_archive_rates() {
        assert_eq!(SampleRate::try_from(100).unwrap(), SampleRate::Low);
        assert_eq!(SampleRate::try_from(500).unwrap(), SampleRate::High);
        for bad in [0, 99, 250, 1000] {
            assert!(matches!(
                SampleRate::try_from(bad),
                Err(PhysioNetError::InvalidSampleRate(v)) if v == bad
            ));
        }
        assert_eq!(SampleRate::default().hz(), 500);
    }

    #[test]
    fn test_sex_codes() {
        assert_eq!(Sex::from_code(0), Some(Sex::Male));
        assert_eq!(Sex::from_code(1), Some(Sex::Female));
        assert_eq!(Sex::from_code(2), None);
        assert_eq!(serde_json::to_string(&Sex::Female).unwrap(), "\"female\"");
    }

    #[test]
    fn test_signal_shape_check() {
        let mut signal = SignalRecord {
            record_name: "00001_lr".to_string(),
            sampling_frequency: 100.0,
            lead_names: vec!["I".to_string(), "II".to_string()],
            leads: vec![vec![0.1, 0.2], vec![0.3, 0.4]],
        };
        assert!(signal.is_well_formed());

        signal.leads[1].pop();
        assert!(!signal.is_well_formed());

        signal.leads.clear();
        signal.lead_names.clear();
        assert!(!signal.is_well_formed());
    }
}
