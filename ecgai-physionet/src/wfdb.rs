//! WFDB signal reader
//!
//! Fetches a record's header (`.hea`) and signal file (`.dat`) from the
//! PhysioNet archive and decodes them into physical units. Only what PTB-XL
//! needs is supported: single-segment records stored in one format 16 file.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::models::SignalRecord;

const USER_AGENT: &str = concat!("ecgai-physionet/", env!("CARGO_PKG_VERSION"));
const DEFAULT_GAIN: f64 = 200.0;
const DEFAULT_FREQUENCY: f64 = 250.0;
const FORMAT_16_INVALID_SAMPLE: i16 = i16::MIN;

/// Signal reader errors
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Signal file not found: {0}")]
    NotFound(String),

    #[error("Malformed header: {0}")]
    Header(String),

    #[error("Unsupported record layout: {0}")]
    Unsupported(String),

    #[error("Signal file truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("Signal worker failed: {0}")]
    Worker(String),
}

/// Capability that turns an archive location into a decoded signal
#[async_trait]
pub trait SignalReader: Send + Sync {
    /// Read `record_name` from `archive_directory` (e.g. `ptb-xl/records100/00000/`)
    async fn read(
        &self,
        record_name: &str,
        archive_directory: &str,
    ) -> Result<SignalRecord, SignalError>;
}

/// One signal line of a WFDB header
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSpec {
    pub file_name: String,
    pub format: u16,
    pub gain: f64,
    pub baseline: i32,
    pub description: String,
}

/// Parsed WFDB header
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub record_name: String,
    pub sampling_frequency: f64,
    pub samples_per_signal: Option<usize>,
    pub signals: Vec<SignalSpec>,
}

impl Header {
    pub fn parse(text: &str) -> Result<Self, SignalError> {
        let mut lines = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'));

        let record_line = lines
            .next()
            .ok_or_else(|| SignalError::Header("empty header".to_string()))?;
        let mut fields = record_line.split_whitespace();

        let record_name = fields
            .next()
            .ok_or_else(|| SignalError::Header("missing record name".to_string()))?;
        if record_name.contains('/') {
            return Err(SignalError::Unsupported(format!(
                "multi-segment record {}",
                record_name
            )));
        }

        let signal_count: usize = fields
            .next()
            .ok_or_else(|| SignalError::Header("missing signal count".to_string()))?
            .parse()
            .map_err(|_| SignalError::Header(format!("bad signal count in '{}'", record_line)))?;

        // "fs/counter_freq(base_counter)" - only fs matters here
        let sampling_frequency = match fields.next() {
            Some(field) => leading_number(field)
                .ok_or_else(|| SignalError::Header(format!("bad frequency '{}'", field)))?,
            None => DEFAULT_FREQUENCY,
        };

        let samples_per_signal = match fields.next() {
            Some(field) => Some(
                field
                    .parse()
                    .map_err(|_| SignalError::Header(format!("bad sample count '{}'", field)))?,
            ),
            None => None,
        };

        let signals = lines
            .take(signal_count)
            .map(parse_signal_line)
            .collect::<Result<Vec<_>, _>>()?;

        if signals.len() != signal_count {
            return Err(SignalError::Header(format!(
                "expected {} signal lines, found {}",
                signal_count,
                signals.len()
            )));
        }

        Ok(Self {
            record_name: record_name.to_string(),
            sampling_frequency,
            samples_per_signal,
            signals,
        })
    }
}

fn leading_number(field: &str) -> Option<f64> {
    let end = field.find(['/', '(']).unwrap_or(field.len());
    field[..end].parse().ok()
}

fn parse_signal_line(line: &str) -> Result<SignalSpec, SignalError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 2 {
        return Err(SignalError::Header(format!("short signal line '{}'", line)));
    }

    let format_field = fields[1];
    if format_field.contains(['x', ':', '+']) {
        return Err(SignalError::Unsupported(format!(
            "signal format '{}'",
            format_field
        )));
    }
    let format: u16 = format_field
        .parse()
        .map_err(|_| SignalError::Header(format!("bad format '{}'", format_field)))?;

    let adc_zero: i32 = match fields.get(4) {
        Some(field) => field
            .parse()
            .map_err(|_| SignalError::Header(format!("bad adc zero '{}'", field)))?,
        None => 0,
    };

    // "gain(baseline)/units", each part optional
    let (gain, baseline) = match fields.get(2) {
        Some(field) => {
            let spec = field.split('/').next().unwrap_or_default();
            let (gain_text, baseline) = match spec.split_once('(') {
                Some((gain_text, rest)) => {
                    let baseline = rest
                        .trim_end_matches(')')
                        .parse()
                        .map_err(|_| SignalError::Header(format!("bad baseline '{}'", field)))?;
                    (gain_text, baseline)
                }
                None => (spec, adc_zero),
            };
            let gain: f64 = gain_text
                .parse()
                .map_err(|_| SignalError::Header(format!("bad gain '{}'", field)))?;
            (if gain == 0.0 { DEFAULT_GAIN } else { gain }, baseline)
        }
        None => (DEFAULT_GAIN, adc_zero),
    };

    let description = if fields.len() > 8 {
        fields[8..].join(" ")
    } else {
        String::new()
    };

    Ok(SignalSpec {
        file_name: fields[0].to_string(),
        format,
        gain,
        baseline,
        description,
    })
}

/// Decode a format 16 signal file into physical units, one row per signal
pub fn decode_format_16(header: &Header, data: &[u8]) -> Result<Vec<Vec<f64>>, SignalError> {
    let signal_count = header.signals.len();
    if signal_count == 0 {
        return Err(SignalError::Header("record has no signals".to_string()));
    }
    if let Some(spec) = header.signals.iter().find(|s| s.format != 16) {
        return Err(SignalError::Unsupported(format!("signal format {}", spec.format)));
    }
    let file_name = &header.signals[0].file_name;
    if header.signals.iter().any(|s| &s.file_name != file_name) {
        return Err(SignalError::Unsupported("signals spread over several files".to_string()));
    }

    let frame_bytes = signal_count * 2;
    let samples = header
        .samples_per_signal
        .unwrap_or(data.len() / frame_bytes);
    let expected = samples.checked_mul(frame_bytes).ok_or_else(|| {
        SignalError::Header(format!("sample count {} out of range", samples))
    })?;
    if data.len() < expected {
        return Err(SignalError::Truncated {
            expected,
            actual: data.len(),
        });
    }

    let mut leads: Vec<Vec<f64>> = vec![Vec::with_capacity(samples); signal_count];
    for frame in data[..expected].chunks_exact(frame_bytes) {
        for (index, bytes) in frame.chunks_exact(2).enumerate() {
            let digital = i16::from_le_bytes([bytes[0], bytes[1]]);
            let spec = &header.signals[index];
            let value = if digital == FORMAT_16_INVALID_SAMPLE {
                f64::NAN
            } else {
                (f64::from(digital) - f64::from(spec.baseline)) / spec.gain
            };
            leads[index].push(value);
        }
    }

    Ok(leads)
}

/// [`SignalReader`] backed by the PhysioNet file server
pub struct PhysioNetSignalReader {
    http_client: reqwest::Client,
    base_url: String,
    version: String,
}

impl PhysioNetSignalReader {
    pub fn new(base_url: &str, version: &str) -> Result<Self, SignalError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| SignalError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            version: version.to_string(),
        })
    }

    /// URL of `file_name` inside `archive_directory`, with the archive
    /// version inserted after the dataset segment
    pub fn file_url(&self, archive_directory: &str, file_name: &str) -> String {
        let directory = archive_directory.trim_matches('/');
        let (dataset, rest) = directory.split_once('/').unwrap_or((directory, ""));

        let mut url = format!("{}/{}", self.base_url, dataset);
        if !self.version.is_empty() {
            url.push('/');
            url.push_str(&self.version);
        }
        if !rest.is_empty() {
            url.push('/');
            url.push_str(rest);
        }
        url.push('/');
        url.push_str(file_name);
        url
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, SignalError> {
        tracing::debug!(url = %url, "Fetching signal file");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| SignalError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SignalError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(SignalError::Network(format!("HTTP {} for {}", status, url)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SignalError::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl SignalReader for PhysioNetSignalReader {
    async fn read(
        &self,
        record_name: &str,
        archive_directory: &str,
    ) -> Result<SignalRecord, SignalError> {
        let header_url = self.file_url(archive_directory, &format!("{}.hea", record_name));
        let header_bytes = self.fetch(&header_url).await?;
        let header = Header::parse(&String::from_utf8_lossy(&header_bytes))?;

        let data_file = header
            .signals
            .first()
            .map(|s| s.file_name.clone())
            .ok_or_else(|| SignalError::Header("record has no signals".to_string()))?;
        let data = self
            .fetch(&self.file_url(archive_directory, &data_file))
            .await?;

        let (header, leads) = tokio::task::spawn_blocking(move || {
            decode_format_16(&header, &data).map(|leads| (header, leads))
        })
        .await
        .map_err(|e| SignalError::Worker(format!("Task join error: {}", e)))??;

        tracing::info!(
            record = %header.record_name,
            leads = leads.len(),
            samples = leads.first().map(Vec::len).unwrap_or(0),
            "Decoded WFDB record"
        );

        Ok(SignalRecord {
            record_name: header.record_name,
            sampling_frequency: header.sampling_frequency,
            lead_names: header.signals.into_iter().map(|s| s.description).collect(),
            leads,
        })
    }
}
