//! PTB-XL dataset accessor
//!
//! Resolves a record id to its archive location, fetches the signal through
//! the configured [`SignalReader`] and joins it with the clinical metadata and
//! SCP code descriptions from the cached reference tables.
//!
//! Flow of [`PtbXl::get_record`]:
//! path resolving → fetching (spawned task) → assembling → done.
//! Any error ends the call; nothing is retried here.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info};

use ecgai_common::config::TomlConfig;

use crate::error::{PhysioNetError, Result};
use crate::metadata::{MetadataEntry, MetadataTable};
use crate::models::{
    DiagnosticCode, DiagnosticCodeRaw, EcgRecord, MetadataRow, RecordPath, SampleRate,
    SignalRecord,
};
use crate::reference::{HttpReferenceSource, ReferenceSource, ReferenceTableCache, TableKind};
use crate::scp::ScpStatementTable;
use crate::wfdb::{PhysioNetSignalReader, SignalError, SignalReader};

/// Dataset name, also the first segment of every archive directory
pub const DATASET_NAME: &str = "ptb-xl";

/// Storage configuration for [`PtbXl`]
#[derive(Debug, Clone, PartialEq)]
pub struct PtbXlConfig {
    pub data_location: PathBuf,
    pub database_metadata_filename: String,
    pub scp_code_filename: String,
}

impl Default for PtbXlConfig {
    fn default() -> Self {
        let defaults = TomlConfig::default();
        Self {
            data_location: PathBuf::from("./data"),
            database_metadata_filename: defaults.database_metadata_filename,
            scp_code_filename: defaults.scp_code_filename,
        }
    }
}

impl PtbXlConfig {
    pub fn from_toml(config: &TomlConfig, data_location: PathBuf) -> Self {
        Self {
            data_location,
            database_metadata_filename: config.database_metadata_filename.clone(),
            scp_code_filename: config.scp_code_filename.clone(),
        }
    }
}

/// Entry point for PTB-XL record access; cheap to clone and share
#[derive(Clone)]
pub struct PtbXl {
    dataset_name: String,
    tables: ReferenceTableCache,
    signal_reader: Arc<dyn SignalReader>,
}

impl PtbXl {
    /// Accessor wired to the PhysioNet archive
    pub fn new(config: PtbXlConfig, archive_base_url: &str, archive_version: &str) -> Result<Self> {
        let source = Arc::new(HttpReferenceSource::new()?);
        let reader = Arc::new(PhysioNetSignalReader::new(archive_base_url, archive_version)?);
        Ok(Self::with_services(config, source, reader))
    }

    /// Accessor with injected reference source and signal reader
    pub fn with_services(
        config: PtbXlConfig,
        source: Arc<dyn ReferenceSource>,
        signal_reader: Arc<dyn SignalReader>,
    ) -> Self {
        let tables = ReferenceTableCache::new(
            config.data_location,
            config.database_metadata_filename,
            config.scp_code_filename,
            source,
        );

        Self {
            dataset_name: DATASET_NAME.to_string(),
            tables,
            signal_reader,
        }
    }

    pub fn dataset_name(&self) -> &str {
        &self.dataset_name
    }

    pub fn tables(&self) -> &ReferenceTableCache {
        &self.tables
    }

    /// Fetch and assemble one record
    pub async fn get_record(&self, record_id: u32, sample_rate: u32) -> Result<EcgRecord> {
        debug!(record_id, sample_rate, "Resolving record path");
        let RecordPath {
            record_name,
            archive_directory,
        } = self.resolve_path(record_id, sample_rate).await?;

        debug!(
            record_id,
            record_name = %record_name,
            archive_directory = %archive_directory,
            "Fetching signal"
        );
        let reader = Arc::clone(&self.signal_reader);
        let fetch = tokio::spawn(async move { reader.read(&record_name, &archive_directory).await });

        let signal = match fetch.await {
            Ok(Ok(signal)) => signal,
            Ok(Err(e)) => {
                error!(record_id, error = %e, "Signal fetch failed");
                return Err(e.into());
            }
            Err(e) => {
                error!(record_id, error = %e, "Signal fetch task failed");
                return Err(SignalError::Worker(e.to_string()).into());
            }
        };

        debug!(record_id, "Assembling record");
        let record = self.assemble(record_id, signal).await?;

        info!(
            record_id,
            record_name = %record.record_name,
            diagnostic_codes = record.diagnostic_codes.len(),
            "Record assembled"
        );
        Ok(record)
    }

    /// Map `(record_id, sample_rate)` to the record's archive location
    ///
    /// The sample rate is checked before any table is touched.
    pub async fn resolve_path(&self, record_id: u32, sample_rate: u32) -> Result<RecordPath> {
        let sample_rate = SampleRate::try_from(sample_rate)?;
        let entry = self.metadata_entry(record_id).await?;

        let path = entry.filename(sample_rate).trim_matches('/');
        let (directory, record_name) = match path.rsplit_once('/') {
            Some((directory, name)) => (directory, name),
            None => ("", path),
        };
        if record_name.is_empty() {
            return Err(PhysioNetError::Parse(format!(
                "record {} has no {} filename",
                record_id, sample_rate
            )));
        }

        let archive_directory = if directory.is_empty() {
            format!("{}/", self.dataset_name)
        } else {
            format!("{}/{}/", self.dataset_name, directory)
        };

        Ok(RecordPath {
            record_name: record_name.to_string(),
            archive_directory,
        })
    }

    /// Clinical metadata for `record_id`
    pub async fn metadata(&self, record_id: u32) -> Result<MetadataRow> {
        self.metadata_entry(record_id).await?.to_metadata_row()
    }

    /// Describe `raw` codes from the SCP statement table
    pub async fn describe_codes(&self, raw: &[DiagnosticCodeRaw]) -> Result<Vec<DiagnosticCode>> {
        if raw.is_empty() {
            return Ok(Vec::new());
        }
        let path = self.tables.ensure(TableKind::ScpCodes).await?;
        ScpStatementTable::load(path)?.describe(raw)
    }

    /// Build the record from a decoded signal and the reference tables
    pub async fn assemble(&self, record_id: u32, signal: SignalRecord) -> Result<EcgRecord> {
        if !signal.is_well_formed() {
            return Err(PhysioNetError::InvalidRecord {
                record_id,
                dataset: Some(self.dataset_name.clone()),
            });
        }

        let metadata = self.metadata(record_id).await?;
        let diagnostic_codes = self.describe_codes(&metadata.scp_codes).await?;

        Ok(EcgRecord {
            record_id,
            record_name: signal.record_name,
            database_name: self.dataset_name.clone(),
            sample_rate: signal.sampling_frequency,
            lead_names: signal.lead_names,
            leads: signal.leads,
            age: metadata.age,
            sex: metadata.sex,
            report: metadata.report,
            diagnostic_codes,
        })
    }

    async fn metadata_entry(&self, record_id: u32) -> Result<MetadataEntry> {
        let path = self.tables.ensure(TableKind::Metadata).await?;
        MetadataTable::load(path)
            .find(record_id)?
            .ok_or_else(|| PhysioNetError::invalid_record(record_id))
    }
}
