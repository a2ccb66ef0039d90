//! Reference table cache
//!
//! Keeps local copies of the two PTB-XL reference tables. A table is
//! downloaded the first time it is needed and then reused for the lifetime of
//! the data folder; there is no freshness check.

use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{PhysioNetError, Result};

const USER_AGENT: &str = concat!("ecgai-physionet/", env!("CARGO_PKG_VERSION"));
const DATABASE_METADATA_URL: &str =
    "https://www.physionet.org/files/ptb-xl/1.0.1/ptbxl_database.csv?download";
const SCP_STATEMENTS_URL: &str =
    "https://www.physionet.org/files/ptb-xl/1.0.1/scp_statements.csv?download";

static TEMP_FILE_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Which reference table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    /// Per-record metadata keyed by `ecg_id`
    Metadata,
    /// SCP statement descriptions keyed by code
    ScpCodes,
}

impl TableKind {
    pub fn canonical_url(self) -> &'static str {
        match self {
            TableKind::Metadata => DATABASE_METADATA_URL,
            TableKind::ScpCodes => SCP_STATEMENTS_URL,
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKind::Metadata => f.write_str("database metadata"),
            TableKind::ScpCodes => f.write_str("scp statements"),
        }
    }
}

/// Remote origin of the reference tables
#[async_trait]
pub trait ReferenceSource: Send + Sync {
    /// Fetch the CSV text of `kind`
    async fn fetch(&self, kind: TableKind) -> Result<String>;
}

/// [`ReferenceSource`] that downloads from the PhysioNet archive
pub struct HttpReferenceSource {
    http_client: reqwest::Client,
}

impl HttpReferenceSource {
    pub fn new() -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| PhysioNetError::Download(e.to_string()))?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl ReferenceSource for HttpReferenceSource {
    async fn fetch(&self, kind: TableKind) -> Result<String> {
        let url = kind.canonical_url();
        tracing::info!(table = %kind, url = %url, "Downloading reference table");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| PhysioNetError::Download(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PhysioNetError::Download(format!(
                "HTTP {} for {}",
                status, url
            )));
        }

        response
            .text()
            .await
            .map_err(|e| PhysioNetError::Download(e.to_string()))
    }
}

/// Local cache of the reference tables
#[derive(Clone)]
pub struct ReferenceTableCache {
    data_location: PathBuf,
    database_metadata_filename: String,
    scp_code_filename: String,
    source: Arc<dyn ReferenceSource>,
}

impl ReferenceTableCache {
    pub fn new(
        data_location: impl Into<PathBuf>,
        database_metadata_filename: impl Into<String>,
        scp_code_filename: impl Into<String>,
        source: Arc<dyn ReferenceSource>,
    ) -> Self {
        Self {
            data_location: data_location.into(),
            database_metadata_filename: database_metadata_filename.into(),
            scp_code_filename: scp_code_filename.into(),
            source,
        }
    }

    pub fn filename(&self, kind: TableKind) -> &str {
        match kind {
            TableKind::Metadata => &self.database_metadata_filename,
            TableKind::ScpCodes => &self.scp_code_filename,
        }
    }

    /// Local path of `kind`, whether or not it exists yet
    pub fn path_for(&self, kind: TableKind) -> PathBuf {
        self.data_location.join(self.filename(kind))
    }

    /// Make sure `kind` is on local storage and return its path
    ///
    /// An existing file is returned as-is. Otherwise the table is downloaded,
    /// re-encoded and persisted, and the file is checked afterwards.
    pub async fn ensure(&self, kind: TableKind) -> Result<PathBuf> {
        let path = self.path_for(kind);
        if path.is_file() {
            return Ok(path);
        }

        let content = self.source.fetch(kind).await?;
        let rows = parse_table(&content)?;

        let stored = std::fs::create_dir_all(&self.data_location)
            .map_err(PhysioNetError::from)
            .and_then(|_| write_table(&path, &rows));
        if let Err(e) = stored {
            tracing::error!(
                table = %kind,
                path = %path.display(),
                error = %e,
                "Failed to store reference table"
            );
            return Err(PhysioNetError::ReferenceDataUnavailable(
                self.filename(kind).to_string(),
            ));
        }

        if !path.is_file() {
            return Err(PhysioNetError::ReferenceDataUnavailable(
                self.filename(kind).to_string(),
            ));
        }

        tracing::info!(
            table = %kind,
            path = %path.display(),
            rows = rows.len().saturating_sub(1),
            "Reference table cached"
        );
        Ok(path)
    }
}

fn parse_table(content: &str) -> Result<Vec<csv::StringRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let rows = reader
        .records()
        .collect::<std::result::Result<Vec<_>, csv::Error>>()?;

    match rows.first() {
        Some(header) if header.len() >= 2 => Ok(rows),
        _ => Err(PhysioNetError::Parse(
            "reference table has no header row".to_string(),
        )),
    }
}

/// Write through a sibling temp file so concurrent writers never expose a
/// partial table
fn write_table(path: &Path, rows: &[csv::StringRecord]) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = path.with_file_name(format!(
        ".{}.{}-{}.tmp",
        file_name,
        std::process::id(),
        TEMP_FILE_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    let written = write_rows(&temp_path, rows)
        .and_then(|_| std::fs::rename(&temp_path, path).map_err(PhysioNetError::from));
    if written.is_err() {
        let _ = std::fs::remove_file(&temp_path);
    }
    written
}

fn write_rows(path: &Path, rows: &[csv::StringRecord]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().flexible(true).from_path(path)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}
