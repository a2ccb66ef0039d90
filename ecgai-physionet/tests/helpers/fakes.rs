//! In-memory stand-ins for the archive

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use ecgai_physionet::error::Result;
use ecgai_physionet::reference::{ReferenceSource, TableKind};
use ecgai_physionet::wfdb::{SignalError, SignalReader};
use ecgai_physionet::SignalRecord;

/// Reference source serving fixed CSV text and counting downloads
pub struct CountingSource {
    metadata: String,
    scp_codes: String,
    downloads: AtomicUsize,
}

impl CountingSource {
    pub fn new(metadata: &str, scp_codes: &str) -> Self {
        Self {
            metadata: metadata.to_string(),
            scp_codes: scp_codes.to_string(),
            downloads: AtomicUsize::new(0),
        }
    }

    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReferenceSource for CountingSource {
    async fn fetch(&self, kind: TableKind) -> Result<String> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        Ok(match kind {
            TableKind::Metadata => self.metadata.clone(),
            TableKind::ScpCodes => self.scp_codes.clone(),
        })
    }
}

/// What the fake reader hands back
#[derive(Debug, Clone)]
pub enum FakeBehavior {
    /// Two leads; sample count and frequency follow the record suffix
    Signal,
    /// A record without leads
    Empty,
    /// Archive reports the file missing
    NotFound,
}

/// Signal reader that synthesizes records and remembers what was asked
pub struct FakeSignalReader {
    behavior: FakeBehavior,
    delay: Duration,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeSignalReader {
    pub fn new() -> Self {
        Self::with_behavior(FakeBehavior::Signal)
    }

    pub fn with_behavior(behavior: FakeBehavior) -> Self {
        Self {
            behavior,
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SignalReader for FakeSignalReader {
    async fn read(
        &self,
        record_name: &str,
        archive_directory: &str,
    ) -> std::result::Result<SignalRecord, SignalError> {
        self.calls
            .lock()
            .unwrap()
            .push((record_name.to_string(), archive_directory.to_string()));

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match self.behavior {
            FakeBehavior::Signal => {
                let (frequency, samples) = if record_name.ends_with("_hr") {
                    (500.0, 50)
                } else {
                    (100.0, 10)
                };
                // Sample values carry the record number so records stay distinguishable
                let seed: f64 = record_name
                    .split('_')
                    .next()
                    .and_then(|n| n.parse().ok())
                    .unwrap_or(0.0);

                Ok(SignalRecord {
                    record_name: record_name.to_string(),
                    sampling_frequency: frequency,
                    lead_names: vec!["I".to_string(), "II".to_string()],
                    leads: vec![vec![seed; samples], vec![-seed; samples]],
                })
            }
            FakeBehavior::Empty => Ok(SignalRecord {
                record_name: record_name.to_string(),
                sampling_frequency: 100.0,
                lead_names: Vec::new(),
                leads: Vec::new(),
            }),
            FakeBehavior::NotFound => Err(SignalError::NotFound(format!(
                "{}{}.hea",
                archive_directory, record_name
            ))),
        }
    }
}
