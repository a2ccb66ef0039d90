//! SCP statement table (`scp_statements.csv`) and diagnostic code enrichment

use std::collections::HashMap;
use std::path::Path;

use crate::error::{PhysioNetError, Result};
use crate::models::{DiagnosticCode, DiagnosticCodeRaw};

/// Code → description lookup
///
/// The first column holds the code and the second the description; header
/// names are not relied upon since the archive leaves the code column unnamed.
#[derive(Debug, Clone, Default)]
pub struct ScpStatementTable {
    descriptions: HashMap<String, String>,
}

impl ScpStatementTable {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)?;

        let mut descriptions = HashMap::new();
        for record in reader.records() {
            let record = record?;
            let (Some(code), Some(description)) = (record.get(0), record.get(1)) else {
                continue;
            };
            descriptions.insert(code.trim().to_string(), description.to_string());
        }

        Ok(Self { descriptions })
    }

    pub fn len(&self) -> usize {
        self.descriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptions.is_empty()
    }

    pub fn description(&self, code: &str) -> Option<&str> {
        self.descriptions.get(code).map(String::as_str)
    }

    /// Attach descriptions to `raw`, keeping order and length
    ///
    /// A code missing from the table fails the whole call.
    pub fn describe(&self, raw: &[DiagnosticCodeRaw]) -> Result<Vec<DiagnosticCode>> {
        raw.iter()
            .map(|item| {
                let description = self
                    .description(&item.code)
                    .ok_or_else(|| PhysioNetError::UnknownDiagnosticCode(item.code.clone()))?;

                Ok(DiagnosticCode {
                    scp_code: item.code.clone(),
                    description: description.to_string(),
                    confidence: item.confidence,
                })
            })
            .collect()
    }
}

impl FromIterator<(String, String)> for ScpStatementTable {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            descriptions: iter.into_iter().collect(),
        }
    }
}
