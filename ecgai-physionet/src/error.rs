//! Error types for ecgai-physionet
//!
//! `PhysioNetError` is what the dataset accessor returns. `ApiError` maps it
//! onto HTTP responses for the frontend.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::wfdb::SignalError;

/// Dataset access errors
#[derive(Debug, Error)]
pub enum PhysioNetError {
    /// Sample rate outside {100, 500}; raised before any I/O
    #[error("Invalid sample rate {0}: only 100 and 500 Hz are available")]
    InvalidSampleRate(u32),

    /// Record id absent from the metadata table, or the signal reader
    /// returned something that is not a usable record
    #[error("Invalid record {record_id}{}", dataset_suffix(.dataset))]
    InvalidRecord {
        record_id: u32,
        dataset: Option<String>,
    },

    /// Reference table missing after a download attempt
    #[error("Reference data file not available: {0}")]
    ReferenceDataUnavailable(String),

    /// SCP code without a row in the statement table
    #[error("Unknown diagnostic code: {0}")]
    UnknownDiagnosticCode(String),

    /// Reference table download failed
    #[error("Download error: {0}")]
    Download(String),

    /// Malformed reference table content
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Signal reader failure, kept as-is
    #[error(transparent)]
    Signal(#[from] SignalError),
}

fn dataset_suffix(dataset: &Option<String>) -> String {
    dataset
        .as_deref()
        .map(|d| format!(" in dataset {}", d))
        .unwrap_or_default()
}

impl PhysioNetError {
    pub fn invalid_record(record_id: u32) -> Self {
        PhysioNetError::InvalidRecord {
            record_id,
            dataset: None,
        }
    }
}

/// Result type for dataset operations
pub type Result<T> = std::result::Result<T, PhysioNetError>;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Dataset access failure
    #[error(transparent)]
    PhysioNet(#[from] PhysioNetError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::PhysioNet(err) => match err {
                PhysioNetError::InvalidSampleRate(_) => {
                    (StatusCode::BAD_REQUEST, "INVALID_SAMPLE_RATE")
                }
                PhysioNetError::InvalidRecord { .. } => (StatusCode::NOT_FOUND, "INVALID_RECORD"),
                PhysioNetError::ReferenceDataUnavailable(_) | PhysioNetError::Download(_) => {
                    (StatusCode::BAD_GATEWAY, "REFERENCE_DATA_UNAVAILABLE")
                }
                PhysioNetError::Signal(_) => (StatusCode::BAD_GATEWAY, "SIGNAL_UNAVAILABLE"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            },
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_record_message_names_dataset() {
        let err = PhysioNetError::InvalidRecord {
            record_id: 7,
            dataset: Some("ptb-xl".to_string()),
        };
        assert_eq!(err.to_string(), "Invalid record 7 in dataset ptb-xl");
        assert_eq!(
            PhysioNetError::invalid_record(7).to_string(),
            "Invalid record 7"
        );
    }

    #[test]
    fn test_status_mapping() {
        let response = ApiError::from(PhysioNetError::InvalidSampleRate(250)).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ApiError::from(PhysioNetError::invalid_record(999_999)).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response =
            ApiError::from(PhysioNetError::ReferenceDataUnavailable("x.csv".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
