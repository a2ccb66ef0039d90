//! ecgai-physionet library interface
//!
//! Programmatic access to the PTB-XL ECG dataset on PhysioNet: record path
//! resolution, cached reference tables, signal retrieval and record assembly,
//! plus the HTTP frontend built on top of them.

pub mod api;
pub mod error;
pub mod metadata;
pub mod models;
pub mod ptbxl;
pub mod reference;
pub mod scp;
pub mod wfdb;

pub use crate::error::{ApiError, ApiResult, PhysioNetError};
pub use crate::models::{DiagnosticCode, EcgRecord, SampleRate, Sex, SignalRecord};
pub use crate::ptbxl::{PtbXl, PtbXlConfig};

use axum::Router;
use chrono::{DateTime, Utc};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Dataset accessor
    pub ptbxl: PtbXl,
    /// Sample rate used when a request names none
    pub default_sample_rate: u32,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(ptbxl: PtbXl, default_sample_rate: u32) -> Self {
        Self {
            ptbxl,
            default_sample_rate,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::record_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
