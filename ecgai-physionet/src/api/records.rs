//! Record retrieval endpoint
//!
//! `GET /record?record_id=1&sample_rate=500`, or `POST /record` with a JSON
//! body `{"record_id": 1}`. A request without a record id gets a usage hint.

use axum::{
    body::Bytes,
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub const USAGE_HINT: &str = "Get record function. Pass a record_id in the query string or in \
                              the request body to retrieve a PTB-XL record.";

/// Query string parameters, kept as text so bad values become 400s
#[derive(Debug, Default, Deserialize)]
pub struct RecordParams {
    pub record_id: Option<String>,
    pub sample_rate: Option<String>,
}

/// GET|POST /record
pub async fn get_record(
    State(state): State<AppState>,
    Query(params): Query<RecordParams>,
    body: Bytes,
) -> ApiResult<Response> {
    // Query string wins; an unparseable body is treated as absent
    let body: Option<Value> = serde_json::from_slice(&body).ok();
    let body_field = |name: &str| body.as_ref().and_then(|b| b.get(name)).and_then(field_text);

    let record_id = params.record_id.or_else(|| body_field("record_id"));
    let Some(record_id) = record_id.filter(|id| !id.trim().is_empty()) else {
        return Ok(USAGE_HINT.into_response());
    };
    let record_id = parse_number("record_id", &record_id)?;

    let sample_rate = match params.sample_rate.or_else(|| body_field("sample_rate")) {
        Some(rate) => parse_number("sample_rate", &rate)?,
        None => state.default_sample_rate,
    };

    tracing::info!(record_id, sample_rate, "Record requested");

    let record = state.ptbxl.get_record(record_id, sample_rate).await?;
    Ok(Json(record).into_response())
}

fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_number(name: &str, value: &str) -> ApiResult<u32> {
    value
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("{} must be a positive integer, got '{}'", name, value)))
}

/// Build record routes
pub fn record_routes() -> Router<AppState> {
    Router::new().route("/record", get(get_record).post(get_record))
}
