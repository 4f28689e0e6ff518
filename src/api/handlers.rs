use axum::{extract::State, Json};
use utoipa::OpenApi;

use super::{
    dto::{CycleReportDto, StatusDto, ThresholdDto},
    AppState,
};

/// Outcome of the most recent threshold check plus running totals.
#[utoipa::path(
    get,
    path = "/status",
    responses(
        (status = 200, description = "Monitor status", body = StatusDto),
    ),
    tag = "monitor"
)]
pub async fn get_status(State(state): State<AppState>) -> Json<StatusDto> {
    Json(state.status.snapshot().await.into())
}

/// Acceptable range per monitored sensor, ordered by sensor id.
#[utoipa::path(
    get,
    path = "/thresholds",
    responses(
        (status = 200, description = "Threshold registry", body = Vec<ThresholdDto>),
    ),
    tag = "monitor"
)]
pub async fn get_thresholds(State(state): State<AppState>) -> Json<Vec<ThresholdDto>> {
    Json(
        state
            .registry
            .iter()
            .map(|(sensor_id, range)| ThresholdDto {
                sensor_id,
                low: range.low,
                high: range.high,
            })
            .collect(),
    )
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Returns `200 OK` with `{"status":"ok"}` when the process is running.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
    ),
    tag = "system"
)]
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// OpenAPI spec
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(get_status, get_thresholds, health),
    components(schemas(StatusDto, CycleReportDto, ThresholdDto)),
    tags(
        (name = "monitor", description = "Threshold monitor endpoints"),
        (name = "system",  description = "System endpoints"),
    ),
    info(
        title = "Compost Monitor API",
        version = "0.1.0",
        description = "Status of the compost threshold monitor"
    )
)]
pub struct ApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
