pub mod dto;
pub mod handlers;

use axum::{routing::get, Router};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use handlers::ApiDoc;

use crate::{cycle_status::CycleStatus, thresholds::ThresholdRegistry};

/// Read-only view of the monitor shared with the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub status: CycleStatus,
    pub registry: ThresholdRegistry,
}

pub fn router(state: AppState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .route("/status", get(handlers::get_status))
        .route("/thresholds", get(handlers::get_thresholds))
        .with_state(state)
        .split_for_parts();

    router
        .route("/health", get(handlers::health))
        .route(
            "/api-docs/openapi.json",
            get(move || async move { axum::Json(api) }),
        )
}
