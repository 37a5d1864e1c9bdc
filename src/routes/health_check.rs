use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::schemas::{HealthResponse, HealthStatus, RootResponse};

/// Liveness probe. Always answers `{"status": "ok"}`.
#[utoipa::path(
    get,
    path = "/healthcheck",
    tag = "health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn healthcheck() -> Response {
    tracing::debug!("healthcheck requested");
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: HealthStatus::Ok,
        }),
    )
        .into_response()
}

#[utoipa::path(
    get,
    path = "/",
    tag = "health",
    responses(
        (status = 200, description = "Service name and documentation location", body = RootResponse)
    )
)]
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "TaskFlow API".to_string(),
        docs: "/docs".to_string(),
    })
}
