use axum::{Json, extract::State};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    response::{ApiResponse, Meta},
    state::AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthData {
    pub status: String,
    pub database: String,
    /// Open live-update streams.
    pub subscribers: usize,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service and database reachability", body = ApiResponse<HealthData>),
    ),
    tag = "Health"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HealthData>> {
    let database = match state.orm.ping().await {
        Ok(()) => "up",
        Err(err) => {
            tracing::warn!(error = %err, "database ping failed");
            "down"
        }
    };
    let status = if database == "up" { "ok" } else { "degraded" };

    let data = HealthData {
        status: status.to_string(),
        database: database.to_string(),
        subscribers: state.feed.subscriber_count(),
    };

    Json(ApiResponse::success("Health check", data, Some(Meta::empty())))
}
