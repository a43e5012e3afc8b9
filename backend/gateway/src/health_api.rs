//! Health, server status and model listing endpoints.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use textlens_core::{ModelListing, ServerStatus};

use crate::server::GatewayState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: &'static str,
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Utc>,
}

/// Handler for `GET /api/health`. Reports on this process only.
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthReport> {
    Json(HealthReport {
        status: "ok",
        uptime_seconds: state.started_at.elapsed().as_secs(),
        timestamp: Utc::now(),
    })
}

/// Handler for `GET /api/status`.
pub async fn get_status(State(state): State<GatewayState>) -> Json<ServerStatus> {
    Json(state.checker.check().await)
}

/// Handler for `GET /api/models`.
pub async fn get_models(State(state): State<GatewayState>) -> Json<ModelListing> {
    Json(state.lister.list().await)
}
