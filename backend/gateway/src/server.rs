//! Main HTTP gateway server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, instrument};

use textlens_core::{InferenceClient, VisionClassifier};
use textlens_understanding::{ExtractionPipeline, ModelLister, PipelineOptions, StatusChecker};

use crate::{extract_api, health_api, stream_api};

/// Room for JSON framing around the base64 image.
const BODY_OVERHEAD_BYTES: usize = 64 * 1024;

/// Application state shared across routes.
#[derive(Clone)]
pub struct GatewayState {
    pub pipeline: Arc<ExtractionPipeline>,
    pub checker: Arc<StatusChecker>,
    pub lister: Arc<ModelLister>,
    pub started_at: Instant,
}

impl GatewayState {
    pub fn new(
        client: Arc<dyn InferenceClient>,
        options: PipelineOptions,
        classifier: Arc<dyn VisionClassifier>,
        preferred_family: &str,
    ) -> Self {
        let checker = Arc::new(StatusChecker::with_classifier(client.clone(), classifier));
        Self {
            pipeline: Arc::new(ExtractionPipeline::with_options(client, options)),
            lister: Arc::new(ModelLister::new(checker.clone(), preferred_family)),
            checker,
            started_at: Instant::now(),
        }
    }
}

/// Largest request body that can still carry an image at the size limit.
///
/// Leaves an eighth on top of the base64 length for line breaks, which MIME
/// encoders insert every 76 characters.
pub fn body_limit(max_image_bytes: usize) -> usize {
    let encoded = max_image_bytes.div_ceil(3) * 4;
    encoded + encoded / 8 + BODY_OVERHEAD_BYTES
}

pub fn build_router(state: GatewayState) -> Router {
    let limit = body_limit(state.pipeline.options().max_image_bytes);

    Router::new()
        .route("/api/health", get(health_api::get_health))
        .route("/api/status", get(health_api::get_status))
        .route("/api/models", get(health_api::get_models))
        .route("/api/extract", post(extract_api::extract))
        .route("/api/extract/stream", post(stream_api::extract_stream))
        .layer(DefaultBodyLimit::max(limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve on an already bound listener until ctrl-c.
pub async fn serve(listener: TcpListener, state: GatewayState) -> Result<()> {
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server failed")
}

/// Starts the HTTP server for the gateway.
#[instrument(skip(state))]
pub async fn start_server(addr: SocketAddr, state: GatewayState) -> Result<()> {
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Gateway HTTP server listening on {}", addr);
    serve(listener, state).await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
