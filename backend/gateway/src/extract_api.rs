//! `POST /api/extract`: one-shot extraction returning the full result.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{field, info, instrument, Span};

use textlens_core::{ExtractionRequest, ExtractionResult, ImageData, OutputFormat};

use crate::error::ApiError;
use crate::server::GatewayState;

/// Request body shared by the plain and streaming extract endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractBody {
    /// Base64 image, optionally as a data URL.
    #[serde(alias = "image")]
    pub image_base64: String,
    pub model: String,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub output_format: OutputFormat,
}

impl From<ExtractBody> for ExtractionRequest {
    fn from(body: ExtractBody) -> Self {
        ExtractionRequest {
            image: ImageData::Base64(body.image_base64),
            model: body.model,
            prompt: body.prompt,
            output_format: body.output_format,
        }
    }
}

#[instrument(skip_all, fields(model = field::Empty))]
pub async fn extract(
    State(state): State<GatewayState>,
    body: Result<Json<ExtractBody>, JsonRejection>,
) -> Result<Json<ExtractionResult>, ApiError> {
    let Json(body) = body?;
    Span::current().record("model", body.model.as_str());
    let request = ExtractionRequest::from(body);
    let image = state.pipeline.validate(&request)?;

    let cancel = CancellationToken::new();
    match state
        .pipeline
        .extract_prepared(request, image, None, &cancel)
        .await
    {
        ExtractionResult::Failed(failure) => Err(failure.into()),
        result => {
            info!(elapsed_ms = result.processing_time_ms(), "Extraction served");
            Ok(Json(result))
        }
    }
}
