//! HTTP error responses.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::debug;

use textlens_core::{ErrorKind, ExtractionFailure, ValidationError};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
    pub kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorBody {
                error: message.into(),
                kind: ErrorKind::Unexpected,
                hint: None,
            },
        }
    }
}

/// Status code for a failure kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Unreachable => StatusCode::FAILED_DEPENDENCY,
        ErrorKind::ModelNotFound => StatusCode::NOT_FOUND,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Cancelled | ErrorKind::Unexpected => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        let status = match err {
            ValidationError::ImageTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        };
        Self {
            status,
            body: ErrorBody {
                error: err.to_string(),
                kind: ErrorKind::Validation,
                hint: None,
            },
        }
    }
}

/// Oversized or malformed bodies keep axum's status but get the usual
/// error body.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: rejection.status(),
            body: ErrorBody {
                error: rejection.body_text(),
                kind: ErrorKind::Validation,
                hint: None,
            },
        }
    }
}

impl From<ExtractionFailure> for ApiError {
    fn from(failure: ExtractionFailure) -> Self {
        Self {
            status: status_for(failure.kind),
            body: ErrorBody {
                error: failure.message,
                kind: failure.kind,
                hint: failure.hint,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        debug!(status = %self.status, kind = ?self.body.kind, "Request failed");
        (self.status, Json(self.body)).into_response()
    }
}
