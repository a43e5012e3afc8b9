use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Request validation failures. Always raised before any network call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("image is {size} bytes, which exceeds the {limit} byte limit")]
    ImageTooLarge { size: usize, limit: usize },

    #[error("image payload is empty")]
    EmptyImage,

    #[error("image payload is not valid base64: {0}")]
    InvalidBase64(String),

    #[error("no model was selected")]
    MissingModel,
}

/// Failures talking to the inference server.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InferenceError {
    #[error("cannot reach the inference server at {address}: {reason}")]
    Unreachable { address: String, reason: String },

    #[error("model '{model}' is not installed on the inference server")]
    ModelNotFound { model: String },

    #[error("generation did not finish within {seconds}s")]
    Timeout { seconds: u64 },

    #[error("generation was cancelled")]
    Cancelled,

    #[error("inference server returned {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("generation failed: {0}")]
    GenerationFailed(String),

    #[error("invalid response from the inference server: {0}")]
    InvalidResponse(String),
}

/// Any failure an extraction can end in.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

/// Coarse classification of a failure, stable across the wire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Unreachable,
    ModelNotFound,
    Timeout,
    Cancelled,
    Unexpected,
}

impl ErrorKind {
    /// Wire name, matching the serde form.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Unreachable => "unreachable",
            ErrorKind::ModelNotFound => "model_not_found",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Unexpected => "unexpected",
        }
    }
}

impl InferenceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            InferenceError::Unreachable { .. } => ErrorKind::Unreachable,
            InferenceError::ModelNotFound { .. } => ErrorKind::ModelNotFound,
            InferenceError::Timeout { .. } => ErrorKind::Timeout,
            InferenceError::Cancelled => ErrorKind::Cancelled,
            InferenceError::ServerError { .. }
            | InferenceError::GenerationFailed(_)
            | InferenceError::InvalidResponse(_) => ErrorKind::Unexpected,
        }
    }

    /// Remediation the user can act on, if there is one.
    pub fn hint(&self) -> Option<String> {
        match self {
            InferenceError::Unreachable { .. } => {
                Some("Start the inference server with `ollama serve`".to_string())
            }
            InferenceError::ModelNotFound { model } => {
                Some(format!("Install the model with `ollama pull {model}`"))
            }
            _ => None,
        }
    }
}

impl ExtractError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractError::Validation(_) => ErrorKind::Validation,
            ExtractError::Inference(e) => e.kind(),
        }
    }

    pub fn hint(&self) -> Option<String> {
        match self {
            ExtractError::Validation(_) => None,
            ExtractError::Inference(e) => e.hint(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_not_found_carries_install_hint() {
        let err = InferenceError::ModelNotFound {
            model: "gemma3:4b".into(),
        };
        assert_eq!(err.kind(), ErrorKind::ModelNotFound);
        assert_eq!(
            err.hint().as_deref(),
            Some("Install the model with `ollama pull gemma3:4b`")
        );
    }

    #[test]
    fn validation_errors_have_no_hint() {
        let err = ExtractError::from(ValidationError::ImageTooLarge {
            size: 11,
            limit: 10,
        });
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.hint().is_none());
        assert!(err.to_string().contains("exceeds the 10 byte limit"));
    }

    #[test]
    fn server_errors_are_unexpected() {
        let err = InferenceError::ServerError {
            status: 500,
            body: "boom".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Unexpected);
    }

    #[test]
    fn error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::ModelNotFound).unwrap();
        assert_eq!(json, "\"model_not_found\"");
    }

    #[test]
    fn error_kind_names_match_serde() {
        for kind in [
            ErrorKind::Validation,
            ErrorKind::Unreachable,
            ErrorKind::ModelNotFound,
            ErrorKind::Timeout,
            ErrorKind::Cancelled,
            ErrorKind::Unexpected,
        ] {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, kind.as_str());
        }
    }
}
