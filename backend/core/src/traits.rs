use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::InferenceError;
use crate::types::InstalledModel;

/// Receives generated text chunks in arrival order.
pub type ChunkSink<'a> = &'a (dyn Fn(String) + Send + Sync);

/// Sampling options forwarded to the inference server.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub num_predict: Option<u32>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            num_predict: None,
        }
    }
}

/// A single-prompt generation with attached images.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    /// Base64-encoded images, no data-URL prefix.
    pub images: Vec<String>,
    pub options: GenerateOptions,
}

/// HTTP surface of the local inference server.
///
/// Implementations perform no retries.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Client name for logs (e.g., "ollama").
    fn name(&self) -> &str;

    /// Whether `generate` can deliver incremental chunks.
    fn supports_streaming(&self) -> bool;

    /// Models currently installed on the server.
    async fn list_installed_models(&self) -> Result<Vec<InstalledModel>, InferenceError>;

    /// Run a generation and return the full text.
    ///
    /// When `on_chunk` is given and the client streams, every chunk is passed
    /// to it before the full text is returned. Cancelling `cancel` aborts the
    /// call with [`InferenceError::Cancelled`].
    async fn generate(
        &self,
        request: &GenerateRequest,
        on_chunk: Option<ChunkSink<'_>>,
        cancel: &CancellationToken,
    ) -> Result<String, InferenceError>;
}

/// Decides whether an installed model accepts image input.
pub trait VisionClassifier: Send + Sync {
    fn is_vision_capable(&self, model: &InstalledModel) -> bool;
}
