//! Ollama inference server client.
//!
//! Wraps `GET /api/tags` and `POST /api/generate`. Streaming responses are
//! newline-delimited JSON objects, each carrying a partial `response`.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use textlens_core::{ChunkSink, GenerateRequest, InferenceClient, InferenceError, InstalledModel};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_LIST_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_GENERATE_TIMEOUT: Duration = Duration::from_secs(120);

/// Client for a local Ollama server.
pub struct OllamaClient {
    client: Client,
    base_url: String,
    list_timeout: Duration,
    generate_timeout: Duration,
}

impl OllamaClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            list_timeout: DEFAULT_LIST_TIMEOUT,
            generate_timeout: DEFAULT_GENERATE_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeouts(mut self, list: Duration, generate: Duration) -> Self {
        self.list_timeout = list;
        self.generate_timeout = generate;
        self
    }

    fn unreachable(&self, reason: impl Into<String>) -> InferenceError {
        InferenceError::Unreachable {
            address: self.base_url.clone(),
            reason: reason.into(),
        }
    }

    fn timeout(&self) -> InferenceError {
        InferenceError::Timeout {
            seconds: self.generate_timeout.as_secs(),
        }
    }

    fn map_send_error(&self, err: reqwest::Error) -> InferenceError {
        if err.is_timeout() {
            self.timeout()
        } else {
            self.unreachable(err.to_string())
        }
    }

    /// Turn a non-2xx generate response into a typed error.
    async fn check_generate_status(
        &self,
        response: Response,
        model: &str,
    ) -> Result<Response, InferenceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|e| e.error)
            .unwrap_or(body);

        if status == StatusCode::NOT_FOUND || mentions_missing_model(&message) {
            return Err(InferenceError::ModelNotFound {
                model: model.to_string(),
            });
        }
        Err(InferenceError::ServerError {
            status: status.as_u16(),
            body: message,
        })
    }

    async fn read_full(
        &self,
        response: Response,
        model: &str,
        cancel: &CancellationToken,
    ) -> Result<String, InferenceError> {
        let body = tokio::select! {
            _ = cancel.cancelled() => return Err(InferenceError::Cancelled),
            body = response.bytes() => body.map_err(|e| self.map_send_error(e))?,
        };
        let chunk: GenerateChunk = serde_json::from_slice(&body)
            .map_err(|e| InferenceError::InvalidResponse(e.to_string()))?;
        if let Some(error) = chunk.error {
            return Err(generation_error(model, error));
        }
        Ok(chunk.response)
    }

    async fn read_stream(
        &self,
        response: Response,
        model: &str,
        on_chunk: ChunkSink<'_>,
        cancel: &CancellationToken,
    ) -> Result<String, InferenceError> {
        let mut stream = response.bytes_stream();
        let mut pending: Vec<u8> = Vec::new();
        let mut full_text = String::new();

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => return Err(InferenceError::Cancelled),
                next = tokio::time::timeout(self.generate_timeout, stream.next()) => next,
            };

            let bytes = match next {
                Err(_) => return Err(self.timeout()),
                Ok(None) => break,
                Ok(Some(Err(e))) => {
                    return Err(self.unreachable(format!("connection lost mid-stream: {e}")))
                }
                Ok(Some(Ok(bytes))) => bytes,
            };

            // A JSON line may be split across network chunks
            pending.extend_from_slice(&bytes);
            while let Some(pos) = pending.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = pending.drain(..=pos).collect();
                if handle_stream_line(&line, model, on_chunk, &mut full_text)? {
                    return Ok(full_text);
                }
            }
        }

        if handle_stream_line(&pending, model, on_chunk, &mut full_text)? {
            return Ok(full_text);
        }
        Err(InferenceError::InvalidResponse(
            "stream ended before the final chunk".to_string(),
        ))
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct TagEntry {
    name: String,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    details: Option<TagDetails>,
}

#[derive(Deserialize)]
struct TagDetails {
    #[serde(default)]
    families: Option<Vec<String>>,
}

#[derive(Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    images: &'a [String],
    stream: bool,
    options: GenerateBodyOptions,
}

#[derive(Serialize)]
struct GenerateBodyOptions {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

fn mentions_missing_model(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("model") && lower.contains("not found")
}

fn generation_error(model: &str, message: String) -> InferenceError {
    if mentions_missing_model(&message) {
        InferenceError::ModelNotFound {
            model: model.to_string(),
        }
    } else {
        InferenceError::GenerationFailed(message)
    }
}

/// Parse one NDJSON line, forward its text, and report whether it was final.
fn handle_stream_line(
    line: &[u8],
    model: &str,
    on_chunk: ChunkSink<'_>,
    full_text: &mut String,
) -> Result<bool, InferenceError> {
    let trimmed = line.trim_ascii();
    if trimmed.is_empty() {
        return Ok(false);
    }

    let chunk: GenerateChunk = serde_json::from_slice(trimmed)
        .map_err(|e| InferenceError::InvalidResponse(e.to_string()))?;

    if let Some(error) = chunk.error {
        return Err(generation_error(model, error));
    }
    if !chunk.response.is_empty() {
        full_text.push_str(&chunk.response);
        on_chunk(chunk.response);
    }
    Ok(chunk.done)
}

fn parse_installed(raw: serde_json::Value) -> Option<InstalledModel> {
    match serde_json::from_value::<TagEntry>(raw.clone()) {
        Ok(entry) => Some(InstalledModel {
            identifier: entry.name,
            size_bytes: entry.size,
            families: entry.details.and_then(|d| d.families).unwrap_or_default(),
            raw,
        }),
        Err(e) => {
            warn!(error = %e, "Skipping malformed model entry");
            None
        }
    }
}

#[async_trait]
impl InferenceClient for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    async fn list_installed_models(&self) -> Result<Vec<InstalledModel>, InferenceError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .timeout(self.list_timeout)
            .send()
            .await
            .map_err(|e| self.unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.unreachable(format!("server responded {status}")));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::InvalidResponse(e.to_string()))?;

        let models: Vec<_> = tags.models.into_iter().filter_map(parse_installed).collect();
        debug!(count = models.len(), "Listed installed models");
        Ok(models)
    }

    async fn generate(
        &self,
        request: &GenerateRequest,
        on_chunk: Option<ChunkSink<'_>>,
        cancel: &CancellationToken,
    ) -> Result<String, InferenceError> {
        let stream = on_chunk.is_some();
        let body = GenerateBody {
            model: &request.model,
            prompt: &request.prompt,
            images: &request.images,
            stream,
            options: GenerateBodyOptions {
                temperature: request.options.temperature,
                num_predict: request.options.num_predict,
            },
        };

        debug!(model = %request.model, stream, images = request.images.len(), "Sending generate request");

        let mut builder = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body);
        if !stream {
            builder = builder.timeout(self.generate_timeout);
        }

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(InferenceError::Cancelled),
            sent = tokio::time::timeout(self.generate_timeout, builder.send()) => match sent {
                Err(_) => return Err(self.timeout()),
                Ok(result) => result.map_err(|e| self.map_send_error(e))?,
            },
        };
        let response = self.check_generate_status(response, &request.model).await?;

        match on_chunk {
            Some(sink) => self.read_stream(response, &request.model, sink, cancel).await,
            None => self.read_full(response, &request.model, cancel).await,
        }
    }
}
