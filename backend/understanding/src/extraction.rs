//! Extraction pipeline.
//!
//! One call walks `Validating -> Dispatching -> Streaming -> Finalizing` and
//! always ends in an [`ExtractionResult`]; errors never escape as `Err`.
//! Validation happens before any network I/O.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use textlens_core::{
    Confidence, ExtractError, ExtractionEvent, ExtractionFailure, ExtractionRequest,
    ExtractionResult, ExtractionSuccess, GenerateOptions, GenerateRequest, InferenceClient,
    ValidationError,
};
use textlens_logging::{EventLogger, ExtractionLogEvent};

use crate::format::apply_format;
use crate::image::{decode_image, encode_image, sniff_mime_type};

/// 10 MiB, measured on the decoded image.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

pub const STARTING_MESSAGE: &str = "Starting text extraction...";

/// Receives progress notes and text chunks while an extraction runs.
pub type ProgressListener<'a> = &'a (dyn Fn(ExtractionEvent) + Send + Sync);

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    pub max_image_bytes: usize,
    pub generate: GenerateOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_image_bytes: MAX_IMAGE_BYTES,
            generate: GenerateOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Validating,
    Dispatching,
    Streaming,
    Finalizing,
}

/// A request that passed validation.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub size_bytes: usize,
    pub mime_type: Option<&'static str>,
    pub base64: String,
}

pub struct ExtractionPipeline {
    client: Arc<dyn InferenceClient>,
    options: PipelineOptions,
}

impl ExtractionPipeline {
    pub fn new(client: Arc<dyn InferenceClient>) -> Self {
        Self::with_options(client, PipelineOptions::default())
    }

    pub fn with_options(client: Arc<dyn InferenceClient>, options: PipelineOptions) -> Self {
        Self { client, options }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Check the request without touching the network.
    pub fn validate(&self, request: &ExtractionRequest) -> Result<PreparedImage, ValidationError> {
        if request.model.trim().is_empty() {
            return Err(ValidationError::MissingModel);
        }

        let bytes = decode_image(&request.image)?;
        if bytes.len() > self.options.max_image_bytes {
            return Err(ValidationError::ImageTooLarge {
                size: bytes.len(),
                limit: self.options.max_image_bytes,
            });
        }

        Ok(PreparedImage {
            size_bytes: bytes.len(),
            mime_type: sniff_mime_type(&bytes),
            base64: encode_image(&bytes),
        })
    }

    /// Run an extraction with no listener and no cancellation.
    pub async fn extract(&self, request: ExtractionRequest) -> ExtractionResult {
        self.extract_with(request, None, &CancellationToken::new())
            .await
    }

    /// Run an extraction, reporting progress to `listener`.
    ///
    /// The listener may see chunks from a call that later fails; the returned
    /// result never includes them.
    pub async fn extract_with(
        &self,
        request: ExtractionRequest,
        listener: Option<ProgressListener<'_>>,
        cancel: &CancellationToken,
    ) -> ExtractionResult {
        self.execute(request, None, listener, cancel).await
    }

    /// Like [`extract_with`](Self::extract_with) for a request that already
    /// passed [`validate`](Self::validate). The request's own image payload
    /// is not decoded again.
    pub async fn extract_prepared(
        &self,
        request: ExtractionRequest,
        image: PreparedImage,
        listener: Option<ProgressListener<'_>>,
        cancel: &CancellationToken,
    ) -> ExtractionResult {
        self.execute(request, Some(image), listener, cancel).await
    }

    #[instrument(skip_all, fields(model = %request.model, format = %request.output_format))]
    async fn execute(
        &self,
        request: ExtractionRequest,
        prepared: Option<PreparedImage>,
        listener: Option<ProgressListener<'_>>,
        cancel: &CancellationToken,
    ) -> ExtractionResult {
        let started = Instant::now();
        let request_id = Uuid::new_v4().to_string();
        let mut stage = Stage::Validating;

        let outcome = self
            .run(&request, prepared, listener, cancel, &request_id, &mut stage)
            .await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok((raw_text, image_size_bytes)) => {
                stage = Stage::Finalizing;
                debug!(stage = ?stage, chars = raw_text.len(), "Formatting output");

                let confidence = if raw_text.trim().is_empty() {
                    Confidence::Low
                } else {
                    Confidence::High
                };
                let extracted_text = apply_format(&raw_text, request.output_format);
                let elapsed_ms = started.elapsed().as_millis() as u64;

                if let Some(listener) = listener {
                    listener(ExtractionEvent::Progress(format!(
                        "Extraction completed in {:.1}s",
                        elapsed_ms as f64 / 1000.0
                    )));
                }
                EventLogger::log_event(
                    &request_id,
                    ExtractionLogEvent::Completed {
                        model: request.model.clone(),
                        elapsed_ms,
                        text_chars: raw_text.chars().count(),
                        text_preview: raw_text,
                    },
                );

                ExtractionResult::Succeeded(ExtractionSuccess {
                    extracted_text,
                    model: request.model,
                    processing_time_ms: elapsed_ms,
                    image_size_bytes,
                    confidence,
                })
            }
            Err(err) => {
                warn!(stage = ?stage, kind = ?err.kind(), error = %err, "Extraction failed");
                EventLogger::log_event(
                    &request_id,
                    ExtractionLogEvent::Failed {
                        model: request.model.clone(),
                        elapsed_ms,
                        kind: err.kind().as_str().to_string(),
                        error_msg: err.to_string(),
                    },
                );

                ExtractionResult::Failed(ExtractionFailure {
                    kind: err.kind(),
                    message: err.to_string(),
                    hint: err.hint(),
                    model: request.model,
                    processing_time_ms: elapsed_ms,
                })
            }
        }
    }

    /// Validate, dispatch and collect the raw model text.
    async fn run(
        &self,
        request: &ExtractionRequest,
        prepared: Option<PreparedImage>,
        listener: Option<ProgressListener<'_>>,
        cancel: &CancellationToken,
        request_id: &str,
        stage: &mut Stage,
    ) -> Result<(String, usize), ExtractError> {
        let image = match prepared {
            Some(image) => image,
            None => self.validate(request)?,
        };
        let streaming = listener.is_some() && self.client.supports_streaming();

        *stage = Stage::Dispatching;
        EventLogger::log_event(
            request_id,
            ExtractionLogEvent::Started {
                model: request.model.clone(),
                image_bytes: image.size_bytes,
                mime_type: image.mime_type.map(str::to_string),
                streaming,
            },
        );
        if let Some(listener) = listener {
            listener(ExtractionEvent::Progress(STARTING_MESSAGE.to_string()));
        }

        let generate = GenerateRequest {
            model: request.model.clone(),
            prompt: request.effective_prompt().to_string(),
            images: vec![image.base64],
            options: self.options.generate.clone(),
        };

        *stage = Stage::Streaming;
        let text = match listener.filter(|_| streaming) {
            Some(listener) => {
                let forward = move |chunk: String| listener(ExtractionEvent::Chunk(chunk));
                self.client.generate(&generate, Some(&forward), cancel).await?
            }
            None => {
                let text = self.client.generate(&generate, None, cancel).await?;
                if let Some(listener) = listener {
                    if !text.is_empty() {
                        listener(ExtractionEvent::Chunk(text.clone()));
                    }
                }
                text
            }
        };

        Ok((text, image.size_bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockInferenceClient, MockReply};
    use base64::{engine::general_purpose::STANDARD, Engine};
    use std::sync::Mutex;
    use textlens_core::{ErrorKind, ImageData, InferenceError, OutputFormat, DEFAULT_PROMPT};

    const SMALL_JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00];

    fn jpeg_request(model: &str) -> ExtractionRequest {
        ExtractionRequest::new(model, ImageData::Base64(STANDARD.encode(SMALL_JPEG)))
    }

    fn pipeline(client: &Arc<MockInferenceClient>) -> ExtractionPipeline {
        ExtractionPipeline::new(client.clone())
    }

    #[tokio::test]
    async fn extracts_text_end_to_end() {
        let client = Arc::new(MockInferenceClient::new().with_response("INVOICE #123"));
        let request = jpeg_request("gemma3:4b")
            .with_prompt("Extract all text")
            .with_format(OutputFormat::Text);

        let result = pipeline(&client).extract(request).await;

        let ExtractionResult::Succeeded(success) = result else {
            panic!("expected success, got {result:?}");
        };
        assert_eq!(success.extracted_text, "INVOICE #123");
        assert_eq!(success.model, "gemma3:4b");
        assert_eq!(success.image_size_bytes, SMALL_JPEG.len());
        assert_eq!(success.confidence, Confidence::High);

        let sent = client.last_request().unwrap();
        assert_eq!(sent.prompt, "Extract all text");
        assert_eq!(sent.images, vec![STANDARD.encode(SMALL_JPEG)]);
    }

    #[tokio::test]
    async fn image_one_byte_over_the_limit_is_rejected_without_network() {
        let client = Arc::new(MockInferenceClient::new());
        let request = ExtractionRequest::new(
            "gemma3:4b",
            ImageData::Base64(STANDARD.encode(vec![0u8; MAX_IMAGE_BYTES + 1])),
        );

        let result = pipeline(&client).extract(request).await;

        let ExtractionResult::Failed(failure) = result else {
            panic!("expected failure");
        };
        assert_eq!(failure.kind, ErrorKind::Validation);
        assert!(failure.message.contains("exceeds"));
        assert_eq!(client.generate_calls(), 0);
    }

    #[tokio::test]
    async fn image_exactly_at_the_limit_proceeds() {
        let client = Arc::new(MockInferenceClient::new().with_response("ok"));
        let request = ExtractionRequest::new("gemma3:4b", ImageData::Bytes(vec![0u8; MAX_IMAGE_BYTES]));

        let result = pipeline(&client).extract(request).await;

        assert!(result.is_success(), "{result:?}");
        assert_eq!(client.generate_calls(), 1);
    }

    #[tokio::test]
    async fn missing_model_fails_validation() {
        let client = Arc::new(MockInferenceClient::new());
        let result = pipeline(&client).extract(jpeg_request("  ")).await;

        let ExtractionResult::Failed(failure) = result else {
            panic!("expected failure");
        };
        assert_eq!(failure.kind, ErrorKind::Validation);
        assert_eq!(client.generate_calls(), 0);
    }

    #[tokio::test]
    async fn default_prompt_and_options_are_sent() {
        let client = Arc::new(MockInferenceClient::new());
        let options = PipelineOptions {
            generate: GenerateOptions {
                temperature: 0.3,
                num_predict: Some(256),
            },
            ..PipelineOptions::default()
        };
        ExtractionPipeline::with_options(client.clone(), options)
            .extract(jpeg_request("llava:7b"))
            .await;

        let sent = client.last_request().unwrap();
        assert_eq!(sent.prompt, DEFAULT_PROMPT);
        assert_eq!(sent.options.temperature, 0.3);
        assert_eq!(sent.options.num_predict, Some(256));
    }

    #[tokio::test]
    async fn applies_json_and_markdown_formats() {
        let client = Arc::new(MockInferenceClient::new().with_response("Hello\nWorld"));

        let json = pipeline(&client)
            .extract(jpeg_request("llava:7b").with_format(OutputFormat::Json))
            .await;
        let value: serde_json::Value = serde_json::from_str(json.extracted_text()).unwrap();
        assert_eq!(value["lines"], serde_json::json!(["Hello", "World"]));
        assert_eq!(value["wordCount"], 2);

        let markdown = pipeline(&client)
            .extract(jpeg_request("llava:7b").with_format(OutputFormat::Markdown))
            .await;
        assert_eq!(markdown.extracted_text(), "# Extracted Text\n\nHello\nWorld");
    }

    #[tokio::test]
    async fn streams_chunks_between_progress_notes() {
        let client = Arc::new(MockInferenceClient::new().with_reply(MockReply::Chunks(vec![
            "INVOICE".into(),
            " #123".into(),
        ])));
        let events = Mutex::new(Vec::new());
        let listener = |event: ExtractionEvent| events.lock().unwrap().push(event);

        let result = pipeline(&client)
            .extract_with(jpeg_request("gemma3:4b"), Some(&listener), &CancellationToken::new())
            .await;

        assert_eq!(result.extracted_text(), "INVOICE #123");
        let events = events.into_inner().unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0], ExtractionEvent::Progress(STARTING_MESSAGE.into()));
        assert_eq!(events[1], ExtractionEvent::Chunk("INVOICE".into()));
        assert_eq!(events[2], ExtractionEvent::Chunk(" #123".into()));
        assert!(matches!(&events[3], ExtractionEvent::Progress(msg) if msg.starts_with("Extraction completed in")));
    }

    #[tokio::test]
    async fn non_streaming_client_delivers_one_chunk() {
        let client = Arc::new(
            MockInferenceClient::new()
                .with_reply(MockReply::Chunks(vec!["a".into(), "b".into()]))
                .without_streaming(),
        );
        let events = Mutex::new(Vec::new());
        let listener = |event: ExtractionEvent| events.lock().unwrap().push(event);

        pipeline(&client)
            .extract_with(jpeg_request("gemma3:4b"), Some(&listener), &CancellationToken::new())
            .await;

        let chunks: Vec<_> = events
            .into_inner()
            .unwrap()
            .into_iter()
            .filter(|e| matches!(e, ExtractionEvent::Chunk(_)))
            .collect();
        assert_eq!(chunks, vec![ExtractionEvent::Chunk("ab".into())]);
    }

    #[tokio::test]
    async fn mid_stream_failure_discards_partial_text() {
        let client = Arc::new(MockInferenceClient::new().with_reply(MockReply::FailAfter(
            vec!["Hel".into()],
            InferenceError::GenerationFailed("out of memory".into()),
        )));
        let events = Mutex::new(Vec::new());
        let listener = |event: ExtractionEvent| events.lock().unwrap().push(event);

        let result = pipeline(&client)
            .extract_with(jpeg_request("llava:7b"), Some(&listener), &CancellationToken::new())
            .await;

        let ExtractionResult::Failed(failure) = &result else {
            panic!("expected failure");
        };
        assert_eq!(failure.kind, ErrorKind::Unexpected);
        assert_eq!(result.extracted_text(), "");
        assert!(events
            .into_inner()
            .unwrap()
            .contains(&ExtractionEvent::Chunk("Hel".into())));
    }

    #[tokio::test]
    async fn missing_model_reports_install_hint() {
        let client = Arc::new(MockInferenceClient::new().with_reply(MockReply::Fail(
            InferenceError::ModelNotFound {
                model: "llava:34b".into(),
            },
        )));
        let result = pipeline(&client).extract(jpeg_request("llava:34b")).await;

        let ExtractionResult::Failed(failure) = result else {
            panic!("expected failure");
        };
        assert_eq!(failure.kind, ErrorKind::ModelNotFound);
        assert_eq!(failure.hint.as_deref(), Some("Install the model with `ollama pull llava:34b`"));
        assert_eq!(failure.model, "llava:34b");
    }

    #[tokio::test]
    async fn unreachable_server_is_a_result_not_an_error() {
        let client = Arc::new(MockInferenceClient::new().unreachable());
        let result = pipeline(&client).extract(jpeg_request("gemma3:4b")).await;

        let ExtractionResult::Failed(failure) = result else {
            panic!("expected failure");
        };
        assert_eq!(failure.kind, ErrorKind::Unreachable);
        assert!(failure.hint.unwrap().contains("ollama serve"));
    }

    #[tokio::test]
    async fn cancelled_token_fails_with_cancelled() {
        let client = Arc::new(MockInferenceClient::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = pipeline(&client)
            .extract_with(jpeg_request("gemma3:4b"), None, &cancel)
            .await;

        let ExtractionResult::Failed(failure) = result else {
            panic!("expected failure");
        };
        assert_eq!(failure.kind, ErrorKind::Cancelled);
    }

    #[tokio::test]
    async fn prepared_image_is_sent_without_decoding_again() {
        let client = Arc::new(MockInferenceClient::new().with_response("INVOICE #123"));
        let pipeline = pipeline(&client);
        let request = jpeg_request("gemma3:4b");
        let image = pipeline.validate(&request).unwrap();
        let encoded = image.base64.clone();

        // The payload left on the request is never looked at again.
        let request = ExtractionRequest {
            image: ImageData::Base64("not base64 !!".into()),
            ..request
        };
        let result = pipeline
            .extract_prepared(request, image, None, &CancellationToken::new())
            .await;

        assert!(result.is_success(), "{result:?}");
        assert_eq!(client.last_request().unwrap().images, vec![encoded]);
    }

    #[tokio::test]
    async fn empty_model_output_is_low_confidence() {
        let client = Arc::new(MockInferenceClient::new().with_response("   "));
        let result = pipeline(&client).extract(jpeg_request("gemma3:4b")).await;

        let ExtractionResult::Succeeded(success) = result else {
            panic!("expected success");
        };
        assert_eq!(success.confidence, Confidence::Low);
    }
}
