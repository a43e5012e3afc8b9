//! `textlens extract`: run one extraction against an image file.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use textlens_core::{
    ExtractionEvent, ExtractionRequest, ExtractionResult, ImageData, InferenceClient, OutputFormat,
};
use textlens_understanding::{mime_from_path, ExtractionPipeline, PipelineOptions, ProgressListener};

use crate::terminal_output::{note_dim, note_error, stream_write};

#[derive(Debug, Clone)]
pub struct ExtractArgs {
    pub image: PathBuf,
    pub model: String,
    pub prompt: Option<String>,
    pub format: OutputFormat,
    pub stream: bool,
}

pub async fn run(
    client: Arc<dyn InferenceClient>,
    options: PipelineOptions,
    args: ExtractArgs,
) -> Result<()> {
    let bytes = tokio::fs::read(&args.image)
        .await
        .with_context(|| format!("failed to read {}", args.image.display()))?;
    let mime = mime_from_path(&args.image);
    debug!(path = %args.image.display(), mime = ?mime, bytes = bytes.len(), "Loaded image");
    if mime.is_none() {
        note_dim("Unrecognized image extension, sending the file as-is");
    }

    let mut request = ExtractionRequest::new(args.model, ImageData::Bytes(bytes)).with_format(args.format);
    if let Some(prompt) = args.prompt {
        request = request.with_prompt(prompt);
    }

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    // Raw chunks only match the final output for plain text.
    let echo_chunks = args.format == OutputFormat::Text;
    let echoed = AtomicBool::new(false);
    let on_event = |event: ExtractionEvent| match event {
        ExtractionEvent::Progress(message) => note_dim(&message),
        ExtractionEvent::Chunk(text) if echo_chunks => {
            if stream_write(&mut std::io::stdout(), &text).is_ok() {
                echoed.store(true, Ordering::Relaxed);
            }
        }
        ExtractionEvent::Chunk(_) => {}
    };
    let listener = args.stream.then_some(&on_event as ProgressListener<'_>);

    let pipeline = ExtractionPipeline::with_options(client, options);
    let result = pipeline.extract_with(request, listener, &cancel).await;
    watcher.abort();

    match result {
        ExtractionResult::Succeeded(success) => {
            if echoed.load(Ordering::Relaxed) {
                println!();
            } else {
                println!("{}", success.extracted_text);
            }
            note_dim(&format!(
                "{} | {} ms | {} bytes | confidence {:?}",
                success.model, success.processing_time_ms, success.image_size_bytes, success.confidence
            ));
            Ok(())
        }
        ExtractionResult::Failed(failure) => {
            note_error(&failure.message);
            if let Some(hint) = &failure.hint {
                note_dim(hint);
            }
            bail!("extraction failed after {} ms", failure.processing_time_ms)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use textlens_core::InferenceError;
    use textlens_understanding::{MockInferenceClient, MockReply};

    fn write_image(bytes: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("textlens-{}.png", uuid::Uuid::new_v4()));
        std::fs::write(&path, bytes).unwrap();
        path
    }

    fn args(image: PathBuf, stream: bool) -> ExtractArgs {
        ExtractArgs {
            image,
            model: "gemma3:4b".into(),
            prompt: None,
            format: OutputFormat::Text,
            stream,
        }
    }

    #[tokio::test]
    async fn extracts_from_a_file() {
        let path = write_image(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
        let client = Arc::new(MockInferenceClient::new().with_response("INVOICE #123"));

        run(client.clone(), PipelineOptions::default(), args(path.clone(), true))
            .await
            .unwrap();

        assert_eq!(client.generate_calls(), 1);
        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let client = Arc::new(MockInferenceClient::new());
        let err = run(
            client.clone(),
            PipelineOptions::default(),
            args(PathBuf::from("/nonexistent/textlens.png"), false),
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("failed to read"));
        assert_eq!(client.generate_calls(), 0);
    }

    #[tokio::test]
    async fn failed_extraction_exits_with_error() {
        let path = write_image(b"not really an image");
        let client = Arc::new(MockInferenceClient::new().with_reply(MockReply::Fail(
            InferenceError::ModelNotFound {
                model: "gemma3:4b".into(),
            },
        )));

        let result = run(client, PipelineOptions::default(), args(path.clone(), false)).await;

        assert!(result.is_err());
        std::fs::remove_file(path).ok();
    }
}
