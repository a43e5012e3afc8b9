use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use textlens_core::{ChunkSink, GenerateRequest, InferenceClient, InferenceError, InstalledModel};

/// Scripted outcome of a `generate` call.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Whole text, delivered as one chunk when streaming.
    Text(String),
    Chunks(Vec<String>),
    /// Deliver these chunks, then fail.
    FailAfter(Vec<String>, InferenceError),
    Fail(InferenceError),
}

/// An inference client that returns canned responses and counts calls.
pub struct MockInferenceClient {
    models: Result<Vec<InstalledModel>, InferenceError>,
    reply: MockReply,
    streaming: bool,
    list_calls: AtomicUsize,
    generate_calls: AtomicUsize,
    last_request: Mutex<Option<GenerateRequest>>,
}

impl MockInferenceClient {
    pub fn new() -> Self {
        Self {
            models: Ok(Vec::new()),
            reply: MockReply::Text("Mock response".to_string()),
            streaming: true,
            list_calls: AtomicUsize::new(0),
            generate_calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn with_models<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models = Ok(ids.into_iter().map(InstalledModel::new).collect());
        self
    }

    pub fn with_installed(mut self, models: Vec<InstalledModel>) -> Self {
        self.models = Ok(models);
        self
    }

    /// Listing fails as if the server were down.
    pub fn unreachable(mut self) -> Self {
        let err = InferenceError::Unreachable {
            address: "http://localhost:11434".to_string(),
            reason: "connection refused".to_string(),
        };
        self.models = Err(err.clone());
        self.reply = MockReply::Fail(err);
        self
    }

    pub fn with_response(mut self, text: impl Into<String>) -> Self {
        self.reply = MockReply::Text(text.into());
        self
    }

    pub fn with_reply(mut self, reply: MockReply) -> Self {
        self.reply = reply;
        self
    }

    pub fn without_streaming(mut self) -> Self {
        self.streaming = false;
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<GenerateRequest> {
        self.last_request.lock().ok().and_then(|r| r.clone())
    }
}

impl Default for MockInferenceClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InferenceClient for MockInferenceClient {
    fn name(&self) -> &str {
        "mock"
    }

    fn supports_streaming(&self) -> bool {
        self.streaming
    }

    async fn list_installed_models(&self) -> Result<Vec<InstalledModel>, InferenceError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.models.clone()
    }

    async fn generate(
        &self,
        request: &GenerateRequest,
        on_chunk: Option<ChunkSink<'_>>,
        cancel: &CancellationToken,
    ) -> Result<String, InferenceError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }
        if cancel.is_cancelled() {
            return Err(InferenceError::Cancelled);
        }

        let sink = on_chunk.filter(|_| self.streaming);
        let forward = |chunks: &[String]| {
            if let Some(sink) = sink {
                for chunk in chunks {
                    sink(chunk.clone());
                }
            }
            chunks.concat()
        };

        match &self.reply {
            MockReply::Text(text) => Ok(forward(std::slice::from_ref(text))),
            MockReply::Chunks(chunks) => Ok(forward(chunks)),
            MockReply::FailAfter(chunks, err) => {
                forward(chunks);
                Err(err.clone())
            }
            MockReply::Fail(err) => Err(err.clone()),
        }
    }
}
