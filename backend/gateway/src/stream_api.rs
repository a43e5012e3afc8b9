//! Streaming extraction over Server-Sent Events.
//!
//! Emits `progress` and `chunk` events while the model generates, then one
//! terminal `result` event. A failure before the first chunk is answered with
//! a plain HTTP error instead of an event stream. Dropping the connection
//! cancels the generation.

use std::convert::Infallible;

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::{stream, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, field, info, instrument, warn, Span};

use textlens_core::{ExtractionEvent, ExtractionRequest, ExtractionResult};

use crate::error::ApiError;
use crate::extract_api::ExtractBody;
use crate::server::GatewayState;

#[derive(Debug)]
enum StreamMessage {
    Event(ExtractionEvent),
    Result(ExtractionResult),
}

impl StreamMessage {
    fn into_sse(self) -> Event {
        match self {
            StreamMessage::Event(event @ ExtractionEvent::Progress(_)) => sse_event("progress", &event),
            StreamMessage::Event(event @ ExtractionEvent::Chunk(_)) => sse_event("chunk", &event),
            StreamMessage::Result(result) => sse_event("result", &result),
        }
    }
}

fn sse_event(name: &str, payload: &impl Serialize) -> Event {
    Event::default()
        .event(name)
        .json_data(payload)
        .unwrap_or_else(|e| {
            warn!(error = %e, event = name, "Failed to serialize SSE payload");
            Event::default().event("error").data("serialization failed")
        })
}

/// Handler for `POST /api/extract/stream`.
#[instrument(skip_all, fields(model = field::Empty))]
pub async fn extract_stream(
    State(state): State<GatewayState>,
    body: Result<Json<ExtractBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    Span::current().record("model", body.model.as_str());
    let request = ExtractionRequest::from(body);
    let image = state.pipeline.validate(&request)?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();

    let pipeline = state.pipeline.clone();
    let task_cancel = cancel.clone();
    tokio::spawn(async move {
        let events = tx.clone();
        let listener = move |event: ExtractionEvent| {
            let _ = events.send(StreamMessage::Event(event));
        };
        let result = pipeline
            .extract_prepared(request, image, Some(&listener), &task_cancel)
            .await;
        if tx.send(StreamMessage::Result(result)).is_err() {
            debug!("Stream client went away before the result");
        }
    });

    // Cancels the run if the client leaves, whether before or after the
    // stream opens.
    let guard = cancel.drop_guard();

    // Hold progress notes back until there is text or an outcome.
    let mut head = Vec::new();
    loop {
        match rx.recv().await {
            Some(StreamMessage::Result(ExtractionResult::Failed(failure))) => {
                return Err(failure.into());
            }
            Some(message @ StreamMessage::Event(ExtractionEvent::Progress(_))) => {
                head.push(message);
            }
            Some(message) => {
                head.push(message);
                break;
            }
            None => return Err(ApiError::internal("extraction ended without a result")),
        }
    }

    info!("Opening extraction event stream");
    let events = stream::iter(head)
        .chain(UnboundedReceiverStream::new(rx))
        .map(move |message| {
            let _ = &guard;
            Ok::<_, Infallible>(message.into_sse())
        });

    Ok(Sse::new(events)
        .keep_alive(KeepAlive::default())
        .into_response())
}
