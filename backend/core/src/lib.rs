//! Core types, error taxonomy and service seams for textlens.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{ErrorKind, ExtractError, InferenceError, ValidationError};
pub use traits::{ChunkSink, GenerateOptions, GenerateRequest, InferenceClient, VisionClassifier};
pub use types::{
    Confidence, ExtractionEvent, ExtractionFailure, ExtractionRequest, ExtractionResult,
    ExtractionSuccess, ImageData, InstalledModel, ModelDisplayInfo, ModelEntry, ModelListing,
    OutputFormat, ServerStatus, DEFAULT_PROMPT,
};
