//! Vision-model text extraction: model catalog, inference client, status
//! checks, the extraction pipeline and the model listing service.

pub mod catalog;
pub mod extraction;
pub mod format;
pub mod image;
pub mod listing;
pub mod mock;
pub mod ollama;
pub mod status;

pub use catalog::{
    classifier_by_name, classify_vision, display_info, family_of, size_hint, MetadataClassifier,
    PatternClassifier,
};
pub use extraction::{
    ExtractionPipeline, PipelineOptions, PreparedImage, ProgressListener, MAX_IMAGE_BYTES,
};
pub use format::apply_format;
pub use image::{decode_image, encode_image, mime_from_path, sniff_mime_type};
pub use listing::ModelLister;
pub use mock::{MockInferenceClient, MockReply};
pub use ollama::OllamaClient;
pub use status::StatusChecker;
