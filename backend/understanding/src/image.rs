//! Image payload decoding and MIME detection.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine};
use textlens_core::{ImageData, ValidationError};

/// Decode a caller-supplied payload to raw bytes.
///
/// Base64 input may carry a `data:<mime>;base64,` prefix and whitespace.
pub fn decode_image(image: &ImageData) -> Result<Vec<u8>, ValidationError> {
    let bytes = match image {
        ImageData::Bytes(bytes) => bytes.clone(),
        ImageData::Base64(text) => {
            let payload = strip_data_url(text);
            let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
            STANDARD
                .decode(compact.as_bytes())
                .map_err(|e| ValidationError::InvalidBase64(e.to_string()))?
        }
    };

    if bytes.is_empty() {
        return Err(ValidationError::EmptyImage);
    }
    Ok(bytes)
}

/// Drop a `data:...;base64,` prefix if present.
pub fn strip_data_url(text: &str) -> &str {
    let trimmed = text.trim_start();
    if trimmed.starts_with("data:") {
        if let Some((_, rest)) = trimmed.split_once(',') {
            return rest;
        }
    }
    trimmed
}

/// Detect an image MIME type from magic bytes.
pub fn sniff_mime_type(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some("image/png"),
        [b'G', b'I', b'F', b'8', ..] => Some("image/gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        [b'B', b'M', ..] => Some("image/bmp"),
        [b'I', b'I', 0x2A, 0x00, ..] | [b'M', b'M', 0x00, 0x2A, ..] => Some("image/tiff"),
        _ => None,
    }
}

/// Detect an image MIME type by file extension.
pub fn mime_from_path(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        "tiff" | "tif" => Some("image/tiff"),
        _ => None,
    }
}

/// Encode raw bytes for the inference server (no data-URL prefix).
pub fn encode_image(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}
