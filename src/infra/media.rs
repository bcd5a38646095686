//! Helpers shared by the media store adapters.

use crate::error::{InspectionError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};

/// Raster formats only: uploads are served from our own origin, so nothing scriptable.
const ALLOWED_IMAGE_TYPES: [&str; 5] =
    ["image/png", "image/jpeg", "image/jpg", "image/webp", "image/gif"];

/// A decoded `data:<mime>;base64,<payload>` URL.
#[derive(Debug, Clone, PartialEq)]
pub struct DataUrl {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

pub fn is_data_url(value: &str) -> bool {
    value.trim_start().starts_with("data:")
}

pub fn decode_data_url(value: &str) -> Result<DataUrl> {
    let rest = value
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| InspectionError::Media("not a data URL".to_string()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| InspectionError::Media("data URL has no payload".to_string()))?;
    let content_type = meta
        .strip_suffix(";base64")
        .ok_or_else(|| InspectionError::Media("only base64 data URLs are supported".to_string()))?;
    let content_type = content_type.trim().to_ascii_lowercase();
    if !ALLOWED_IMAGE_TYPES.contains(&content_type.as_str()) {
        return Err(InspectionError::Media(format!(
            "unsupported image type '{content_type}'"
        )));
    }
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| InspectionError::Media(format!("invalid base64 payload: {e}")))?;
    if bytes.is_empty() {
        return Err(InspectionError::Media("data URL payload is empty".to_string()));
    }
    Ok(DataUrl {
        content_type,
        bytes,
    })
}

pub fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "bin",
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Content-addressed object key: `<folder>/<aa>/<sha256>.<ext>`.
pub fn object_key(folder: &str, bytes: &[u8], content_type: &str) -> Result<String> {
    let folder = folder.trim_matches('/');
    if folder.split('/').any(|segment| segment == ".." || segment == ".") {
        return Err(InspectionError::Media(format!("invalid media folder '{folder}'")));
    }
    let hex = sha256_hex(bytes);
    let file = format!("{}/{}.{}", &hex[0..2], hex, extension_for(content_type));
    Ok(if folder.is_empty() {
        file
    } else {
        format!("{folder}/{file}")
    })
}
