//! Decoding of inline image payloads.
//!
//! Clients send images as data URIs (`data:image/png;base64,...`). The
//! decoded bytes are stored with the recipe; the extension comes from the
//! media type in the prefix.

use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;

use crate::error::{AppError, Result};

const IMAGE_DIR: &str = "recipes/images";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBlob {
    pub data: Vec<u8>,
    pub extension: String,
}

impl ImageBlob {
    pub fn new(data: Vec<u8>, extension: impl Into<String>) -> Self {
        Self {
            data,
            extension: extension.into(),
        }
    }

    /// Fresh storage name, unique per call.
    pub fn file_name(&self, prefix: &str) -> String {
        format!(
            "{}/{}_{}.{}",
            IMAGE_DIR,
            prefix,
            uuid::Uuid::new_v4(),
            self.extension
        )
    }
}

fn data_uri_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^data:image/([A-Za-z0-9.+-]+);base64,(.*)$").expect("data URI pattern is valid")
    })
}

/// Decode a `data:image/<ext>;base64,<payload>` string.
pub fn decode_data_uri(payload: &str) -> Result<ImageBlob> {
    let captures = data_uri_re()
        .captures(payload.trim())
        .ok_or_else(|| AppError::Decode("expected a data:image/...;base64, payload".to_string()))?;

    let extension = captures[1].to_ascii_lowercase();
    let data = STANDARD
        .decode(captures[2].trim())
        .map_err(|e| AppError::Decode(format!("invalid base64 image data: {}", e)))?;

    if data.is_empty() {
        return Err(AppError::Decode("image payload is empty".to_string()));
    }

    Ok(ImageBlob { data, extension })
}
