//! # Content Pipeline
//!
//! Turns caller content into an [`InscriptionContent`]: the exact bytes and
//! tags that end up in the reveal script.
//!
//! ```text
//! ContentInput ──> validate_content ──> prepare_content ──> InscriptionContent
//!                       │                                        │
//!                  size ceiling                          chunk_content (optional)
//!                  JSON must parse
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::mime::{self, APPLICATION_JSON};
use crate::config::MAX_CONTENT_SIZE_BYTES;
use crate::crypto::hash::sha256_hex;
use crate::error::{BtcoError, BtcoResult};
use crate::proof::canonical::canonical_bytes;

/// Raw content handed to the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentInput {
    /// UTF-8 text. JSON text is re-serialized canonically.
    Text(String),
    /// Opaque bytes, inscribed as-is.
    Binary(Vec<u8>),
}

impl ContentInput {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            ContentInput::Text(s) => s.as_bytes(),
            ContentInput::Binary(b) => b,
        }
    }
}

impl From<&str> for ContentInput {
    fn from(value: &str) -> Self {
        ContentInput::Text(value.to_string())
    }
}

impl From<String> for ContentInput {
    fn from(value: String) -> Self {
        ContentInput::Text(value)
    }
}

impl From<Vec<u8>> for ContentInput {
    fn from(value: Vec<u8>) -> Self {
        ContentInput::Binary(value)
    }
}

impl From<&[u8]> for ContentInput {
    fn from(value: &[u8]) -> Self {
        ContentInput::Binary(value.to_vec())
    }
}

/// Content ready to be written into an inscription envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InscriptionContent {
    pub content_type: String,
    #[serde(with = "hex_bytes")]
    pub body: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    /// Output offset the inscription should be bound to, if not the first sat.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pointer: Option<u64>,
}

impl InscriptionContent {
    pub fn size(&self) -> usize {
        self.body.len()
    }

    /// The body as text, if it is valid UTF-8.
    pub fn body_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    pub fn info(&self) -> ContentInfo {
        content_info(&self.body, &self.content_type)
    }
}

/// Descriptive facts about a piece of content, embedded in credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentInfo {
    pub mime_type: String,
    /// Hex SHA-256 of the content bytes.
    pub hash: String,
    pub size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
    /// Playback length in seconds, for audio and video.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

/// Pixel size of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

// ---------------------------------------------------------------------------
// Pipeline Steps
// ---------------------------------------------------------------------------

/// Check the size ceiling and, for JSON, that the bytes parse.
pub fn validate_content(content: &[u8], content_type: &str) -> BtcoResult<()> {
    validate_content_with_limit(content, content_type, MAX_CONTENT_SIZE_BYTES)
}

/// [`validate_content`] against a caller-chosen ceiling.
pub fn validate_content_with_limit(content: &[u8], content_type: &str, max: usize) -> BtcoResult<()> {
    if content.len() > max {
        return Err(BtcoError::ContentTooLarge {
            size: content.len(),
            max,
        });
    }
    if mime::base_type(content_type) == APPLICATION_JSON {
        serde_json::from_slice::<Value>(content)
            .map_err(|e| BtcoError::InvalidJson(e.to_string()))?;
    }
    Ok(())
}

/// Validate and normalize content into an inscription payload.
///
/// JSON text is parsed and written back in canonical form so that two
/// equivalent documents inscribe identical bytes. Binary content and every
/// other text type pass through untouched.
pub fn prepare_content(
    content: impl Into<ContentInput>,
    content_type: &str,
    metadata: Option<Value>,
    pointer: Option<u64>,
) -> BtcoResult<InscriptionContent> {
    let content = content.into();
    if content_type.trim().is_empty() {
        return Err(BtcoError::InvalidInput("content type must not be empty".into()));
    }
    validate_content(content.as_bytes(), content_type)?;

    let body = match content {
        ContentInput::Text(text) if mime::base_type(content_type) == APPLICATION_JSON => {
            let value: Value =
                serde_json::from_str(&text).map_err(|e| BtcoError::InvalidJson(e.to_string()))?;
            canonical_bytes(&value)
        }
        ContentInput::Text(text) => text.into_bytes(),
        ContentInput::Binary(bytes) => bytes,
    };

    Ok(InscriptionContent {
        content_type: content_type.to_string(),
        body,
        metadata,
        pointer,
    })
}

/// Split `content` into pieces of at most `chunk_size` bytes.
///
/// Concatenating the result gives back `content` exactly.
pub fn chunk_content(content: &[u8], chunk_size: usize) -> BtcoResult<Vec<Vec<u8>>> {
    if chunk_size == 0 {
        return Err(BtcoError::InvalidInput("chunk size must be positive".into()));
    }
    Ok(content.chunks(chunk_size).map(<[u8]>::to_vec).collect())
}

/// Hash, size and (for PNG/GIF) pixel dimensions of `content`.
pub fn content_info(content: &[u8], mime_type: &str) -> ContentInfo {
    ContentInfo {
        mime_type: mime_type.to_string(),
        hash: sha256_hex(content),
        size: content.len(),
        dimensions: image_dimensions(content, mime::base_type(mime_type)),
        duration: None,
    }
}

fn image_dimensions(content: &[u8], mime_type: &str) -> Option<Dimensions> {
    match mime_type {
        // IHDR is always the first chunk: width and height are big-endian at 16..24.
        "image/png" if content.len() >= 24 && &content[12..16] == b"IHDR" => Some(Dimensions {
            width: u32::from_be_bytes(content[16..20].try_into().ok()?),
            height: u32::from_be_bytes(content[20..24].try_into().ok()?),
        }),
        // Logical screen descriptor, little-endian u16s at 6..10.
        "image/gif" if content.len() >= 10 => Some(Dimensions {
            width: u16::from_le_bytes([content[6], content[7]]) as u32,
            height: u16::from_le_bytes([content[8], content[9]]) as u32,
        }),
        _ => None,
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn oversized_content_rejected() {
        let big = vec![0u8; MAX_CONTENT_SIZE_BYTES + 1];
        let err = validate_content(&big, "application/octet-stream").unwrap_err();
        assert_eq!(err.code(), "CONTENT_TOO_LARGE");
        assert!(validate_content(&big[1..], "application/octet-stream").is_ok());
    }

    #[test]
    fn declared_json_must_parse() {
        let err = validate_content(b"{oops", "application/json").unwrap_err();
        assert_eq!(err.code(), "INVALID_JSON");
        // Same bytes are fine as plain text.
        assert!(validate_content(b"{oops", "text/plain").is_ok());
    }

    #[test]
    fn json_text_is_canonicalized() {
        let prepared =
            prepare_content("{ \"b\": 2, \"a\": 1 }", "application/json; charset=utf-8", None, None)
                .unwrap();
        assert_eq!(prepared.body, br#"{"a":1,"b":2}"#);
    }

    #[test]
    fn text_and_binary_pass_through() {
        let text = prepare_content("hello", "text/plain", None, Some(1)).unwrap();
        assert_eq!(text.body_text(), Some("hello"));
        assert_eq!(text.pointer, Some(1));

        let bin = prepare_content(vec![0xFFu8, 0x00], "image/png", Some(json!({"n": 1})), None)
            .unwrap();
        assert_eq!(bin.body, vec![0xFF, 0x00]);
        assert_eq!(bin.metadata, Some(json!({"n": 1})));
    }

    #[test]
    fn empty_content_type_rejected() {
        assert_eq!(
            prepare_content("x", " ", None, None).unwrap_err().code(),
            "INVALID_INPUT"
        );
    }

    #[test]
    fn thousand_bytes_in_hundred_byte_chunks() {
        let data: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
        let chunks = chunk_content(&data, 100).unwrap();
        assert_eq!(chunks.len(), 10);
        assert!(chunks.iter().all(|c| c.len() <= 100));
        assert_eq!(chunks.concat(), data);
    }

    #[test]
    fn uneven_chunking_is_lossless() {
        let data = vec![7u8; 1001];
        let chunks = chunk_content(&data, 100).unwrap();
        assert_eq!(chunks.len(), 11);
        assert_eq!(chunks.last().map(Vec::len), Some(1));
        assert_eq!(chunks.concat(), data);
        assert!(chunk_content(&data, 0).is_err());
    }

    #[test]
    fn content_info_reads_png_dimensions() {
        let mut png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];
        png.extend_from_slice(b"IHDR");
        png.extend_from_slice(&640u32.to_be_bytes());
        png.extend_from_slice(&480u32.to_be_bytes());
        let info = content_info(&png, "image/png");
        assert_eq!(info.dimensions, Some(Dimensions { width: 640, height: 480 }));
        assert_eq!(info.size, png.len());
        assert_eq!(info.hash.len(), 64);
    }

    #[test]
    fn inscription_content_serializes_body_as_hex() {
        let prepared = prepare_content("hi", "text/plain", None, None).unwrap();
        let json = serde_json::to_value(&prepared).unwrap();
        assert_eq!(json["body"], "6869");
        assert_eq!(json["contentType"], "text/plain");
        let back: InscriptionContent = serde_json::from_value(json).unwrap();
        assert_eq!(back, prepared);
    }
}
