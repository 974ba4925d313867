//! # Content Type Detection
//!
//! Three passes, first hit wins:
//!
//! 1. **Extension** -- the filename's extension, if we know it.
//! 2. **Sniffing** -- JSON that actually parses, an HTML prologue, or one of
//!    the binary magic numbers below.
//! 3. **Fallback** -- `application/octet-stream`.
//!
//! | Format | Magic                          |
//! |--------|--------------------------------|
//! | PNG    | `89 50 4E 47 0D 0A 1A 0A`      |
//! | JPEG   | `FF D8 FF`                     |
//! | GIF    | `GIF87a` / `GIF89a`            |
//! | WEBP   | `RIFF....WEBP`                 |
//! | MP3    | `ID3` or an MPEG frame sync    |
//! | MP4    | `ftyp` at offset 4             |
//! | PDF    | `%PDF`                         |

pub const OCTET_STREAM: &str = "application/octet-stream";
pub const APPLICATION_JSON: &str = "application/json";
pub const TEXT_PLAIN: &str = "text/plain";

const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const PDF_MAGIC: &[u8] = b"%PDF";

/// MIME type for a known file extension (case-insensitive, no dot).
pub fn mime_for_extension(extension: &str) -> Option<&'static str> {
    let mime = match extension.to_ascii_lowercase().as_str() {
        "txt" => TEXT_PLAIN,
        "html" | "htm" => "text/html",
        "json" => APPLICATION_JSON,
        "js" => "application/javascript",
        "png" => "image/png",
        "jpeg" | "jpg" => "image/jpeg",
        "svg" => "image/svg+xml",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "css" => "text/css",
        "md" => "text/markdown",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        "pdf" => "application/pdf",
        _ => return None,
    };
    Some(mime)
}

/// Guess a MIME type from the leading bytes of `content`.
pub fn sniff(content: &[u8]) -> Option<&'static str> {
    if content.starts_with(PNG_MAGIC) {
        return Some("image/png");
    }
    if content.starts_with(JPEG_MAGIC) {
        return Some("image/jpeg");
    }
    if content.starts_with(b"GIF87a") || content.starts_with(b"GIF89a") {
        return Some("image/gif");
    }
    if content.len() >= 12 && &content[..4] == b"RIFF" && &content[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    if content.starts_with(PDF_MAGIC) {
        return Some("application/pdf");
    }
    if content.len() >= 8 && &content[4..8] == b"ftyp" {
        return Some("video/mp4");
    }
    if content.starts_with(b"ID3") || (content.len() >= 2 && content[0] == 0xFF && content[1] & 0xE0 == 0xE0) {
        return Some("audio/mpeg");
    }

    let text = std::str::from_utf8(content).ok()?;
    let trimmed = text.trim_start();
    if (trimmed.starts_with('{') || trimmed.starts_with('['))
        && serde_json::from_str::<serde_json::Value>(trimmed).is_ok()
    {
        return Some(APPLICATION_JSON);
    }
    let head: String = trimmed.chars().take(15).collect::<String>().to_ascii_lowercase();
    if head.starts_with("<!doctype html") || head.starts_with("<html") {
        return Some("text/html");
    }
    None
}

/// Whether a MIME type carries text and so accepts a `charset` parameter.
pub fn is_textual(mime: &str) -> bool {
    let base = base_type(mime);
    base.starts_with("text/")
        || matches!(
            base,
            APPLICATION_JSON | "application/javascript" | "image/svg+xml"
        )
}

/// The MIME type without parameters: `text/plain; charset=utf-8` -> `text/plain`.
pub fn base_type(mime: &str) -> &str {
    mime.split(';').next().unwrap_or(mime).trim()
}

/// Work out the content type for an inscription.
///
/// A `charset` is appended only to textual types; binary types ignore it.
pub fn detect_content_type(
    filename: Option<&str>,
    content: Option<&[u8]>,
    charset: Option<&str>,
) -> String {
    let by_extension = filename
        .and_then(|name| name.rsplit_once('.'))
        .and_then(|(_, ext)| mime_for_extension(ext));
    let mime = by_extension
        .or_else(|| content.and_then(sniff))
        .unwrap_or(OCTET_STREAM);

    match charset {
        Some(charset) if !charset.is_empty() && is_textual(mime) => {
            format!("{mime}; charset={charset}")
        }
        _ => mime.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_by_extension_and_by_body() {
        assert_eq!(detect_content_type(Some("doc.json"), None, None), APPLICATION_JSON);
        assert_eq!(
            detect_content_type(None, Some(br#"{"a": [1, 2]}"#.as_slice()), None),
            APPLICATION_JSON
        );
    }

    #[test]
    fn extension_beats_sniffing() {
        // Body looks like JSON but the name says text.
        assert_eq!(
            detect_content_type(Some("notes.TXT"), Some(b"{}".as_slice()), None),
            TEXT_PLAIN
        );
    }

    #[test]
    fn magic_numbers() {
        let mut png = PNG_MAGIC.to_vec();
        png.extend_from_slice(&[0; 16]);
        assert_eq!(sniff(&png), Some("image/png"));
        assert_eq!(sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
        assert_eq!(sniff(b"GIF89a\x01\x00"), Some("image/gif"));
        assert_eq!(sniff(b"RIFF\x00\x00\x00\x00WEBPVP8 "), Some("image/webp"));
        assert_eq!(sniff(b"%PDF-1.7"), Some("application/pdf"));
        assert_eq!(sniff(b"\x00\x00\x00\x18ftypmp42"), Some("video/mp4"));
        assert_eq!(sniff(b"ID3\x04\x00"), Some("audio/mpeg"));
    }

    #[test]
    fn html_prologue_is_case_insensitive() {
        assert_eq!(sniff(b"  <!DOCTYPE html><html></html>"), Some("text/html"));
        assert_eq!(sniff(b"<HTML><body>"), Some("text/html"));
    }

    #[test]
    fn broken_json_is_not_json() {
        assert_eq!(sniff(b"{not json"), None);
        assert_eq!(detect_content_type(None, Some(b"{not json".as_slice()), None), OCTET_STREAM);
    }

    #[test]
    fn charset_only_on_textual_types() {
        assert_eq!(
            detect_content_type(Some("a.txt"), None, Some("utf-8")),
            "text/plain; charset=utf-8"
        );
        assert_eq!(detect_content_type(Some("a.png"), None, Some("utf-8")), "image/png");
        assert_eq!(base_type("text/plain; charset=utf-8"), "text/plain");
    }

    #[test]
    fn unknown_everything_is_octet_stream() {
        assert_eq!(detect_content_type(Some("blob.xyz"), Some([0u8, 1, 2].as_slice()), None), OCTET_STREAM);
        assert_eq!(detect_content_type(None, None, None), OCTET_STREAM);
    }
}
