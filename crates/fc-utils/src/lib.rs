//! Shared helpers and error types for FrameCheck.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

/// Result type for shared helpers.
pub type UtilsResult<T> = Result<T, UtilsError>;

/// Shared error variants for cross-crate helpers.
#[derive(Debug, Error)]
pub enum UtilsError {
    /// An IO error occurred.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// A parsing error occurred.
    #[error("parse error: {0}")]
    Parse(String),
}

/// Decoded contents of a `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    /// Media type, such as `image/jpeg`.
    pub mime: String,
    /// Raw decoded bytes.
    pub bytes: Vec<u8>,
}

/// Encode raw bytes as a base64 `data:` URL.
pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Decode a base64 `data:` URL. Only base64 payloads are supported.
pub fn decode_data_url(url: &str) -> UtilsResult<DataUrl> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| UtilsError::Parse("missing data: scheme".into()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| UtilsError::Parse("missing data url payload".into()))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| UtilsError::Parse("data url is not base64 encoded".into()))?;
    if mime.trim().is_empty() {
        return Err(UtilsError::Parse("data url has no media type".into()));
    }
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|err| UtilsError::Parse(err.to_string()))?;
    if bytes.is_empty() {
        return Err(UtilsError::Parse("data url payload is empty".into()));
    }
    Ok(DataUrl {
        mime: mime.to_string(),
        bytes,
    })
}

/// Guess an image media type from a file extension.
pub fn image_mime_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_round_trips_bytes() {
        let url = encode_data_url("image/png", &[1, 2, 3, 4]);
        assert!(url.starts_with("data:image/png;base64,"));
        let decoded = decode_data_url(&url).expect("decode");
        assert_eq!(decoded.mime, "image/png");
        assert_eq!(decoded.bytes, vec![1, 2, 3, 4]);
    }

    #[test]
    fn data_url_rejects_garbage() {
        assert!(matches!(
            decode_data_url("https://example.com/a.jpg"),
            Err(UtilsError::Parse(_))
        ));
        assert!(matches!(
            decode_data_url("data:image/jpeg;base64,@@@not-base64@@@"),
            Err(UtilsError::Parse(_))
        ));
        assert!(matches!(
            decode_data_url("data:image/jpeg,plain"),
            Err(UtilsError::Parse(_))
        ));
    }
}
