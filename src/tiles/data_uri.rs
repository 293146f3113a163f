//! `data:` URI wrapping for artifacts handed to a browser host.

use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::error::{AnnotationError, Result};

pub const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Wrap PNG bytes in a base64 data URI.
pub fn to_data_uri(bytes: &[u8]) -> String {
    let mut uri = String::from(PNG_DATA_URI_PREFIX);
    STANDARD.encode_string(bytes, &mut uri);
    uri
}

/// Unwrap a PNG data URI.
pub fn from_data_uri(uri: &str) -> Result<Vec<u8>> {
    let payload = uri
        .trim()
        .strip_prefix(PNG_DATA_URI_PREFIX)
        .ok_or_else(|| AnnotationError::import_failed("not a PNG data URI"))?;
    STANDARD
        .decode(payload)
        .map_err(|e| AnnotationError::import_failed(format!("invalid base64 payload: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_and_unwrap() {
        let uri = to_data_uri(b"\x89PNG");
        assert_eq!(uri, "data:image/png;base64,iVBORw==");
        assert_eq!(from_data_uri(&uri).unwrap(), b"\x89PNG");
    }

    #[test]
    fn test_rejects_other_media_types() {
        let err = from_data_uri("data:image/jpeg;base64,AAAA").unwrap_err();
        assert!(err.is_recoverable_import());
    }

    #[test]
    fn test_rejects_bad_base64() {
        assert!(from_data_uri("data:image/png;base64,@@@").is_err());
    }
}
