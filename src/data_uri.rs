//! `data:<mime>;base64,<payload>` encoding shared by upload, generation and
//! download.

use crate::ai::mime;
use crate::{Error, Result};
use base64::Engine as _;

/// A parsed base64 data URI. The payload stays base64-encoded so it can be
/// forwarded to the provider without a decode/encode round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime_type: String,
    pub data: String,
}

impl DataUri {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            mime_type: mime::detect_image_mime_or_png(bytes).to_string(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    pub fn parse(uri: &str) -> Result<Self> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| Error::InvalidInput("Not a data URI".to_string()))?;
        let (header, data) = rest
            .split_once(',')
            .ok_or_else(|| Error::InvalidInput("Data URI has no payload".to_string()))?;
        let mime_type = header.strip_suffix(";base64").ok_or_else(|| {
            Error::InvalidInput("Only base64 data URIs are supported".to_string())
        })?;

        Ok(Self {
            mime_type: if mime_type.is_empty() {
                "application/octet-stream".to_string()
            } else {
                mime_type.to_string()
            },
            data: data.to_string(),
        })
    }

    pub fn decode(&self) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(self.data.trim())
            .map_err(|e| Error::InvalidInput(format!("Invalid base64 payload: {}", e)))
    }

    pub fn to_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

pub fn is_data_uri(value: &str) -> bool {
    value.starts_with("data:")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_from_bytes_sniffs_mime() {
        let uri = DataUri::from_bytes(&PNG_HEADER).to_uri();
        assert!(uri.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_parse_and_decode() {
        let parsed = DataUri::parse("data:image/jpeg;base64,/9j/").unwrap();
        assert_eq!(parsed.mime_type, "image/jpeg");
        assert_eq!(parsed.decode().unwrap(), vec![0xFF, 0xD8, 0xFF]);
    }

    #[test]
    fn test_parse_rejects_non_data_uri() {
        let err = DataUri::parse("https://example.com/a.jpg").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_parse_rejects_plain_text_payload() {
        assert!(DataUri::parse("data:text/plain,hello").is_err());
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        let parsed = DataUri::parse("data:image/png;base64,!!!").unwrap();
        assert!(parsed.decode().is_err());
    }

    #[test]
    fn test_is_data_uri() {
        assert!(is_data_uri("data:image/png;base64,AAAA"));
        assert!(!is_data_uri("http://example.com"));
    }
}
