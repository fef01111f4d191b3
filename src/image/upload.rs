use crate::ai::mime;
use crate::data_uri::DataUri;
use crate::{Error, Result};
use std::path::Path;
use tracing::{info, warn};

/// Size above which the upload form advised against a file. Not enforced.
pub const ADVISORY_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Reads an image file into a `data:` URI for the rest of the pipeline.
///
/// Only emptiness is rejected; unknown formats and oversized files are
/// logged and passed through.
pub async fn read_upload(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path).await?;
    if bytes.is_empty() {
        return Err(Error::InvalidInput(format!(
            "Upload {} is empty",
            path.display()
        )));
    }

    let advertised = mime::detect_image_mime(&bytes)
        .map(|detected| mime::UPLOAD_MIME_TYPES.contains(&detected))
        .unwrap_or(false);
    if !advertised {
        warn!(
            "{} does not look like a JPG, PNG or WebP image",
            path.display()
        );
    }
    if bytes.len() > ADVISORY_MAX_UPLOAD_BYTES {
        warn!(
            "{} is {} bytes, larger than the advised 20MB",
            path.display(),
            bytes.len()
        );
    }

    let uri = DataUri::from_bytes(&bytes);
    info!(
        "Loaded {} ({} bytes, {})",
        path.display(),
        bytes.len(),
        uri.mime_type
    );
    Ok(uri.to_uri())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_read_upload_encodes_data_uri() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("photo.jpg");
        std::fs::write(&path, [0xFF, 0xD8, 0xFF, 0xE0]).unwrap();

        let uri = read_upload(&path).await.unwrap();
        assert_eq!(uri, "data:image/jpeg;base64,/9j/4A==");
    }

    #[tokio::test]
    async fn test_read_upload_rejects_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.png");
        std::fs::write(&path, []).unwrap();

        let err = read_upload(&path).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_read_upload_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = read_upload(&dir.path().join("nope.png")).await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[tokio::test]
    async fn test_read_upload_passes_unknown_formats_through() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();

        let uri = read_upload(&path).await.unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
    }
}
