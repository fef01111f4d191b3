/// Types the upload step advertises. Others are accepted with a warning.
pub const UPLOAD_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// Sniffs the image type from magic bytes.
pub fn detect_image_mime(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some("image/webp"),
        [0x47, 0x49, 0x46, 0x38, ..] => Some("image/gif"),
        _ => None,
    }
}

/// Like [`detect_image_mime`] but falls back to PNG, logging the unknown header.
pub fn detect_image_mime_or_png(bytes: &[u8]) -> &'static str {
    detect_image_mime(bytes).unwrap_or_else(|| {
        tracing::warn!(
            "Unrecognized image format (first 4 bytes: {:02X?}), falling back to image/png",
            &bytes[..bytes.len().min(4)]
        );
        "image/png"
    })
}
