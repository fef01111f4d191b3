//! Image boundaries of the wizard
//!
//! Reads uploads into data URIs, writes downloaded variants as timestamped
//! JPEG files, and renders before/after comparison images.

pub mod processor;
pub mod upload;

pub use processor::{stamped_filename, ImageProcessor};
pub use upload::read_upload;

use crate::Result;
use async_trait::async_trait;
use std::path::PathBuf;

#[async_trait]
pub trait ImageService: Send + Sync {
    /// Saves the image behind `url` as `<base>_<HHMMSS>.jpg`.
    async fn export_jpeg(&self, url: &str, base_name: &str) -> Result<PathBuf>;

    /// Saves a split-view comparison of `original` (left) and `modified`
    /// (right), split at `position` percent of the width.
    async fn export_comparison(
        &self,
        original: &str,
        modified: &str,
        position: f32,
        base_name: &str,
    ) -> Result<PathBuf>;
}
