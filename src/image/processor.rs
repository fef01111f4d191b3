use super::ImageService;
use crate::data_uri::{self, DataUri};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{Local, NaiveTime};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::path::{Path, PathBuf};

const DIVIDER: Rgb<u8> = Rgb([255, 255, 255]);

/// `<base>_<HHMMSS>.jpg`, with a trailing `.jpg` on `base` removed first.
pub fn stamped_filename(base: &str, time: NaiveTime) -> String {
    let base = base.strip_suffix(".jpg").unwrap_or(base);
    format!("{}_{}.jpg", base, time.format("%H%M%S"))
}

/// Composes the before/after view: `original` (scaled to the modified
/// image's size) left of the split, `modified` right of it, and a one-pixel
/// divider on the split column when it falls inside the image.
pub fn compose_comparison(
    original: &DynamicImage,
    modified: &DynamicImage,
    position: f32,
) -> RgbImage {
    let modified = modified.to_rgb8();
    let (width, height) = modified.dimensions();
    let original = original
        .resize_exact(width, height, image::imageops::FilterType::Lanczos3)
        .to_rgb8();

    let position = if position.is_finite() {
        position.clamp(0.0, 100.0)
    } else {
        50.0
    };
    let split = ((width as f32) * position / 100.0).round() as u32;

    RgbImage::from_fn(width, height, |x, y| {
        if x < split {
            *original.get_pixel(x, y)
        } else if x == split && split > 0 && split < width {
            DIVIDER
        } else {
            *modified.get_pixel(x, y)
        }
    })
}

pub struct ImageProcessor {
    output_dir: PathBuf,
    http: reqwest::Client,
}

impl ImageProcessor {
    pub fn new(output_dir: &Path) -> Result<Self> {
        Self::new_with_client(output_dir, reqwest::Client::new())
    }

    pub fn new_with_client(output_dir: &Path, http: reqwest::Client) -> Result<Self> {
        std::fs::create_dir_all(output_dir)?;
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            http,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    async fn load_bytes(&self, url: &str) -> Result<Vec<u8>> {
        if data_uri::is_data_uri(url) {
            return DataUri::parse(url)?.decode();
        }
        if url.starts_with("http://") || url.starts_with("https://") {
            let response = self.http.get(url).send().await?.error_for_status()?;
            return Ok(response.bytes().await?.to_vec());
        }
        Err(Error::InvalidInput(format!(
            "Unsupported image reference: {}",
            url.chars().take(32).collect::<String>()
        )))
    }

    fn target_path(&self, base_name: &str) -> PathBuf {
        self.output_dir
            .join(stamped_filename(base_name, Local::now().time()))
    }

    async fn save_jpeg(&self, image: RgbImage, path: &Path) -> Result<()> {
        tokio::task::spawn_blocking({
            let path = path.to_path_buf();
            move || image.save_with_format(path, ImageFormat::Jpeg)
        })
        .await
        .map_err(|e| Error::Invariant(format!("Image export task join error: {}", e)))??;
        Ok(())
    }
}

#[async_trait]
impl ImageService for ImageProcessor {
    async fn export_jpeg(&self, url: &str, base_name: &str) -> Result<PathBuf> {
        let bytes = self.load_bytes(url).await?;
        let image = image::load_from_memory(&bytes)?.to_rgb8();

        let path = self.target_path(base_name);
        self.save_jpeg(image, &path).await?;
        tracing::info!("Saved {}", path.display());
        Ok(path)
    }

    async fn export_comparison(
        &self,
        original: &str,
        modified: &str,
        position: f32,
        base_name: &str,
    ) -> Result<PathBuf> {
        let original = image::load_from_memory(&self.load_bytes(original).await?)?;
        let modified = image::load_from_memory(&self.load_bytes(modified).await?)?;

        let composed = tokio::task::spawn_blocking(move || {
            compose_comparison(&original, &modified, position)
        })
        .await
        .map_err(|e| Error::Invariant(format!("Comparison task join error: {}", e)))?;

        let path = self.target_path(base_name);
        self.save_jpeg(composed, &path).await?;
        tracing::info!("Saved comparison {}", path.display());
        Ok(path)
    }
}
