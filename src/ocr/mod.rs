pub mod duration;
pub mod engine;
pub mod extract;
pub mod number;
pub mod preprocess;
pub mod setup;
pub mod validate;

pub use duration::{parse_duration, DurationMatch, DurationRule};
pub use engine::{extract_text_variants, OcrConfig, TesseractCli, TextRecognizer, OCR_CONFIGS};
pub use extract::{find_statistics, locate_triad, LocatorStrategy, ParsedStatistics, Triad};
pub use number::parse_number_value;
pub use preprocess::{generate_variants, write_variants, ImageVariant, VariantKind};
pub use setup::ensure_tesseract;
pub use validate::{validate_stats, ValidationError};

use anyhow::Context;
use image::{DynamicImage, Rgb, RgbImage};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why a screenshot produced no statistics.
#[derive(Debug, Error)]
pub enum ScreenshotError {
    #[error("Image decode error: {0}")]
    Decode(#[source] image::ImageError),
    #[error("Scratch storage error: {0}")]
    Scratch(#[from] std::io::Error),
    #[error("Failed to write image variant: {0}")]
    WriteVariant(#[source] image::ImageError),
    #[error("No text recognized")]
    NothingRecognized,
    #[error("Statistics rejected: {0}")]
    Rejected(#[from] ValidationError),
}

/// Screenshot → statistics pipeline.
///
/// Every call works in its own scratch directory, which is removed when the
/// call returns on any path.
pub struct ScreenshotProcessor<R> {
    recognizer: R,
    scratch_root: Option<PathBuf>,
}

impl<R: TextRecognizer> ScreenshotProcessor<R> {
    pub fn new(recognizer: R) -> Self {
        Self {
            recognizer,
            scratch_root: None,
        }
    }

    /// Creates scratch directories under `root` instead of the system temp dir.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    pub fn recognizer(&self) -> &R {
        &self.recognizer
    }

    fn scratch_dir(&self) -> std::io::Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("screenshot-");
        match &self.scratch_root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
    }

    pub fn process_file(&self, path: &Path) -> Result<ParsedStatistics, ScreenshotError> {
        info!(path = %path.display(), "processing screenshot");
        let img = image::open(path).map_err(ScreenshotError::Decode)?;
        self.process_image(&img)
    }

    pub fn process_bytes(&self, bytes: &[u8]) -> Result<ParsedStatistics, ScreenshotError> {
        info!(bytes = bytes.len(), "processing screenshot");
        let img = image::load_from_memory(bytes).map_err(ScreenshotError::Decode)?;
        self.process_image(&img)
    }

    pub fn process_image(&self, img: &DynamicImage) -> Result<ParsedStatistics, ScreenshotError> {
        let scratch = self.scratch_dir()?;
        debug!(dir = %scratch.path().display(), "scratch directory created");

        let variants = write_variants(img, scratch.path()).map_err(ScreenshotError::WriteVariant)?;
        info!(count = variants.len(), "image variants created");

        let texts = extract_text_variants(&self.recognizer, &variants);
        info!(count = texts.len(), "text variants extracted");
        for (i, text) in texts.iter().take(3).enumerate() {
            let preview: String = text.chars().take(100).collect();
            debug!(index = i + 1, text = %preview, "text variant");
        }

        // Variant files are no longer needed once OCR is done.
        if let Err(e) = scratch.close() {
            warn!(error = %e, "failed to remove scratch directory");
        }

        if texts.is_empty() {
            warn!("no text recognized in screenshot");
            return Err(ScreenshotError::NothingRecognized);
        }

        let stats = find_statistics(&texts);
        validate_stats(&stats)?;
        Ok(stats)
    }

    /// Runs the first configuration on a blank image to confirm the engine works.
    pub fn check_installation(&self) -> anyhow::Result<()> {
        let scratch = self.scratch_dir().context("Failed to create scratch directory")?;
        let path = scratch.path().join("check.png");
        RgbImage::from_pixel(200, 50, Rgb([255, 255, 255]))
            .save(&path)
            .context("Failed to write test image")?;

        self.recognizer
            .recognize(&path, &OCR_CONFIGS[0])
            .context("OCR engine check failed")?;
        info!("OCR engine check passed");
        Ok(())
    }
}
