use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

use super::preprocess::ImageVariant;

/// Characters allowed in the full-block whitelisted pass: digits, suffixes,
/// the Cyrillic alphabet and separators.
const WHITELIST_BLOCK: &str = "0123456789KkMmАБВГДЕЖЗИЙКЛМНОПРСТУФХЦЧШЩЪЫЬЭЮЯабвгдежзийклмнопрстуфхцчшщъыьэюя:., ";
const WHITELIST_LINE: &str = "0123456789KkMm:., ";
const WHITELIST_WORD: &str = "0123456789KkMм";

/// One Tesseract configuration tried on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OcrConfig {
    /// Page segmentation mode
    pub psm: u8,
    /// Restricts recognized characters when set
    pub whitelist: Option<&'static str>,
}

impl OcrConfig {
    /// Command-line arguments for this configuration.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "--oem".to_string(),
            "3".to_string(),
            "--psm".to_string(),
            self.psm.to_string(),
        ];
        if let Some(whitelist) = self.whitelist {
            args.push("-c".to_string());
            args.push(format!("tessedit_char_whitelist={}", whitelist));
        }
        args
    }
}

/// Configurations in the order they are attempted.
pub const OCR_CONFIGS: [OcrConfig; 5] = [
    // Uniform block, whitelisted
    OcrConfig {
        psm: 6,
        whitelist: Some(WHITELIST_BLOCK),
    },
    // Single line, whitelisted
    OcrConfig {
        psm: 7,
        whitelist: Some(WHITELIST_LINE),
    },
    // Single word, whitelisted
    OcrConfig {
        psm: 8,
        whitelist: Some(WHITELIST_WORD),
    },
    // Raw line
    OcrConfig {
        psm: 13,
        whitelist: None,
    },
    // Uniform block
    OcrConfig {
        psm: 6,
        whitelist: None,
    },
];

/// Recognizes the text in one image file under one configuration.
pub trait TextRecognizer {
    fn recognize(&self, image: &Path, config: &OcrConfig) -> Result<String>;
}

/// Runs the `tesseract` executable.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    pub executable: PathBuf,
    pub tessdata: Option<PathBuf>,
    /// Tesseract language set, e.g. `ukr+eng`
    pub languages: String,
}

impl TesseractCli {
    pub fn new(
        executable: PathBuf,
        tessdata: Option<PathBuf>,
        languages: impl Into<String>,
    ) -> Self {
        Self {
            executable,
            tessdata,
            languages: languages.into(),
        }
    }
}

impl TextRecognizer for TesseractCli {
    fn recognize(&self, image: &Path, config: &OcrConfig) -> Result<String> {
        let mut command = Command::new(&self.executable);
        command.arg(image).arg("stdout");
        if let Some(tessdata) = &self.tessdata {
            command.arg("--tessdata-dir").arg(tessdata);
        }
        command.arg("-l").arg(&self.languages).args(config.args());

        let output = command
            .output()
            .with_context(|| format!("Failed to run {}", self.executable.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Tesseract failed: {}", stderr.trim()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Runs every configuration on every variant and collects all non-blank text.
///
/// Duplicates are kept; failed attempts are logged and skipped.
pub fn extract_text_variants<R: TextRecognizer + ?Sized>(
    recognizer: &R,
    variants: &[ImageVariant],
) -> Vec<String> {
    let mut texts = Vec::new();

    for variant in variants {
        for config in &OCR_CONFIGS {
            match recognizer.recognize(&variant.path, config) {
                Ok(text) => {
                    let trimmed = text.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    debug!(
                        variant = %variant.kind,
                        psm = config.psm,
                        text = %trimmed.chars().take(50).collect::<String>(),
                        "OCR result"
                    );
                    texts.push(trimmed.to_string());
                }
                Err(e) => {
                    debug!(
                        variant = %variant.kind,
                        psm = config.psm,
                        error = %e,
                        "OCR attempt failed"
                    );
                }
            }
        }
    }

    texts
}
