//! Application configuration.
//!
//! Loaded from config.json at startup and passed explicitly to whatever needs
//! it. Missing fields take their defaults; a missing or broken file means all
//! defaults. A few environment variables override the file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::paths;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Tesseract executable; searched for when unset
    pub tesseract_path: Option<PathBuf>,
    /// Directory holding `<lang>.traineddata`; searched for when unset
    pub tessdata_dir: Option<PathBuf>,
    /// Tesseract language set
    pub ocr_languages: String,
    /// Where statistics, users and logs live
    pub data_dir: Option<PathBuf>,
    /// Parent of per-screenshot scratch directories; system temp dir when unset
    pub scratch_dir: Option<PathBuf>,
    /// Download missing language data from the tessdata repository
    pub download_tessdata: bool,
    /// Remove queued screenshots once processed
    pub delete_screenshots: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tesseract_path: None,
            tessdata_dir: None,
            ocr_languages: "ukr+eng".to_string(),
            data_dir: None,
            scratch_dir: None,
            download_tessdata: true,
            delete_screenshots: true,
        }
    }
}

impl AppConfig {
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(paths::default_data_dir)
    }
}

/// Reads a config file, falling back to defaults when it is missing or invalid.
pub fn load_config_file(path: &Path) -> AppConfig {
    info!(path = %path.display(), "looking for config");

    if !path.exists() {
        info!("config.json not found, using defaults");
        return AppConfig::default();
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(config) => {
                info!("config loaded");
                config
            }
            Err(e) => {
                warn!(error = %e, "failed to parse config, using defaults");
                AppConfig::default()
            }
        },
        Err(e) => {
            warn!(error = %e, "failed to read config, using defaults");
            AppConfig::default()
        }
    }
}

/// Applies `TESSERACT_PATH`, `TESSDATA_PREFIX` and `TIKTOK_STATS_DATA_DIR`.
pub fn apply_overrides(
    mut config: AppConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> AppConfig {
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = non_empty("TESSERACT_PATH") {
        config.tesseract_path = Some(PathBuf::from(v));
    }
    if let Some(v) = non_empty("TESSDATA_PREFIX") {
        config.tessdata_dir = Some(PathBuf::from(v));
    }
    if let Some(v) = non_empty("TIKTOK_STATS_DATA_DIR") {
        config.data_dir = Some(PathBuf::from(v));
    }
    config
}

/// Loads the config from `path` (or the default location) plus environment overrides.
pub fn load_config(path: Option<&Path>) -> AppConfig {
    let config = match path {
        Some(p) => load_config_file(p),
        None => load_config_file(&paths::default_config_path()),
    };
    apply_overrides(config, |key| std::env::var(key).ok())
}
