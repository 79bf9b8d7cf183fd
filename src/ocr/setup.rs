use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::paths;

const TESSDATA_REPO: &str = "https://github.com/tesseract-ocr/tessdata/raw/main";

/// Common install locations, checked after PATH.
const COMMON_EXECUTABLES: [&str; 6] = [
    "/usr/bin/tesseract",
    "/usr/local/bin/tesseract",
    "/opt/homebrew/bin/tesseract",
    "/app/.apt/usr/bin/tesseract",
    r"C:\Program Files\Tesseract-OCR\tesseract.exe",
    r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
];

const COMMON_TESSDATA_DIRS: [&str; 7] = [
    "/usr/share/tesseract-ocr/5/tessdata",
    "/usr/share/tesseract-ocr/4.00/tessdata",
    "/usr/share/tessdata",
    "/usr/local/share/tessdata",
    "/opt/homebrew/share/tessdata",
    r"C:\Program Files\Tesseract-OCR\tessdata",
    r"C:\Program Files (x86)\Tesseract-OCR\tessdata",
];

pub struct TesseractPaths {
    pub executable: PathBuf,
    /// `None` lets Tesseract use its compiled-in default
    pub tessdata: Option<PathBuf>,
}

/// Splits a Tesseract language set such as `ukr+eng`.
pub fn split_languages(languages: &str) -> Vec<&str> {
    languages
        .split('+')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect()
}

fn responds_to_version(executable: &Path) -> bool {
    Command::new(executable)
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Finds the Tesseract executable: configured path, then PATH, then common locations.
pub fn find_tesseract_executable(config: &AppConfig) -> Result<PathBuf> {
    if let Some(path) = &config.tesseract_path {
        if path.exists() {
            return Ok(path.clone());
        }
        warn!(path = %path.display(), "configured Tesseract path does not exist");
    }

    let on_path = PathBuf::from("tesseract");
    if responds_to_version(&on_path) {
        return Ok(on_path);
    }

    COMMON_EXECUTABLES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .ok_or_else(|| {
            anyhow!("Tesseract not found. Please install Tesseract-OCR or set TESSERACT_PATH.")
        })
}

/// Returns true when every language has a traineddata file in `dir`.
pub fn has_languages(dir: &Path, languages: &[&str]) -> bool {
    languages
        .iter()
        .all(|lang| dir.join(format!("{}.traineddata", lang)).exists())
}

/// Finds a tessdata directory containing every requested language.
pub fn find_tessdata_dir(config: &AppConfig, languages: &[&str]) -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(dir) = &config.tessdata_dir {
        candidates.push(dir.clone());
        candidates.push(dir.join("tessdata"));
    }
    candidates.push(paths::get_tessdata_dir(&config.data_dir()));
    candidates.extend(COMMON_TESSDATA_DIRS.iter().map(PathBuf::from));

    candidates.into_iter().find(|dir| has_languages(dir, languages))
}

/// Locates Tesseract and its language data, downloading missing languages
/// into the data directory when allowed.
pub fn ensure_tesseract(config: &AppConfig) -> Result<TesseractPaths> {
    let executable = find_tesseract_executable(config)?;
    info!(executable = %executable.display(), "Tesseract found");

    let languages = split_languages(&config.ocr_languages);
    if let Some(tessdata) = find_tessdata_dir(config, &languages) {
        info!(tessdata = %tessdata.display(), "language data found");
        return Ok(TesseractPaths {
            executable,
            tessdata: Some(tessdata),
        });
    }

    if !config.download_tessdata {
        warn!(
            languages = %config.ocr_languages,
            "language data not found, relying on Tesseract defaults"
        );
        return Ok(TesseractPaths {
            executable,
            tessdata: None,
        });
    }

    let tessdata = paths::get_tessdata_dir(&config.data_dir());
    fs::create_dir_all(&tessdata)
        .with_context(|| format!("Failed to create {}", tessdata.display()))?;

    for lang in &languages {
        let target = tessdata.join(format!("{}.traineddata", lang));
        if !target.exists() {
            download_traineddata(lang, &target)?;
        }
    }

    Ok(TesseractPaths {
        executable,
        tessdata: Some(tessdata),
    })
}

/// Downloads `<lang>.traineddata` from the upstream tessdata repository.
fn download_traineddata(lang: &str, target: &Path) -> Result<()> {
    let url = format!("{}/{}.traineddata", TESSDATA_REPO, lang);
    info!(%url, "downloading language data");

    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(300))
        .build()?;

    let response = client
        .get(&url)
        .header("User-Agent", "tiktok-live-stats")
        .send()?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Failed to download {}.traineddata: HTTP {}",
            lang,
            response.status()
        ));
    }

    let bytes = response.bytes()?;

    write_atomically(target, &bytes)?;

    info!(lang, bytes = bytes.len(), "language data downloaded");
    Ok(())
}

/// Writes into a temporary file beside `target` and renames it into place.
///
/// The temporary file is removed if any step fails.
fn write_atomically(target: &Path, bytes: &[u8]) -> Result<()> {
    let dir = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut partial = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create a temporary file in {}", dir.display()))?;
    partial
        .write_all(bytes)
        .with_context(|| format!("Failed to write {}", partial.path().display()))?;
    partial
        .persist(target)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to move data into {}", target.display()))?;
    Ok(())
}
