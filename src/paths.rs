use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "tiktok-live-stats";

/// Returns the default data directory: `<local data dir>/tiktok-live-stats/`
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

/// Returns the default config file: `<default data dir>/config.json`
pub fn default_config_path() -> PathBuf {
    default_data_dir().join("config.json")
}

/// Returns the logs directory: `<data_dir>/logs/`
pub fn get_logs_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("logs")
}

/// Returns the tessdata directory we download language data into: `<data_dir>/tessdata/`
pub fn get_tessdata_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("tessdata")
}

/// Returns the statistics file: `<data_dir>/statistics.csv`
pub fn get_stats_csv_path(data_dir: &Path) -> PathBuf {
    data_dir.join("statistics.csv")
}

/// Returns the user registry: `<data_dir>/users.json`
pub fn get_users_path(data_dir: &Path) -> PathBuf {
    data_dir.join("users.json")
}

/// Returns the day-off registry: `<data_dir>/holidays.json`
pub fn get_holidays_path(data_dir: &Path) -> PathBuf {
    data_dir.join("holidays.json")
}

/// Returns the incoming screenshots directory: `<data_dir>/screenshots/`
pub fn get_screenshots_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("screenshots")
}

/// Ensures all output directories exist. Call at startup.
pub fn ensure_directories(data_dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(get_logs_dir(data_dir))?;
    std::fs::create_dir_all(get_screenshots_dir(data_dir))?;
    Ok(())
}
