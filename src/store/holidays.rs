//! Days off declared by streamers, kept in a JSON file.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolidayRecord {
    pub user_id: i64,
    pub date: NaiveDate,
    pub added_at: DateTime<Local>,
}

/// Day-off registry backed by a JSON file. Every change is written through.
#[derive(Debug)]
pub struct HolidayStore {
    path: PathBuf,
    holidays: Vec<HolidayRecord>,
}

impl HolidayStore {
    /// Opens the registry, starting empty when the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let holidays = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            Vec::new()
        };
        Ok(Self { path, holidays })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Marks `date` as a day off. Returns false if it already was one.
    pub fn add(&mut self, user_id: i64, date: NaiveDate) -> Result<bool> {
        if self.contains(user_id, date) {
            return Ok(false);
        }
        self.holidays.push(HolidayRecord {
            user_id,
            date,
            added_at: Local::now(),
        });
        self.save()?;
        info!(user_id, %date, "day off added");
        Ok(true)
    }

    /// Returns false when `date` was not a day off.
    pub fn remove(&mut self, user_id: i64, date: NaiveDate) -> Result<bool> {
        let before = self.holidays.len();
        self.holidays.retain(|h| !(h.user_id == user_id && h.date == date));
        if self.holidays.len() == before {
            return Ok(false);
        }
        self.save()?;
        info!(user_id, %date, "day off removed");
        Ok(true)
    }

    /// A user's days off, latest first.
    pub fn list(&self, user_id: i64) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self
            .holidays
            .iter()
            .filter(|h| h.user_id == user_id)
            .map(|h| h.date)
            .collect();
        dates.sort_by(|a, b| b.cmp(a));
        dates
    }

    pub fn contains(&self, user_id: i64, date: NaiveDate) -> bool {
        self.holidays.iter().any(|h| h.user_id == user_id && h.date == date)
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(&self.holidays)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}
