//! Registered streamers, kept in a JSON file.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: i64,
    /// TikTok nickname
    pub nickname: String,
    pub registered_at: DateTime<Local>,
    pub last_activity: DateTime<Local>,
}

/// User registry backed by a JSON file. Every change is written through.
#[derive(Debug)]
pub struct UserStore {
    path: PathBuf,
    users: Vec<UserRecord>,
}

impl UserStore {
    /// Opens the registry, starting empty when the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let users = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            Vec::new()
        };
        Ok(Self { path, users })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Registers a user or updates their nickname.
    ///
    /// Re-registration keeps the original registration date.
    pub fn register(&mut self, user_id: i64, nickname: &str) -> Result<&UserRecord> {
        let now = Local::now();
        let index = match self.users.iter().position(|u| u.user_id == user_id) {
            Some(i) => {
                let user = &mut self.users[i];
                user.nickname = nickname.to_string();
                user.last_activity = now;
                i
            }
            None => {
                self.users.push(UserRecord {
                    user_id,
                    nickname: nickname.to_string(),
                    registered_at: now,
                    last_activity: now,
                });
                self.users.len() - 1
            }
        };
        self.save()?;
        info!(user_id, nickname, "user registered");
        Ok(&self.users[index])
    }

    pub fn get(&self, user_id: i64) -> Option<&UserRecord> {
        self.users.iter().find(|u| u.user_id == user_id)
    }

    /// Updates last activity. Returns false for unknown users.
    pub fn touch(&mut self, user_id: i64) -> Result<bool> {
        let Some(user) = self.users.iter_mut().find(|u| u.user_id == user_id) else {
            return Ok(false);
        };
        user.last_activity = Local::now();
        self.save()?;
        Ok(true)
    }

    /// All users, most recently active first.
    pub fn all(&self) -> Vec<&UserRecord> {
        let mut users: Vec<&UserRecord> = self.users.iter().collect();
        users.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        users
    }

    pub fn nickname(&self, user_id: i64) -> Option<&str> {
        self.get(user_id).map(|u| u.nickname.as_str())
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(&self.users)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}
