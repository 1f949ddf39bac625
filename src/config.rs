//! Configuration management for MyNote.
//!
//! This module handles loading and saving application configuration to/from a
//! JSON file in the config directory. A missing file yields the defaults; an
//! unreadable or malformed file is an error rather than a silent reset.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MyNoteError, MyNoteResult};
use crate::store::TRASH_RETENTION_DAYS;

const CONFIG_FILE_NAME: &str = "config.json";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip)]
    config_dir: PathBuf,

    /// Database file name, relative to the config directory
    #[serde(default = "default_database_file")]
    pub database_file: String,

    /// Seconds between reminder poll cycles
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Days a trashed item survives before the sweep may purge it
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
}

fn default_database_file() -> String {
    "tasks.db".to_string()
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_retention_days() -> i64 {
    TRASH_RETENTION_DAYS
}

impl Config {
    /// Load configuration from `config_dir`, falling back to defaults when no
    /// config file exists yet.
    pub fn new(config_dir: impl Into<PathBuf>) -> MyNoteResult<Self> {
        let config_dir = config_dir.into();
        let path = config_dir.join(CONFIG_FILE_NAME);

        let mut config = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            serde_json::from_str::<Config>(&raw)
                .map_err(|e| MyNoteError::Config(format!("{}: {}", path.display(), e)))?
        } else {
            Config {
                config_dir: PathBuf::new(),
                database_file: default_database_file(),
                poll_interval_secs: default_poll_interval_secs(),
                retention_days: default_retention_days(),
            }
        };
        config.config_dir = config_dir;
        Ok(config)
    }

    /// Write the configuration back to disk, creating the directory if needed
    pub fn save(&self) -> MyNoteResult<()> {
        fs::create_dir_all(&self.config_dir)?;
        let path = self.config_dir.join(CONFIG_FILE_NAME);
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(path, raw)?;
        Ok(())
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Full path of the database file
    pub fn database_path(&self) -> PathBuf {
        self.config_dir.join(&self.database_file)
    }

    /// Poll interval for the reminder scheduler
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Trash retention window for `sweep_expired_trash`
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.retention_days)
    }
}
