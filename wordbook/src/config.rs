//! Runtime configuration: JSON file, then environment overrides, then defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::interface::WordbookError;

pub const DB_PATH_ENV: &str = "WORDBOOK_DB_PATH";
pub const API_URL_ENV: &str = "WORDBOOK_API_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WordbookConfig {
    /// SQLite file holding search history
    pub database_path: PathBuf,
    /// Dictionary endpoint; the word is appended as the last path segment
    pub api_base_url: String,
    /// Query looked up when the coordinator initializes
    pub default_query: String,
    /// How many history words a dropdown shows
    pub history_display_limit: usize,
    pub request_timeout_secs: u64,
}

impl Default for WordbookConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("search_history.db"),
            api_base_url: "https://api.dictionaryapi.dev/api/v2/entries/en/".to_string(),
            default_query: "Welcome".to_string(),
            history_display_limit: 5,
            request_timeout_secs: 10,
        }
    }
}

impl WordbookConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, WordbookError> {
        let content = fs::read_to_string(path)
            .map_err(|e| WordbookError::Config(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&content)
            .map_err(|e| WordbookError::Config(format!("{}: {e}", path.display())))
    }

    /// Defaults, or `path` when given, with environment overrides applied and validated
    pub fn load(path: Option<&Path>) -> Result<Self, WordbookError> {
        let mut config = match path {
            Some(path) => Self::from_json_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(DB_PATH_ENV).filter(|v| !v.is_empty()) {
            self.database_path = PathBuf::from(path);
        }
        if let Some(url) = lookup(API_URL_ENV).filter(|v| !v.is_empty()) {
            self.api_base_url = url;
        }
    }

    pub fn validate(&self) -> Result<(), WordbookError> {
        if self.api_base_url.trim().is_empty() {
            return Err(WordbookError::Config("api_base_url is empty".into()));
        }
        if self.default_query.trim().is_empty() {
            return Err(WordbookError::Config("default_query is blank".into()));
        }
        if self.history_display_limit == 0 {
            return Err(WordbookError::Config(
                "history_display_limit must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
