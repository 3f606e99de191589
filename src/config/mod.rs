//! Configuration types for ingestion and fetching.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Fetch and ingestion behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Whether to re-process posts already in the ledger.
    pub overwrite: bool,
    /// Subreddit to search for candidate posts.
    pub subreddit: String,
    /// Search query selecting candidate posts.
    pub search_query: String,
    /// Maximum posts per search.
    pub search_limit: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            overwrite: false,
            subreddit: "MusicalScores".to_string(),
            search_query: "flair:Submission".to_string(),
            search_limit: 100,
        }
    }
}

impl FetchConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether ledgered posts are re-processed.
    #[must_use]
    pub const fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Sets the subreddit to search.
    #[must_use]
    pub fn with_subreddit(mut self, subreddit: impl Into<String>) -> Self {
        self.subreddit = subreddit.into();
        self
    }

    /// Sets the search query.
    #[must_use]
    pub fn with_search_query(mut self, query: impl Into<String>) -> Self {
        self.search_query = query.into();
        self
    }

    /// Sets the maximum posts per search.
    #[must_use]
    pub const fn with_search_limit(mut self, limit: u32) -> Self {
        self.search_limit = limit;
        self
    }
}

/// Path configuration for data, bookkeeping, and secrets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Directory fetched trees are rooted at.
    pub data_dir: PathBuf,
    /// Ledger file recording processed posts.
    pub ledger_path: PathBuf,
    /// Drive OAuth token secrets file.
    pub drive_secrets: PathBuf,
    /// Reddit script-app secrets file.
    pub reddit_secrets: PathBuf,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/scores"),
            ledger_path: PathBuf::from("data/ledger.toml"),
            drive_secrets: PathBuf::from("secrets/drive_user_token.json"),
            reddit_secrets: PathBuf::from("secrets/reddit.json"),
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Fetch and ingestion behavior.
    pub fetch: FetchConfig,
    /// Path configuration.
    pub paths: PathConfig,
}

impl AppConfig {
    /// Creates a config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Default location of the config file
    /// (`<config dir>/scores-dl/config.toml`).
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("scores-dl")
            .join("config.toml")
    }

    /// Loads configuration from `path` (or the default location when
    /// `None`); a missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map_or_else(Self::default_path, Path::to_path_buf);
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(toml::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }
}
