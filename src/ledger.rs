//! Bookkeeping of processed posts.
//!
//! The ledger is an explicit store handed to the ingestion driver; the
//! fetch core never touches it. Persisted as TOML so a run can skip posts
//! already handled by an earlier one.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Outcome record for one processed post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Canonical link back to the post.
    pub permalink: String,
    /// When the post was processed.
    pub processed_at: DateTime<Utc>,
    /// URLs extracted from the post, in appearance order.
    pub urls: Vec<String>,
    /// Destination directory the post's trees were rooted at.
    pub dest: String,
}

/// Store of processed posts, keyed by post id.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Ledger {
    #[serde(default)]
    entries: BTreeMap<String, LedgerEntry>,
}

impl Ledger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a ledger from `path`; a missing file is an empty ledger.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Ok(toml::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Saves the ledger to `path` atomically (write tmp + rename),
    /// creating missing parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be created or the file
    /// cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        let toml_str = toml::to_string(self)?;
        std::fs::write(&tmp_path, toml_str)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// True when the post id has already been processed.
    #[must_use]
    pub fn contains(&self, post_id: &str) -> bool {
        self.entries.contains_key(post_id)
    }

    /// Records (or replaces) the entry for a post.
    pub fn record(&mut self, post_id: impl Into<String>, entry: LedgerEntry) {
        self.entries.insert(post_id.into(), entry);
    }

    /// Looks up the entry for a post.
    #[must_use]
    pub fn get(&self, post_id: &str) -> Option<&LedgerEntry> {
        self.entries.get(post_id)
    }

    /// Number of recorded posts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
