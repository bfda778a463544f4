//! Persistent record of when each cached URL was last confirmed current

use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File name of the record inside the application directory
pub const CHECK_TIMES_FILE: &str = "cachedUrlCheckTimes.json";

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S UTC";

#[derive(Debug, Default)]
pub struct UrlCheckTimes {
    path: PathBuf,
    times: BTreeMap<String, String>,
    modified: bool,
}

impl UrlCheckTimes {
    /// Empty record that will persist to `<app_dir>/cachedUrlCheckTimes.json`
    pub fn new(app_dir: &Path) -> Self {
        Self {
            path: app_dir.join(CHECK_TIMES_FILE),
            times: BTreeMap::new(),
            modified: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the record from disk. A missing or unreadable file leaves it empty.
    pub async fn load(&mut self) {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(times) => {
                    self.times = times;
                    debug!(entries = self.times.len(), "loaded url check times");
                }
                Err(e) => warn!(path = %self.path.display(), error = %e, "ignoring unreadable url check times"),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "cannot read url check times"),
        }
        self.modified = false;
    }

    /// Write the record back if anything changed since loading
    pub async fn save(&mut self) -> std::io::Result<()> {
        if !self.modified {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(&self.times)?;
        tokio::fs::write(&self.path, content).await?;
        self.modified = false;
        Ok(())
    }

    /// When `url` was last confirmed current
    pub fn get(&self, url: &str) -> Option<DateTime<Utc>> {
        let value = self.times.get(url)?;
        NaiveDateTime::parse_from_str(value, TIME_FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    }

    /// Record that `url` was confirmed current at `when`
    pub fn touch(&mut self, url: &str, when: DateTime<Utc>) {
        self.times
            .insert(url.to_string(), when.format(TIME_FORMAT).to_string());
        self.modified = true;
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}
