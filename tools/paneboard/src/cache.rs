use crate::errors::BoardError;
use crate::runtime::{Clock, FileSystem};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Slack subtracted from a pane's interval so a tick landing slightly late
/// still executes instead of replaying the previous tick's output.
pub const FRESHNESS_GRACE: Duration = Duration::from_secs(5);

/// Last successful command output per pane, one plain-text file each.
///
/// The file's modification time is the only freshness signal. Every failure
/// to persist is swallowed: a cache that cannot be written simply never
/// reports fresh.
pub struct CacheStore {
    dir: Option<PathBuf>,
    fs: Arc<dyn FileSystem>,
    clock: Arc<dyn Clock>,
}

impl CacheStore {
    pub fn new(dir: impl AsRef<Path>, fs: Arc<dyn FileSystem>, clock: Arc<dyn Clock>) -> Self {
        Self {
            dir: Some(dir.as_ref().to_path_buf()),
            fs,
            clock,
        }
    }

    /// A store that never hits and never writes.
    pub fn disabled(fs: Arc<dyn FileSystem>, clock: Arc<dyn Clock>) -> Self {
        Self {
            dir: None,
            fs,
            clock,
        }
    }

    pub fn entry_path(&self, id: &str) -> Option<PathBuf> {
        let dir = self.dir.as_ref()?;
        Some(dir.join(id.replace(['/', '\\'], "_")))
    }

    /// True when an entry exists and was written within
    /// `interval - FRESHNESS_GRACE` of now. An interval of zero is never fresh.
    pub fn is_fresh(&self, id: &str, interval: Duration) -> bool {
        let Some(path) = self.entry_path(id) else {
            return false;
        };
        let Some(modified) = self.fs.modified(&path) else {
            return false;
        };
        match freshness_threshold(self.clock.now(), interval) {
            Some(threshold) => modified >= threshold,
            None => false,
        }
    }

    pub fn is_stale(&self, id: &str, interval: Duration) -> bool {
        !self.is_fresh(id, interval)
    }

    pub fn read(&self, id: &str) -> Result<String, BoardError> {
        let path = self
            .entry_path(id)
            .ok_or_else(|| BoardError::NotFound(format!("cache disabled for {id}")))?;
        self.fs.read_to_string(&path)
    }

    pub fn write(&self, id: &str, text: &str) {
        let Some(path) = self.entry_path(id) else {
            return;
        };
        if let Some(parent) = path.parent() {
            let _ = self.fs.create_dir_all(parent);
        }
        let _ = self.fs.write_string(&path, text);
    }
}

fn freshness_threshold(now: SystemTime, interval: Duration) -> Option<SystemTime> {
    if interval >= FRESHNESS_GRACE {
        now.checked_sub(interval - FRESHNESS_GRACE)
    } else {
        now.checked_add(FRESHNESS_GRACE - interval)
    }
}
