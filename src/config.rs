use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, WalError};

/// How a replay callback failure is scoped during recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayMode {
    /// Stop scanning the current segment, continue with the next one.
    /// Recovery itself still reports success.
    BestEffort,
    /// Abort recovery entirely and propagate the callback's error.
    Strict,
}

/// Configuration for a [`Wal`](crate::Wal) instance.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the segment files. Created if absent.
    pub log_dir: PathBuf,

    /// Size threshold in bytes at which the active segment is rotated.
    /// Compared with a strict greater-than test against the flushed file size.
    pub segment_size: u64,

    /// Maximum number of segment files retained. Once exceeded, the oldest
    /// segments are deleted until exactly this many remain. Must be >= 1,
    /// otherwise retention could delete the active segment.
    pub max_segments: usize,

    /// Interval between automatic background flushes.
    pub sync_interval: Duration,

    /// When set, every flush is followed by a storage-level durability
    /// barrier (`File::sync_all`). Without it, "synced" only means visible
    /// to other readers of the same file, not that it survives power loss.
    pub fsync: bool,

    /// Scope of a replay callback failure during recovery.
    pub replay_mode: ReplayMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("./seglog"),
            segment_size: 2 * 1024 * 1024,
            max_segments: 10,
            sync_interval: Duration::from_millis(200),
            fsync: false,
            replay_mode: ReplayMode::BestEffort,
        }
    }
}

impl Config {
    /// Convenience constructor with defaults for everything but the directory.
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.segment_size == 0 {
            return Err(WalError::Config("segment_size must be >= 1 byte".into()));
        }
        if self.max_segments == 0 {
            return Err(WalError::Config(
                "max_segments must be >= 1: retention would delete the active segment".into(),
            ));
        }
        if self.sync_interval.is_zero() {
            return Err(WalError::Config("sync_interval must be non-zero".into()));
        }
        Ok(())
    }
}
