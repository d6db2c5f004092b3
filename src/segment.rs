//! Segment bookkeeping: naming, listing, creation, retention.
//!
//! A segment is one file named `segment-<unix-seconds>`. Exactly one segment
//! is active (open for append) at a time; all others are sealed and
//! referenced only by name and timestamp. Creation order, and therefore total
//! record order across the log's lifetime, is derived entirely from the
//! timestamp embedded in the filename — there is no manifest or index file.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, WalError};

/// Filename prefix shared by every segment file.
pub const SEGMENT_PREFIX: &str = "segment-";

/// One segment as seen by retention and recovery: name plus parsed creation
/// timestamp, used purely for ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentInfo {
    pub name: String,
    pub timestamp: u64,
}

impl SegmentInfo {
    pub fn path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.name)
    }
}

/// List all segment files under `dir`, sorted ascending by creation
/// timestamp.
///
/// Subdirectories and files without the recognized prefix are skipped. A
/// prefixed name whose suffix is not a base-10 integer is an error: a
/// malformed segment name is a bug in the storage, not benign corruption.
pub fn list_segments(dir: &Path) -> Result<Vec<SegmentInfo>> {
    let mut segments = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(suffix) = name.strip_prefix(SEGMENT_PREFIX) else {
            continue;
        };
        let timestamp = suffix.parse::<u64>().map_err(|e| WalError::SegmentName {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        segments.push(SegmentInfo { name, timestamp });
    }

    segments.sort_by_key(|s| s.timestamp);
    Ok(segments)
}

/// Create (or reopen) the segment file for `timestamp`, opened for append,
/// read, and write.
///
/// A same-second collision reopens the existing file and appends to it
/// rather than truncating — a narrow ordering hazard inherited from the
/// on-disk format, kept for compatibility.
pub fn create_segment(dir: &Path, timestamp: u64) -> Result<File> {
    let path = dir.join(format!("{SEGMENT_PREFIX}{timestamp}"));
    debug!(path = %path.display(), "opening active segment");
    let file = OpenOptions::new()
        .read(true)
        .create(true)
        .append(true)
        .open(path)?;
    Ok(file)
}

/// Delete the oldest segments until at most `max` remain.
///
/// No-op while the segment count is below `max`. `segments` must be sorted
/// ascending by timestamp (as returned by [`list_segments`]). A deletion
/// failure aborts and propagates: the append that triggered retention fails.
pub fn enforce_retention(dir: &Path, segments: &[SegmentInfo], max: usize) -> Result<()> {
    if segments.len() < max {
        return Ok(());
    }

    let mut remaining = segments.len();
    for segment in segments {
        if remaining <= max {
            break;
        }
        let path = segment.path(dir);
        debug!(path = %path.display(), "retention: deleting oldest segment");
        fs::remove_file(&path)?;
        remaining -= 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        File::create(dir.join(name)).unwrap();
    }

    #[test]
    fn test_list_sorted_by_timestamp() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "segment-300");
        touch(dir.path(), "segment-100");
        touch(dir.path(), "segment-200");

        let segments = list_segments(dir.path()).unwrap();
        let timestamps: Vec<u64> = segments.iter().map(|s| s.timestamp).collect();
        assert_eq!(timestamps, vec![100, 200, 300]);
    }

    #[test]
    fn test_list_skips_foreign_files_and_dirs() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "segment-100");
        touch(dir.path(), "notes.txt");
        fs::create_dir(dir.path().join("segment-999")).unwrap();

        let segments = list_segments(dir.path()).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].name, "segment-100");
    }

    #[test]
    fn test_list_rejects_non_numeric_suffix() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "segment-abc");

        let err = list_segments(dir.path()).unwrap_err();
        assert!(matches!(err, WalError::SegmentName { .. }));
    }

    #[test]
    fn test_create_reopens_on_collision() {
        let dir = TempDir::new().unwrap();

        let mut first = create_segment(dir.path(), 100).unwrap();
        first.write_all(b"hello").unwrap();
        drop(first);

        // Same timestamp reopens and appends, never truncates.
        let mut second = create_segment(dir.path(), 100).unwrap();
        second.write_all(b" world").unwrap();
        drop(second);

        let content = fs::read(dir.path().join("segment-100")).unwrap();
        assert_eq!(content, b"hello world");
    }

    #[test]
    fn test_retention_noop_below_max() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "segment-100");
        touch(dir.path(), "segment-200");

        let segments = list_segments(dir.path()).unwrap();
        enforce_retention(dir.path(), &segments, 3).unwrap();
        assert_eq!(list_segments(dir.path()).unwrap().len(), 2);
    }

    #[test]
    fn test_retention_deletes_oldest_down_to_max() {
        let dir = TempDir::new().unwrap();
        for ts in [100, 200, 300, 400, 500] {
            touch(dir.path(), &format!("segment-{ts}"));
        }

        let segments = list_segments(dir.path()).unwrap();
        enforce_retention(dir.path(), &segments, 2).unwrap();

        let remaining = list_segments(dir.path()).unwrap();
        let timestamps: Vec<u64> = remaining.iter().map(|s| s.timestamp).collect();
        assert_eq!(timestamps, vec![400, 500]);
    }

    #[test]
    fn test_retention_at_exactly_max_keeps_all() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "segment-100");
        touch(dir.path(), "segment-200");

        let segments = list_segments(dir.path()).unwrap();
        enforce_retention(dir.path(), &segments, 2).unwrap();
        assert_eq!(list_segments(dir.path()).unwrap().len(), 2);
    }
}
