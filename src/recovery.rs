//! Replay of all surviving records in creation order.
//!
//! Segments are visited ascending by creation timestamp regardless of
//! directory listing order; each is reopened read-only by name, never
//! through the live write path's buffer. Corrupt or truncated entries are
//! tolerated per the rules in [`crate::reader`]; recovery's purpose is
//! best-effort replay of everything recoverable, not strict validation.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::ReplayMode;
use crate::error::{Result, WalError};
use crate::reader::SegmentReader;
use crate::segment;

enum SegmentOutcome {
    Completed { replayed: u64 },
    CallbackFailed(WalError),
}

/// Replay every valid payload under `dir`, oldest segment first, through
/// `callback`.
///
/// A callback failure is scoped by `mode`: `BestEffort` stops the current
/// segment and moves on to the next; `Strict` aborts and propagates.
/// Filesystem and segment-name errors always propagate.
pub fn replay<F>(dir: &Path, mode: ReplayMode, mut callback: F) -> Result<()>
where
    F: FnMut(&[u8]) -> Result<()>,
{
    let segments = segment::list_segments(dir)?;
    let mut total = 0;

    for info in &segments {
        let path = info.path(dir);
        debug!(segment = %path.display(), "replaying segment");

        match replay_segment(&path, &mut callback)? {
            SegmentOutcome::Completed { replayed } => total += replayed,
            SegmentOutcome::CallbackFailed(e) => match mode {
                ReplayMode::Strict => return Err(e),
                ReplayMode::BestEffort => {
                    warn!(
                        segment = %path.display(),
                        error = %e,
                        "callback failed, skipping rest of segment"
                    );
                }
            },
        }
    }

    info!(segments = segments.len(), records = total, "recovery complete");
    Ok(())
}

fn replay_segment<F>(path: &Path, callback: &mut F) -> Result<SegmentOutcome>
where
    F: FnMut(&[u8]) -> Result<()>,
{
    let mut reader = SegmentReader::open(path)?;
    let mut replayed = 0;

    while let Some(record) = reader.next()? {
        if let Err(e) = callback(&record.payload) {
            return Ok(SegmentOutcome::CallbackFailed(e));
        }
        replayed += 1;
    }

    Ok(SegmentOutcome::Completed { replayed })
}
