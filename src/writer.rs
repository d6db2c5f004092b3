//! Live-write path: retention, rotation, encode, buffered append.
//!
//! All mutation happens through [`Appender`], which the engine keeps behind a
//! single mutex; every operation here assumes that lock is held for its whole
//! duration.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info};

use crate::config::Config;
use crate::error::Result;
use crate::record::Record;
use crate::{reader, segment};

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Appender state: the active segment's buffered writer plus the logical
/// offset counter. One per engine, mutated only under the engine lock.
pub(crate) struct Appender {
    dir: PathBuf,
    segment_size: u64,
    max_segments: usize,
    fsync: bool,
    out: BufWriter<File>,
    next_offset: u64,
}

impl Appender {
    /// Create the log directory if absent, seed the offset counter from the
    /// surviving segments, and open a fresh active segment.
    pub fn open(config: &Config) -> Result<Self> {
        fs::create_dir_all(&config.log_dir)?;

        // The offset counter is monotonic across the log's entire lifetime:
        // resume one past the highest checksum-valid offset on disk.
        let mut next_offset = 0;
        for info in segment::list_segments(&config.log_dir)? {
            if let Some(last) = reader::last_offset(&info.path(&config.log_dir))? {
                next_offset = next_offset.max(last + 1);
            }
        }

        let file = segment::create_segment(&config.log_dir, unix_now())?;
        info!(
            dir = %config.log_dir.display(),
            next_offset,
            "opened write-ahead log"
        );

        Ok(Self {
            dir: config.log_dir.clone(),
            segment_size: config.segment_size,
            max_segments: config.max_segments,
            fsync: config.fsync,
            out: BufWriter::new(file),
            next_offset,
        })
    }

    /// Append one payload. Returns the logical offset assigned to it.
    ///
    /// Retention runs first (on the current segment listing), then the
    /// rotation check, then the encoded record goes to the buffered writer.
    /// Nothing is flushed synchronously; the first error from any filesystem
    /// operation propagates without retry.
    pub fn append(&mut self, payload: &[u8]) -> Result<u64> {
        let segments = segment::list_segments(&self.dir)?;
        segment::enforce_retention(&self.dir, &segments, self.max_segments)?;
        self.rotate_if_needed()?;

        let record = Record::new(self.next_offset, payload.to_vec());
        self.out.write_all(&record.encode())?;

        let offset = self.next_offset;
        self.next_offset += 1;
        Ok(offset)
    }

    /// Flush the buffered writer; with `fsync` configured, also force a
    /// storage-level durability barrier.
    pub fn sync(&mut self) -> Result<()> {
        self.out.flush()?;
        if self.fsync {
            self.out.get_ref().sync_all()?;
        }
        Ok(())
    }

    /// Rotate when the active segment's flushed size exceeds the threshold.
    ///
    /// The size comes from a stat of the file handle, not the buffered byte
    /// count. The sealed segment is flushed before being abandoned so no
    /// buffered bytes belonging to it can be lost.
    fn rotate_if_needed(&mut self) -> Result<()> {
        let size = self.out.get_ref().metadata()?.len();
        if size <= self.segment_size {
            return Ok(());
        }

        self.sync()?;
        debug!(size, threshold = self.segment_size, "rotating active segment");
        let file = segment::create_segment(&self.dir, unix_now())?;
        self.out = BufWriter::new(file);
        Ok(())
    }
}
