//! seglog: a segmented, crash-resilient write-ahead log.
//!
//! An embeddable durability primitive with:
//! - Append-only records framed with CRC-32 checksums
//! - Size-bounded segment files rotated automatically
//! - Retention capping the number of segments kept on disk
//! - A background thread flushing the write buffer periodically
//! - Corruption-tolerant replay of all surviving records in creation order
//!
//! The engine never interprets record contents: callers supply payload bytes
//! to [`Wal::append`] and a callback to [`Wal::recover`] that receives
//! replayed payloads.
//!
//! ```no_run
//! use seglog::{Config, Wal};
//!
//! # fn main() -> seglog::Result<()> {
//! let mut wal = Wal::open(Config::new("./wal"))?;
//! wal.append(b"SET x 23")?;
//! wal.sync()?;
//!
//! let mut count = 0;
//! wal.recover(|_payload| {
//!     count += 1;
//!     Ok(())
//! })?;
//! wal.close()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod record;
pub mod recovery;
pub mod segment;

mod reader;
mod syncer;
mod writer;

pub use config::{Config, ReplayMode};
pub use error::{Result, WalError};
pub use reader::SegmentReader;
pub use record::Record;

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use tracing::warn;

use crate::writer::Appender;

/// A write-ahead log over one directory of segment files.
///
/// One instance per log directory. All mutation is serialized by a single
/// internal lock held for the whole of each operation; the background flush
/// thread competes for the same lock.
pub struct Wal {
    appender: Arc<Mutex<Appender>>,
    log_dir: PathBuf,
    replay_mode: ReplayMode,
    shutdown: Sender<()>,
    syncer: Option<JoinHandle<()>>,
}

impl Wal {
    /// Open (or create) the log: create the directory if absent, seed the
    /// offset counter from surviving segments, open a fresh active segment,
    /// and start the background syncer.
    pub fn open(config: Config) -> Result<Wal> {
        config.validate()?;

        let appender = Arc::new(Mutex::new(Appender::open(&config)?));
        let (shutdown, shutdown_rx) = crossbeam_channel::bounded(1);
        let syncer = syncer::spawn(Arc::clone(&appender), config.sync_interval, shutdown_rx)?;

        Ok(Wal {
            appender,
            log_dir: config.log_dir,
            replay_mode: config.replay_mode,
            shutdown,
            syncer: Some(syncer),
        })
    }

    /// Append one payload to the active segment. Returns the logical offset
    /// assigned to the record.
    ///
    /// Retention and rotation are evaluated before the record is encoded, so
    /// every append either lands in a segment known to satisfy the
    /// size/retention policy or triggers rotation first. The record is
    /// buffered, not flushed synchronously.
    pub fn append(&self, payload: &[u8]) -> Result<u64> {
        self.appender.lock().append(payload)
    }

    /// Flush the buffered writer to the underlying file. With
    /// [`Config::fsync`] set, also force a storage-level durability barrier.
    pub fn sync(&self) -> Result<()> {
        self.appender.lock().sync()
    }

    /// Replay all surviving records, oldest segment first, through
    /// `callback`. Corrupt and truncated entries are skipped with log-level
    /// notices; callback failures are scoped by [`Config::replay_mode`].
    ///
    /// Recovery reopens segment files by name and never touches the live
    /// write buffer, so it is meant to run before or after the live-write
    /// phase, not concurrently with it.
    pub fn recover<F>(&self, callback: F) -> Result<()>
    where
        F: FnMut(&[u8]) -> Result<()>,
    {
        recovery::replay(&self.log_dir, self.replay_mode, callback)
    }

    /// Stop the background syncer and perform a final flush. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        if let Some(handle) = self.syncer.take() {
            let _ = self.shutdown.send(());
            if handle.join().is_err() {
                warn!("background syncer panicked during shutdown");
            }
        }
        self.appender.lock().sync()
    }

    /// The directory holding this log's segment files.
    pub fn log_dir(&self) -> &PathBuf {
        &self.log_dir
    }
}

impl Drop for Wal {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "final flush failed during drop");
        }
    }
}
