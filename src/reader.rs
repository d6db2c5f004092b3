//! Corruption-tolerant scan over a single segment file.
//!
//! Records are framed by their self-describing header: the scan reads the
//! 16-byte header exactly, then exactly the declared payload length, then the
//! delimiter byte. Payloads containing the delimiter byte are therefore safe
//! to replay, even though the on-disk bytes are identical to the historical
//! line-delimited format.
//!
//! Tolerance rules:
//! - A partial header, truncated payload, or missing delimiter can only occur
//!   at the segment tail (crash mid-write); it is logged and ends the scan.
//! - A present-but-wrong delimiter byte means the length field cannot be
//!   trusted, and with it every later frame boundary; logged, scan ends.
//! - A checksum mismatch with intact framing affects only that record; it is
//!   logged and skipped, and the scan continues.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{Result, WalError};
use crate::record::{Record, DELIMITER, HEADER_SIZE};

/// Outcome of an exact-length read against a possibly truncated file.
enum Fill {
    Full,
    Eof,
    Partial(usize),
}

fn read_exact_or_eof(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<Fill> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(Fill::Eof),
            Ok(0) => return Ok(Fill::Partial(filled)),
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(Fill::Full)
}

/// Sequential reader over one segment's records.
///
/// The segment's length is captured at open time; records appended to the
/// file after that are not part of the scan and are reported as tail.
pub struct SegmentReader {
    reader: BufReader<File>,
    path: PathBuf,
    /// File length at open time, used to reject lengths that overflow the file.
    remaining: u64,
}

impl SegmentReader {
    /// Open a segment read-only.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let remaining = file.metadata()?.len();
        Ok(Self {
            reader: BufReader::new(file),
            path: path.to_path_buf(),
            remaining,
        })
    }

    /// Next valid record, or `None` once the segment is exhausted.
    ///
    /// Checksum-corrupt records are skipped with a warning; truncated or
    /// mis-framed tails end the scan with a warning. Only genuine I/O
    /// failures surface as errors.
    pub fn next(&mut self) -> Result<Option<Record>> {
        loop {
            let mut header = [0u8; HEADER_SIZE];
            match read_exact_or_eof(&mut self.reader, &mut header)? {
                Fill::Full => {}
                Fill::Eof => return Ok(None),
                Fill::Partial(len) => {
                    warn!(
                        segment = %self.path.display(),
                        len,
                        "record too short: partial header at segment tail, ending scan"
                    );
                    return Ok(None);
                }
            }
            self.remaining = self.remaining.saturating_sub(HEADER_SIZE as u64);

            let declared = u32::from_le_bytes(header[8..12].try_into().unwrap()) as usize;
            // +1 for the delimiter byte.
            if declared as u64 + 1 > self.remaining {
                warn!(
                    segment = %self.path.display(),
                    declared,
                    remaining = self.remaining,
                    "declared payload overflows segment: truncated tail, ending scan"
                );
                return Ok(None);
            }

            let mut frame = vec![0u8; HEADER_SIZE + declared + 1];
            frame[..HEADER_SIZE].copy_from_slice(&header);
            match read_exact_or_eof(&mut self.reader, &mut frame[HEADER_SIZE..])? {
                Fill::Full => {}
                Fill::Eof | Fill::Partial(_) => {
                    warn!(
                        segment = %self.path.display(),
                        "truncated record at segment tail, ending scan"
                    );
                    return Ok(None);
                }
            }
            self.remaining = self.remaining.saturating_sub(declared as u64 + 1);

            if frame[HEADER_SIZE + declared] != DELIMITER {
                warn!(
                    segment = %self.path.display(),
                    "missing record delimiter: framing unreliable, ending scan"
                );
                return Ok(None);
            }

            match Record::decode(&frame) {
                Ok(record) => return Ok(Some(record)),
                Err(e @ WalError::ChecksumMismatch { .. }) => {
                    warn!(segment = %self.path.display(), error = %e, "skipping corrupt record");
                    continue;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Highest logical offset carried by any checksum-valid record in the
/// segment, or `None` when the segment holds no valid records.
pub(crate) fn last_offset(path: &Path) -> Result<Option<u64>> {
    let mut reader = SegmentReader::open(path)?;
    let mut last = None;
    while let Some(record) = reader.next()? {
        last = Some(record.offset);
    }
    Ok(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_segment(dir: &Path, name: &str, records: &[Record]) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        for record in records {
            file.write_all(&record.encode()).unwrap();
        }
        path
    }

    fn records(offsets: std::ops::Range<u64>) -> Vec<Record> {
        offsets
            .map(|i| Record::new(i, format!("payload-{i}").into_bytes()))
            .collect()
    }

    #[test]
    fn test_scan_in_order() {
        let dir = TempDir::new().unwrap();
        let path = write_segment(dir.path(), "segment-1", &records(0..5));

        let mut reader = SegmentReader::open(&path).unwrap();
        for i in 0..5 {
            let record = reader.next().unwrap().unwrap();
            assert_eq!(record.offset, i);
            assert_eq!(record.payload, format!("payload-{i}").into_bytes());
        }
        assert!(reader.next().unwrap().is_none());
    }

    #[test]
    fn test_payload_with_delimiter_bytes_survives_scan() {
        let dir = TempDir::new().unwrap();
        let recs = vec![
            Record::new(0, b"a\nb\nc".to_vec()),
            Record::new(1, b"\n\n\n".to_vec()),
            Record::new(2, b"plain".to_vec()),
        ];
        let path = write_segment(dir.path(), "segment-1", &recs);

        let mut reader = SegmentReader::open(&path).unwrap();
        for expected in &recs {
            assert_eq!(reader.next().unwrap().unwrap(), *expected);
        }
        assert!(reader.next().unwrap().is_none());
    }

    #[test]
    fn test_checksum_corruption_skipped_scan_continues() {
        let dir = TempDir::new().unwrap();
        let recs = records(0..3);
        let path = write_segment(dir.path(), "segment-1", &recs);

        // Flip a checksum byte of the middle record.
        let mut bytes = std::fs::read(&path).unwrap();
        let second_start = recs[0].encoded_len();
        bytes[second_start + 12] ^= 0xFF;
        std::fs::write(&path, &bytes).unwrap();

        let mut reader = SegmentReader::open(&path).unwrap();
        let seen: Vec<u64> = std::iter::from_fn(|| reader.next().unwrap())
            .map(|r| r.offset)
            .collect();
        assert_eq!(seen, vec![0, 2]);
    }

    #[test]
    fn test_partial_header_at_tail_tolerated() {
        let dir = TempDir::new().unwrap();
        let path = write_segment(dir.path(), "segment-1", &records(0..2));

        // Append fewer bytes than a header.
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&[0xDE; 7]).unwrap();
        drop(file);

        let mut reader = SegmentReader::open(&path).unwrap();
        assert_eq!(reader.next().unwrap().unwrap().offset, 0);
        assert_eq!(reader.next().unwrap().unwrap().offset, 1);
        assert!(reader.next().unwrap().is_none());
    }

    #[test]
    fn test_truncated_payload_at_tail_tolerated() {
        let dir = TempDir::new().unwrap();
        let recs = records(0..2);
        let path = write_segment(dir.path(), "segment-1", &recs);

        // Cut the last record's payload short.
        let full = std::fs::read(&path).unwrap();
        std::fs::write(&path, &full[..full.len() - 5]).unwrap();

        let mut reader = SegmentReader::open(&path).unwrap();
        assert_eq!(reader.next().unwrap().unwrap().offset, 0);
        assert!(reader.next().unwrap().is_none());
    }

    #[test]
    fn test_oversized_declared_length_tolerated_as_tail() {
        let dir = TempDir::new().unwrap();
        let path = write_segment(dir.path(), "segment-1", &records(0..1));

        // A header claiming more payload than the file holds.
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        let mut bogus = Vec::new();
        bogus.extend_from_slice(&1u64.to_le_bytes());
        bogus.extend_from_slice(&u32::MAX.to_le_bytes());
        bogus.extend_from_slice(&0u32.to_le_bytes());
        file.write_all(&bogus).unwrap();
        drop(file);

        let mut reader = SegmentReader::open(&path).unwrap();
        assert_eq!(reader.next().unwrap().unwrap().offset, 0);
        assert!(reader.next().unwrap().is_none());
    }

    #[test]
    fn test_records_appended_mid_scan_reported_as_tail() {
        let dir = TempDir::new().unwrap();
        let path = write_segment(dir.path(), "segment-1", &records(0..1));

        let mut reader = SegmentReader::open(&path).unwrap();

        // Grow the file after the reader captured its length.
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&Record::new(1, b"late".to_vec()).encode())
            .unwrap();
        drop(file);

        assert_eq!(reader.next().unwrap().unwrap().offset, 0);
        assert!(reader.next().unwrap().is_none());
    }

    #[test]
    fn test_last_offset() {
        let dir = TempDir::new().unwrap();
        let path = write_segment(dir.path(), "segment-1", &records(5..9));
        assert_eq!(last_offset(&path).unwrap(), Some(8));

        let empty = write_segment(dir.path(), "segment-2", &[]);
        assert_eq!(last_offset(&empty).unwrap(), None);
    }
}
