/// Record framing.
///
/// On-disk layout (all integers little-endian):
///   [offset: u64] [length: u32] [crc32: u32] [payload: length bytes] [b'\n']
///
/// The checksum is CRC-32 (IEEE) over the raw payload bytes alone. The
/// trailing delimiter is part of the historical format and is written
/// verbatim; decoding tolerates an exact trailing delimiter or none at all.
use crate::error::{Result, WalError};

/// Fixed header size: offset (8) + length (4) + checksum (4).
pub const HEADER_SIZE: usize = 16;

/// Byte terminating every record on disk.
pub const DELIMITER: u8 = b'\n';

/// One logical unit of caller data, as it travels through the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Logical offset: monotonically increasing across the log's lifetime.
    pub offset: u64,
    /// Caller payload, never interpreted by the engine.
    pub payload: Vec<u8>,
}

impl Record {
    pub fn new(offset: u64, payload: Vec<u8>) -> Self {
        Self { offset, payload }
    }

    /// Total encoded size on disk, delimiter included.
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.payload.len() + 1
    }

    /// Serialize to the on-disk frame.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.extend_from_slice(&self.offset.to_le_bytes());
        buf.extend_from_slice(&(self.payload.len() as u32).to_le_bytes());
        buf.extend_from_slice(&crc32fast::hash(&self.payload).to_le_bytes());
        buf.extend_from_slice(&self.payload);
        buf.push(DELIMITER);
        buf
    }

    /// Deserialize one frame.
    ///
    /// Fails with [`WalError::TooShort`] when the buffer cannot even hold a
    /// header, [`WalError::LengthMismatch`] when the declared payload length
    /// disagrees with the frame, and [`WalError::ChecksumMismatch`] when the
    /// payload fails integrity verification.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(WalError::TooShort { len: buf.len() });
        }

        let offset = u64::from_le_bytes(buf[0..8].try_into().unwrap());
        let declared = u32::from_le_bytes(buf[8..12].try_into().unwrap()) as usize;
        let stored = u32::from_le_bytes(buf[12..16].try_into().unwrap());

        let mut body = &buf[HEADER_SIZE..];
        if body.len() == declared + 1 && body[declared] == DELIMITER {
            body = &body[..declared];
        }
        if body.len() != declared {
            return Err(WalError::LengthMismatch {
                declared,
                actual: body.len(),
            });
        }

        let computed = crc32fast::hash(body);
        if computed != stored {
            return Err(WalError::ChecksumMismatch { stored, computed });
        }

        Ok(Record {
            offset,
            payload: body.to_vec(),
        })
    }
}
