use thiserror::Error;

#[derive(Error, Debug)]
pub enum WalError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("record too short: {len} bytes, header needs 16")]
    TooShort { len: usize },

    #[error("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    #[error("record length mismatch: header declares {declared} bytes, frame holds {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("invalid segment name {name:?}: {reason}")]
    SegmentName { name: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("replay callback failed: {0}")]
    Callback(String),
}

pub type Result<T> = std::result::Result<T, WalError>;
