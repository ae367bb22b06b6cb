//! Error types for archive decoding.

use std::path::PathBuf;
use thiserror::Error;

use super::PlainOldDataType;

/// Main error type for decode operations.
///
/// Every failure is terminal for the call that produced it; no partial
/// header list or sample is ever returned alongside an error.
#[derive(Error, Debug)]
pub enum Error {
    /// Non-empty data block shorter than the mandatory 16-byte key
    #[error("Malformed record: {size} bytes is non-empty but shorter than the 16-byte key")]
    MalformedRecord { size: u64 },

    /// Element kind code outside 0..=13
    #[error("Unknown element kind code: {0}")]
    UnknownElementKind(u8),

    /// Conversion between a string kind and anything else
    #[error("Cannot convert {from} data to {to}")]
    InvalidConversion {
        from: PlainOldDataType,
        to: PlainOldDataType,
    },

    /// Time sampling index not present in the archive registry
    #[error("Time sampling {index} not found (registry holds {count})")]
    TimeSamplingNotFound { index: u32, count: usize },

    /// Record runs past the end of its buffer
    #[error("Truncated {what} at byte {pos}: need {needed} bytes, buffer holds {len}")]
    Truncated {
        what: &'static str,
        pos: usize,
        needed: usize,
        len: usize,
    },

    /// Destination buffer cannot hold the decoded sample
    #[error("Destination buffer too small: need {needed} bytes, got {got}")]
    BufferTooSmall { needed: usize, got: usize },

    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Invalid magic bytes at start of file
    #[error("Invalid archive: expected Ogawa magic bytes")]
    InvalidMagic,

    /// Unsupported file format version
    #[error("Unsupported archive version: {0}")]
    UnsupportedVersion(i32),

    /// File is truncated or corrupted
    #[error("Unexpected end of file at position {0}")]
    UnexpectedEof(u64),

    /// Invalid data structure in file
    #[error("Invalid file structure: {0}")]
    InvalidStructure(String),

    /// Child is a group where data was expected, or the reverse
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// Sample index out of bounds
    #[error("Sample index {index} out of bounds (count: {count})")]
    SampleOutOfBounds { index: usize, count: usize },

    /// Child index out of bounds
    #[error("Child index {index} out of bounds (count: {count})")]
    ChildOutOfBounds { index: usize, count: usize },

    /// Memory mapping failed
    #[error("Memory mapping failed: {0}")]
    MmapFailed(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an invalid structure error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidStructure(msg.into())
    }
}

/// Result type alias for decode operations.
pub type Result<T> = std::result::Result<T, Error>;
