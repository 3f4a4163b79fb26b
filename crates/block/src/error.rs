use std::io;

use thiserror::Error;

/// Errors raised while reading a single block.
#[derive(Debug, Error)]
pub enum BlockError {
    /// Fewer than 8 bytes remain where a block header should start.
    #[error("truncated block header at offset {offset}: {available} of 8 bytes available")]
    TruncatedHeader { offset: u64, available: u64 },

    /// The header was read but the file ends before the declared payload does.
    #[error(
        "truncated block payload at offset {offset}: size {size}, {available} bytes available"
    )]
    TruncatedPayload {
        offset: u64,
        size: u32,
        available: u64,
    },

    /// The declared payload size is zero or above the sanity ceiling.
    #[error("invalid block size {size} at offset {offset}")]
    Oversize { offset: u64, size: u32 },

    /// A footer disagrees with the header it should mirror.
    #[error(
        "block footer ending at {end} records size {footer_size}, header at {offset} says {header_size}"
    )]
    FooterMismatch {
        offset: u64,
        end: u64,
        footer_size: u32,
        header_size: u32,
    },

    /// An underlying I/O error.
    #[error("io error at offset {offset}: {source}")]
    Io {
        offset: u64,
        #[source]
        source: io::Error,
    },
}

impl BlockError {
    /// Byte offset of the block (or footer) that failed.
    #[must_use]
    pub fn offset(&self) -> u64 {
        match self {
            BlockError::TruncatedHeader { offset, .. }
            | BlockError::TruncatedPayload { offset, .. }
            | BlockError::Oversize { offset, .. }
            | BlockError::FooterMismatch { offset, .. }
            | BlockError::Io { offset, .. } => *offset,
        }
    }

    /// Returns `true` for a block cut short by end-of-file.
    ///
    /// A truncated last block is what a write in progress looks like, so
    /// callers usually report it as a warning rather than corruption.
    #[must_use]
    pub fn is_truncation(&self) -> bool {
        matches!(
            self,
            BlockError::TruncatedHeader { .. } | BlockError::TruncatedPayload { .. }
        )
    }
}
