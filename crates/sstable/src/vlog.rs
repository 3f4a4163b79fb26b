//! Value-log lookups.
//!
//! An externalized value is addressed by `(companion path, block offset)`.
//! Every lookup opens the companion file, reads one block and closes it
//! again; no handle outlives the call.

use std::path::Path;

use block::{BlockError, BlockReader};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum VlogError {
    /// The entry references a value log but none was supplied.
    #[error("no value log file supplied")]
    NoCompanionFile,

    /// The block at the referenced offset could not be read.
    #[error("value log read failed: {0}")]
    ReadFailed(#[source] BlockError),

    #[error(
        "value log checksum mismatch at offset {offset}: stored {stored:#010x}, computed {computed:#010x}"
    )]
    ChecksumMismatch {
        offset: u64,
        stored: u32,
        computed: u32,
    },
}

impl VlogError {
    /// Short tag printed in place of a value that could not be resolved.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            VlogError::NoCompanionFile => "NO_VLOG_FILE",
            VlogError::ReadFailed(_) => "READ_ERR",
            VlogError::ChecksumMismatch { .. } => "CHECKSUM_ERR",
        }
    }
}

/// Fetches the value stored in the block at `offset` of `companion`.
///
/// A payload whose length differs from `expected_len` is still returned;
/// the disagreement is only logged.
///
/// # Errors
///
/// - [`VlogError::NoCompanionFile`] when `companion` is `None`.
/// - [`VlogError::ReadFailed`] when the file cannot be opened or the block
///   at `offset` is truncated, oversized or unreadable.
/// - [`VlogError::ChecksumMismatch`] when the block payload fails
///   verification.
pub fn resolve(
    companion: Option<&Path>,
    offset: u64,
    expected_len: u64,
) -> Result<Vec<u8>, VlogError> {
    let path = companion.ok_or(VlogError::NoCompanionFile)?;
    let mut reader = BlockReader::open(path)
        .map_err(|source| VlogError::ReadFailed(BlockError::Io { offset: 0, source }))?;
    let block = reader.read_block(offset).map_err(VlogError::ReadFailed)?;

    let computed = block.computed_checksum();
    if computed != block.stored_checksum() {
        return Err(VlogError::ChecksumMismatch {
            offset,
            stored: block.stored_checksum(),
            computed,
        });
    }

    if block.payload.len() as u64 != expected_len {
        warn!(
            offset,
            expected_len,
            actual = block.payload.len(),
            "value log block length differs from entry value_len"
        );
    }
    debug!(offset, len = block.payload.len(), "resolved value log entry");
    Ok(block.payload)
}
