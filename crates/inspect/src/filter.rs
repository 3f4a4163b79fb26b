//! Locating and inspecting a klog's bloom filter block.
//!
//! A klog ends with three special blocks:
//!
//! ```text
//! ... data blocks ... [index block][bloom block][metadata block] EOF
//! ```
//!
//! They are found by walking backwards through the footers. A forward walk
//! cannot be used because a disabled filter is written as a zero-size block,
//! which a forward walk treats as invalid.

use std::io::{Read, Seek};
use std::path::Path;

use block::{BlockError, BlockReader};
use bloom::BloomInspection;
use tracing::{debug, warn};

use crate::error::InspectError;
use crate::outcome::{Inspected, Warning, WarningLog};

/// Result of [`bloom_stats`].
#[derive(Debug, Clone, PartialEq)]
pub struct BloomReport {
    pub block_offset: u64,
    /// Payload size of the bloom block.
    pub block_size: u32,
    pub checksum_ok: bool,
    pub inspection: BloomInspection,
}

/// Reads the bloom filter of the klog at `path`.
///
/// # Errors
///
/// - [`InspectError::Open`] if the file cannot be opened.
/// - [`InspectError::TooFewBlocks`] if fewer than three trailing blocks
///   can be located.
/// - [`InspectError::BloomBlock`] if a footer or the bloom block is unreadable.
/// - [`InspectError::Bloom`] if the payload is not a valid filter.
pub fn bloom_stats<P: AsRef<Path>>(path: P) -> Result<Inspected<BloomReport>, InspectError> {
    let path = path.as_ref();
    let reader = BlockReader::open(path).map_err(|source| InspectError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    bloom_stats_reader(path, reader)
}

fn bloom_stats_reader<R: Read + Seek>(
    path: &Path,
    mut reader: BlockReader<R>,
) -> Result<Inspected<BloomReport>, InspectError> {
    let block_err = |source: BlockError| InspectError::BloomBlock {
        path: path.to_path_buf(),
        source,
    };
    let too_few = |found: u64| InspectError::TooFewBlocks {
        path: path.to_path_buf(),
        found,
    };

    let metadata = reader
        .last_block_offset()
        .map_err(block_err)?
        .ok_or_else(|| too_few(0))?;
    let bloom = reader
        .prev_block_offset(metadata)
        .map_err(block_err)?
        .ok_or_else(|| too_few(1))?;
    if reader.prev_block_offset(bloom).map_err(block_err)?.is_none() {
        return Err(too_few(2));
    }
    debug!(metadata, bloom, "located trailing blocks");

    let mut log = WarningLog::default();
    let header = reader.read_raw_header(bloom).map_err(block_err)?;
    if header.size == 0 {
        return Ok(log.finish(BloomReport {
            block_offset: bloom,
            block_size: 0,
            checksum_ok: true,
            inspection: BloomInspection::Disabled,
        }));
    }

    let block = reader.read_block(bloom).map_err(block_err)?;
    let checksum_ok = block.verify();
    if !checksum_ok {
        warn!(offset = bloom, "bloom block checksum mismatch");
        log.push(Warning::ChecksumMismatch { offset: bloom });
    }
    let inspection = bloom::inspect(&block.payload).map_err(|source| InspectError::Bloom {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(log.finish(BloomReport {
        block_offset: bloom,
        block_size: block.size(),
        checksum_ok,
        inspection,
    }))
}
