//! Raw checksum sweep over every block of a file.
//!
//! The sweep does not decode entries. It walks `8 + size + 8` from offset 8,
//! recomputes every payload checksum and keeps going past mismatches. Only a
//! size outside `1..=MAX_BLOCK_SIZE` or a payload cut short by end-of-file
//! stops it, since after either the next block's offset is unknown.
//!
//! Faults are handed to a visitor as they are found; the report itself only
//! keeps counters, so a sweep holds one payload at a time however many
//! blocks are bad.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use block::{BlockCursor, BlockError, BlockReader, FILE_HEADER_BYTES};
use tracing::{info, warn};

use crate::error::InspectError;
use crate::fault::FaultKind;
use crate::outcome::{Inspected, Warning, WarningLog};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockFaultKind {
    Mismatch { stored: u32, computed: u32 },
    /// Size is zero or above the ceiling. Stops the sweep.
    InvalidSize(u32),
    /// The payload runs past end-of-file. Stops the sweep.
    ReadError { expected: u32, got: u64 },
}

impl BlockFaultKind {
    #[must_use]
    pub fn fault(&self) -> FaultKind {
        match self {
            BlockFaultKind::Mismatch { .. } => FaultKind::ChecksumMismatch,
            BlockFaultKind::InvalidSize(_) => FaultKind::OversizeField,
            BlockFaultKind::ReadError { .. } => FaultKind::Truncated,
        }
    }
}

/// A block that failed the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockFault {
    pub index: u64,
    pub offset: u64,
    pub size: u32,
    pub kind: BlockFaultKind,
}

impl fmt::Display for BlockFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            BlockFaultKind::Mismatch { stored, computed } => write!(
                f,
                "block {} at offset {}: checksum mismatch (size {}, stored {:#010x}, computed {:#010x})",
                self.index, self.offset, self.size, stored, computed
            ),
            BlockFaultKind::InvalidSize(size) => write!(
                f,
                "block {} at offset {}: invalid size {}",
                self.index, self.offset, size
            ),
            BlockFaultKind::ReadError { expected, got } => write!(
                f,
                "block {} at offset {}: read error (expected {}, got {})",
                self.index, self.offset, expected, got
            ),
        }
    }
}

/// Result of [`sweep`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub file_size: u64,
    /// Every block header examined, including one that stopped the sweep.
    pub total_blocks: u64,
    pub valid: u64,
    pub invalid: u64,
    /// Bytes of a partial header at end-of-file, not counted as a block.
    pub trailing_bytes: u64,
    /// An I/O error stopped the sweep before end-of-file; the blocks after
    /// it were never checked.
    pub interrupted: bool,
}

impl SweepReport {
    /// Every block was checked and none failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.invalid == 0 && !self.interrupted
    }
}

/// Opens `path` for [`sweep_reader`].
///
/// # Errors
///
/// Returns [`InspectError::Open`] if the file cannot be opened.
pub fn open<P: AsRef<Path>>(path: P) -> Result<BlockReader<BufReader<File>>, InspectError> {
    let path = path.as_ref();
    BlockReader::open(path).map_err(|source| InspectError::Open {
        path: path.to_path_buf(),
        source,
    })
}

/// Verifies the checksum of every block in the file at `path`, calling
/// `visit` for each block that fails.
///
/// # Errors
///
/// Returns [`InspectError::Open`] if the file cannot be opened. Corruption
/// is reported through `visit` and the [`SweepReport`] counters, never as
/// an error.
pub fn sweep<P, F>(path: P, visit: F) -> Result<Inspected<SweepReport>, InspectError>
where
    P: AsRef<Path>,
    F: FnMut(&BlockFault),
{
    let path = path.as_ref();
    let swept = sweep_reader(open(path)?, visit);
    info!(
        path = %path.display(),
        total = swept.value.total_blocks,
        invalid = swept.value.invalid,
        "checksum sweep finished"
    );
    Ok(swept)
}

/// [`sweep`] over an already opened reader.
pub fn sweep_reader<R, F>(mut reader: BlockReader<R>, mut visit: F) -> Inspected<SweepReport>
where
    R: Read + Seek,
    F: FnMut(&BlockFault),
{
    let mut log = WarningLog::default();
    let mut report = SweepReport {
        file_size: reader.len(),
        ..SweepReport::default()
    };
    if report.file_size < FILE_HEADER_BYTES {
        log.push(Warning::ShortFile {
            len: report.file_size,
        });
        return log.finish(report);
    }

    let mut cursor = BlockCursor::new();
    loop {
        let index = cursor.index();
        let offset = cursor.offset();
        let step = match cursor.next_block(&mut reader) {
            None => break,
            Some(step) => step,
        };

        let fault = match step {
            Ok((_, block)) => {
                report.total_blocks += 1;
                let computed = block.computed_checksum();
                if computed == block.stored_checksum() {
                    report.valid += 1;
                    continue;
                }
                BlockFault {
                    index,
                    offset,
                    size: block.size(),
                    kind: BlockFaultKind::Mismatch {
                        stored: block.stored_checksum(),
                        computed,
                    },
                }
            }
            Err(BlockError::TruncatedHeader { available, .. }) => {
                report.trailing_bytes = available;
                break;
            }
            Err(BlockError::Oversize { size, .. }) => {
                report.total_blocks += 1;
                BlockFault {
                    index,
                    offset,
                    size,
                    kind: BlockFaultKind::InvalidSize(size),
                }
            }
            Err(BlockError::TruncatedPayload {
                size, available, ..
            }) => {
                report.total_blocks += 1;
                BlockFault {
                    index,
                    offset,
                    size,
                    kind: BlockFaultKind::ReadError {
                        expected: size,
                        got: available,
                    },
                }
            }
            Err(e) => {
                warn!(error = %e, "checksum sweep interrupted");
                report.interrupted = true;
                log.push(Warning::Unreadable(e));
                break;
            }
        };

        warn!(%fault, "block failed verification");
        report.invalid += 1;
        visit(&fault);
    }

    log.finish(report)
}
