use std::fmt;

use block::BlockError;
use sstable::{EntryError, EntryFault};
use wal::WalFault;

use crate::fault::FaultKind;

/// Warnings kept per inspection; later ones are only counted.
pub const MAX_WARNINGS: usize = 100;

/// Something the inspection skipped or could not fully trust.
#[derive(Debug)]
pub enum Warning {
    /// The file cannot even hold its file header.
    ShortFile { len: u64 },
    LargeFile { size: u64, threshold: u64 },
    /// A partial block at end-of-file.
    TruncatedTail(BlockError),
    /// A block could not be read and the walk stopped there.
    Unreadable(BlockError),
    /// A klog entry could not be decoded; the rest of its block was skipped.
    MalformedEntry {
        block_index: u64,
        file_offset: u64,
        error: EntryError,
    },
    CorruptedWalEntry(WalFault),
    /// A block failed checksum verification; its contents were still used.
    ChecksumMismatch { offset: u64 },
    LimitReached { limit: usize, unread_bytes: u64 },
    /// Warnings dropped after [`MAX_WARNINGS`].
    Suppressed { count: usize },
}

impl Warning {
    /// The fault behind the warning, if it reports corruption.
    #[must_use]
    pub fn fault(&self) -> Option<FaultKind> {
        match self {
            Warning::ShortFile { .. } | Warning::TruncatedTail(_) => Some(FaultKind::Truncated),
            Warning::Unreadable(e) => Some(FaultKind::from(e)),
            Warning::MalformedEntry { error, .. } => Some(FaultKind::from(error)),
            Warning::CorruptedWalEntry(fault) => Some(FaultKind::from(&fault.kind)),
            Warning::ChecksumMismatch { .. } => Some(FaultKind::ChecksumMismatch),
            Warning::LargeFile { .. } | Warning::LimitReached { .. } | Warning::Suppressed { .. } => {
                None
            }
        }
    }
}

impl From<EntryFault> for Warning {
    fn from(fault: EntryFault) -> Self {
        Warning::MalformedEntry {
            block_index: fault.block_index,
            file_offset: fault.file_offset(),
            error: fault.error,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::ShortFile { len } => {
                write!(f, "file is only {len} bytes, too short for a file header")
            }
            Warning::LargeFile { size, threshold } => write!(
                f,
                "large file ({} MB, threshold {} MB)",
                size / (1024 * 1024),
                threshold / (1024 * 1024)
            ),
            Warning::TruncatedTail(e) => write!(f, "partial block at end of file: {e}"),
            Warning::Unreadable(e) => write!(f, "stopped at unreadable block: {e}"),
            Warning::MalformedEntry {
                block_index,
                file_offset,
                error,
            } => write!(
                f,
                "block {block_index}: {error} (file offset {file_offset}), rest of block skipped"
            ),
            Warning::CorruptedWalEntry(fault) => write!(f, "{fault}"),
            Warning::ChecksumMismatch { offset } => {
                write!(f, "block at offset {offset} failed checksum verification")
            }
            Warning::LimitReached {
                limit,
                unread_bytes,
            } => write!(f, "stopped at limit of {limit} entries, {unread_bytes} bytes not read"),
            Warning::Suppressed { count } => write!(f, "{count} further warnings suppressed"),
        }
    }
}

/// Bounded warning collector.
#[derive(Debug, Default)]
pub(crate) struct WarningLog {
    kept: Vec<Warning>,
    dropped: usize,
}

impl WarningLog {
    pub(crate) fn push(&mut self, warning: Warning) {
        if self.kept.len() < MAX_WARNINGS {
            self.kept.push(warning);
        } else {
            self.dropped += 1;
        }
    }

    pub(crate) fn finish<T>(mut self, value: T) -> Inspected<T> {
        if self.dropped > 0 {
            self.kept.push(Warning::Suppressed {
                count: self.dropped,
            });
        }
        Inspected {
            value,
            warnings: self.kept,
        }
    }
}

/// How an inspection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// A result was produced but something was skipped; see the warnings.
    Partial,
}

/// A driver result together with everything it had to skip.
#[derive(Debug)]
pub struct Inspected<T> {
    pub value: T,
    pub warnings: Vec<Warning>,
}

impl<T> Inspected<T> {
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        if self.warnings.is_empty() {
            Outcome::Success
        } else {
            Outcome::Partial
        }
    }

    /// Returns `true` if any warning reports corruption rather than a limit
    /// or size notice.
    #[must_use]
    pub fn has_faults(&self) -> bool {
        self.warnings.iter().any(|w| w.fault().is_some())
    }
}
