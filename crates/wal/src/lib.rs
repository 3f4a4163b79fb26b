//! # WAL - write-ahead log inspection
//!
//! Decodes the write-ahead log files written by the storage engine. A WAL is
//! an ordinary block file in which every block holds exactly one entry, using
//! the same grammar as a klog entry:
//!
//! ```text
//! [file header: 8 bytes]
//! [size: u32 LE][checksum: u32 LE][ flags | key_len | value_len | seq | ... ][footer: 8 bytes]
//! [size: u32 LE][checksum: u32 LE][ flags | key_len | value_len | seq | ... ][footer: 8 bytes]
//! ...
//! ```
//!
//! There is no sequence carry between blocks: each entry is decoded against
//! a delta base of 0.
//!
//! A writer may still be appending while the log is inspected, so a partial
//! block at end-of-file is reported as [`WalEvent::TruncatedTail`] rather
//! than as corruption. A block that fails its checksum or whose entry cannot
//! be decoded is [`WalEvent::Corrupted`] and the walk continues with the next
//! block.
//!
//! ## Example
//!
//! ```rust,no_run
//! use wal::{WalEvent, WalReader};
//!
//! let reader = WalReader::open("000042.log").unwrap();
//! for event in reader.events(100) {
//!     if let WalEvent::Entry(e) = event {
//!         println!("seq={} key={:?}", e.entry.seq, e.entry.key);
//!     }
//! }
//! ```

use std::fs::File;
use std::io::{self, BufReader, Read, Seek};
use std::path::Path;

use block::{BlockCursor, BlockError, BlockReader};
use sstable::{decode_entry, Entry, EntryError};
use thiserror::Error;
use tracing::{debug, info, warn};

/// One decoded WAL record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalEntry {
    /// Ordinal of the block holding the entry.
    pub index: u64,
    /// Offset of the block header.
    pub offset: u64,
    pub entry: Entry,
    /// Payload bytes left over after the entry.
    pub trailing_bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalFaultKind {
    #[error("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    #[error(transparent)]
    Malformed(EntryError),
}

/// A block whose entry cannot be trusted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("wal block {index} at offset {offset}: {kind}")]
pub struct WalFault {
    pub index: u64,
    pub offset: u64,
    pub kind: WalFaultKind,
}

/// One step of a WAL traversal.
#[derive(Debug)]
pub enum WalEvent {
    Entry(WalEntry),
    /// The block was read but its entry is corrupt. The walk continues.
    Corrupted(WalFault),
    /// The file ends inside a block: a write in progress. Terminal.
    TruncatedTail(BlockError),
    /// A block header is invalid or the file could not be read. Terminal.
    Unreadable(BlockError),
    /// The entry limit stopped the walk before end-of-file. Terminal.
    LimitReached { limit: usize, unread_bytes: u64 },
}

/// Read-only handle on a WAL file.
pub struct WalReader<R = BufReader<File>> {
    blocks: BlockReader<R>,
}

impl WalReader<BufReader<File>> {
    /// Opens an existing WAL file.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Ok(Self {
            blocks: BlockReader::open(path)?,
        })
    }
}

impl<R: Read + Seek> WalReader<R> {
    /// Constructs a reader from any seekable source, e.g. `Cursor<Vec<u8>>`.
    pub fn from_reader(reader: R) -> io::Result<Self> {
        Ok(Self {
            blocks: BlockReader::from_reader(reader)?,
        })
    }

    #[must_use]
    pub fn file_len(&self) -> u64 {
        self.blocks.len()
    }

    /// Lazy traversal yielding at most `limit` entries.
    pub fn events(self, limit: usize) -> WalEvents<R> {
        WalEvents {
            reader: self.blocks,
            cursor: BlockCursor::new(),
            limit,
            emitted: 0,
            finished: false,
        }
    }

    /// Replays every readable entry, calling `apply` for each one.
    ///
    /// Corrupted blocks are skipped. Returns the number of entries applied
    /// and the error that ended the walk early, if any. A truncated tail is
    /// not an error.
    pub fn replay<F>(self, mut apply: F) -> (usize, Option<BlockError>)
    where
        F: FnMut(WalEntry),
    {
        let mut applied = 0;
        for event in self.events(usize::MAX) {
            match event {
                WalEvent::Entry(e) => {
                    applied += 1;
                    apply(e);
                }
                WalEvent::Unreadable(e) => return (applied, Some(e)),
                WalEvent::Corrupted(_)
                | WalEvent::TruncatedTail(_)
                | WalEvent::LimitReached { .. } => {}
            }
        }
        (applied, None)
    }

    /// Walks every block and tallies valid and corrupted entries.
    pub fn verify(self) -> WalVerifyReport {
        self.verify_with(|_| {})
    }

    /// [`WalReader::verify`], handing each corrupted block to `visit` as it
    /// is found. Only counters are kept in the report.
    pub fn verify_with<F>(self, mut visit: F) -> WalVerifyReport
    where
        F: FnMut(&WalFault),
    {
        let mut report = WalVerifyReport {
            file_size: self.file_len(),
            ..WalVerifyReport::default()
        };

        for event in self.events(usize::MAX) {
            match event {
                WalEvent::Entry(e) => {
                    let seq = e.entry.seq;
                    report.valid += 1;
                    report.min_seq = Some(report.min_seq.map_or(seq, |m| m.min(seq)));
                    report.max_seq = Some(report.max_seq.map_or(seq, |m| m.max(seq)));
                    report.last_valid_offset = Some(e.offset);
                }
                WalEvent::Corrupted(fault) => {
                    report.corrupted += 1;
                    visit(&fault);
                }
                WalEvent::TruncatedTail(e) => report.truncated_tail = Some(e),
                WalEvent::Unreadable(e) => {
                    report.corrupted += 1;
                    report.stopped_by = Some(e);
                }
                WalEvent::LimitReached { .. } => {}
            }
        }

        info!(
            valid = report.valid,
            corrupted = report.corrupted,
            truncated_tail = report.truncated_tail.is_some(),
            "wal verification finished"
        );
        report
    }
}

/// Verifies the WAL at `path`.
///
/// # Errors
///
/// Returns the I/O error if the file cannot be opened.
pub fn verify<P: AsRef<Path>>(path: P) -> io::Result<WalVerifyReport> {
    Ok(WalReader::open(path)?.verify())
}

/// Result of [`WalReader::verify`].
#[derive(Debug, Default)]
pub struct WalVerifyReport {
    pub file_size: u64,
    pub valid: u64,
    /// Corrupted blocks, plus one if an unreadable block stopped the walk.
    pub corrupted: u64,
    pub min_seq: Option<u64>,
    pub max_seq: Option<u64>,
    /// Offset of the last block holding a valid entry; replay can recover
    /// up to here.
    pub last_valid_offset: Option<u64>,
    /// A partial block at end-of-file. Not counted as corruption.
    pub truncated_tail: Option<BlockError>,
    pub stopped_by: Option<BlockError>,
}

impl WalVerifyReport {
    /// Returns `true` if no corruption was found.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.corrupted == 0
    }
}

/// Iterator returned by [`WalReader::events`].
pub struct WalEvents<R = BufReader<File>> {
    reader: BlockReader<R>,
    cursor: BlockCursor,
    limit: usize,
    emitted: usize,
    finished: bool,
}

impl<R: Read + Seek> Iterator for WalEvents<R> {
    type Item = WalEvent;

    fn next(&mut self) -> Option<WalEvent> {
        if self.finished {
            return None;
        }

        if self.emitted >= self.limit {
            self.finished = true;
            let unread_bytes = self.reader.len().saturating_sub(self.cursor.offset());
            if unread_bytes > 0 && !self.cursor.is_done() {
                return Some(WalEvent::LimitReached {
                    limit: self.limit,
                    unread_bytes,
                });
            }
            return None;
        }

        let (index, block) = match self.cursor.next_block(&mut self.reader) {
            None => {
                self.finished = true;
                return None;
            }
            Some(Err(e)) => {
                self.finished = true;
                if e.is_truncation() {
                    debug!(offset = e.offset(), "wal ends inside a block");
                    return Some(WalEvent::TruncatedTail(e));
                }
                warn!(error = %e, "wal block unreadable");
                return Some(WalEvent::Unreadable(e));
            }
            Some(Ok(step)) => step,
        };

        let computed = block.computed_checksum();
        if computed != block.stored_checksum() {
            warn!(index, offset = block.offset, "wal block checksum mismatch");
            return Some(WalEvent::Corrupted(WalFault {
                index,
                offset: block.offset,
                kind: WalFaultKind::ChecksumMismatch {
                    stored: block.stored_checksum(),
                    computed,
                },
            }));
        }

        match decode_entry(&block.payload, 0) {
            Ok((entry, used)) => {
                self.emitted += 1;
                Some(WalEvent::Entry(WalEntry {
                    index,
                    offset: block.offset,
                    entry,
                    trailing_bytes: block.payload.len() - used,
                }))
            }
            Err(error) => {
                warn!(index, offset = block.offset, %error, "wal entry malformed");
                Some(WalEvent::Corrupted(WalFault {
                    index,
                    offset: block.offset,
                    kind: WalFaultKind::Malformed(error),
                }))
            }
        }
    }
}
