//! Entry dumps for klog and WAL files.
//!
//! Both drivers stream entries to a caller-supplied closure in file order and
//! hold no more than the block being decoded.

use std::path::{Path, PathBuf};

use block::FILE_HEADER_BYTES;
use config::InspectConfig;
use sstable::{Entry, KlogEvent, VlogError};
use tracing::info;
use wal::{WalEntry, WalEvent, WalReader};

use crate::error::InspectError;
use crate::outcome::{Inspected, Warning, WarningLog};
use crate::traverse::walk_klog;

/// How a klog dump is run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpOptions {
    /// Entries to emit before stopping.
    pub limit: usize,
    /// Fetch externalized values from [`DumpOptions::vlog`].
    pub resolve_vlog: bool,
    pub vlog: Option<PathBuf>,
    /// Files above this size get a [`Warning::LargeFile`].
    pub large_file_bytes: Option<u64>,
}

impl DumpOptions {
    /// Plain dump with the configured limit and large-file threshold.
    #[must_use]
    pub fn from_config(config: &InspectConfig) -> Self {
        Self {
            limit: config.dump_limit,
            resolve_vlog: false,
            vlog: None,
            large_file_bytes: Some(config.large_file_bytes),
        }
    }

    /// Enables value-log resolution against `vlog` (which may be absent).
    #[must_use]
    pub fn with_vlog(mut self, vlog: Option<PathBuf>) -> Self {
        self.resolve_vlog = true;
        self.vlog = vlog;
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// One entry as handed to the dump visitor.
#[derive(Debug)]
pub struct DumpedEntry {
    /// 1-based position in the dump.
    pub ordinal: usize,
    pub block_index: u64,
    pub block_checksum_ok: bool,
    pub entry: Entry,
    /// Outcome of the value-log lookup, for externalized values when
    /// resolution is enabled.
    pub vlog: Option<Result<Vec<u8>, VlogError>>,
}

impl DumpedEntry {
    /// The value bytes, whether inline or fetched from the value log.
    #[must_use]
    pub fn value(&self) -> Option<&[u8]> {
        match &self.vlog {
            Some(Ok(bytes)) => Some(bytes),
            Some(Err(_)) => None,
            None => self.entry.inline_value(),
        }
    }
}

/// Counters returned by [`dump_sstable`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DumpSummary {
    pub entries: usize,
    pub blocks: u64,
    /// Blocks whose payload failed checksum verification.
    pub checksum_errors: u64,
    pub malformed: u64,
    pub vlog_failures: u64,
}

/// Streams the entries of the klog at `path` to `visit`.
///
/// Entries from a block with a bad checksum are still decoded and flagged
/// through [`DumpedEntry::block_checksum_ok`].
///
/// # Errors
///
/// Fails only if the file cannot be opened or its first block is unusable.
pub fn dump_sstable<P, F>(
    path: P,
    options: &DumpOptions,
    mut visit: F,
) -> Result<Inspected<DumpSummary>, InspectError>
where
    P: AsRef<Path>,
    F: FnMut(DumpedEntry),
{
    let path = path.as_ref();
    let mut summary = DumpSummary::default();
    let mut block_checksum_ok = true;

    let log = walk_klog(path, options.limit, options.large_file_bytes, |event| {
        match event {
            KlogEvent::Block(info) => {
                summary.blocks += 1;
                block_checksum_ok = info.checksum_ok;
                if !info.checksum_ok {
                    summary.checksum_errors += 1;
                }
            }
            KlogEvent::Entry(e) => {
                summary.entries += 1;
                let vlog = match e.entry.vlog_offset() {
                    Some(offset) if options.resolve_vlog => Some(sstable::resolve(
                        options.vlog.as_deref(),
                        offset,
                        e.entry.value_len,
                    )),
                    _ => None,
                };
                if matches!(vlog, Some(Err(_))) {
                    summary.vlog_failures += 1;
                }
                visit(DumpedEntry {
                    ordinal: summary.entries,
                    block_index: e.block_index,
                    block_checksum_ok,
                    entry: e.entry,
                    vlog,
                });
            }
            KlogEvent::Malformed(_) => summary.malformed += 1,
            KlogEvent::Unreadable(_) | KlogEvent::LimitReached { .. } => {}
        }
    })?;

    info!(
        path = %path.display(),
        entries = summary.entries,
        blocks = summary.blocks,
        checksum_errors = summary.checksum_errors,
        "klog dump finished"
    );
    Ok(log.finish(summary))
}

/// Counters returned by [`dump_wal`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalDumpSummary {
    pub file_size: u64,
    pub entries: usize,
    pub corrupted: u64,
}

/// Streams the entries of the WAL at `path` to `visit`.
///
/// A corrupted block is reported as a warning and skipped. A partial block
/// at the end of the log is a write in progress and ends the dump with a
/// [`Warning::TruncatedTail`].
///
/// # Errors
///
/// Fails only if the file cannot be opened or its first block is unusable.
pub fn dump_wal<P, F>(
    path: P,
    limit: usize,
    large_file_bytes: Option<u64>,
    mut visit: F,
) -> Result<Inspected<WalDumpSummary>, InspectError>
where
    P: AsRef<Path>,
    F: FnMut(WalEntry),
{
    let path = path.as_ref();
    let reader = WalReader::open(path).map_err(|source| InspectError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut log = WarningLog::default();
    let mut summary = WalDumpSummary {
        file_size: reader.file_len(),
        ..WalDumpSummary::default()
    };
    if summary.file_size < FILE_HEADER_BYTES {
        log.push(Warning::ShortFile {
            len: summary.file_size,
        });
        return Ok(log.finish(summary));
    }
    if let Some(threshold) = large_file_bytes.filter(|&t| summary.file_size > t) {
        log.push(Warning::LargeFile {
            size: summary.file_size,
            threshold,
        });
    }

    for event in reader.events(limit) {
        match event {
            WalEvent::Entry(e) => {
                summary.entries += 1;
                visit(e);
            }
            WalEvent::Corrupted(fault) => {
                summary.corrupted += 1;
                log.push(Warning::CorruptedWalEntry(fault));
            }
            WalEvent::TruncatedTail(e) => log.push(Warning::TruncatedTail(e)),
            WalEvent::Unreadable(e) if summary.entries == 0 && summary.corrupted == 0 => {
                return Err(InspectError::FirstBlock {
                    path: path.to_path_buf(),
                    source: e,
                });
            }
            WalEvent::Unreadable(e) => log.push(Warning::Unreadable(e)),
            WalEvent::LimitReached {
                limit,
                unread_bytes,
            } => log.push(Warning::LimitReached {
                limit,
                unread_bytes,
            }),
        }
    }

    info!(
        path = %path.display(),
        entries = summary.entries,
        corrupted = summary.corrupted,
        "wal dump finished"
    );
    Ok(log.finish(summary))
}
