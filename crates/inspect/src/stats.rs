//! Single-pass entry statistics over a klog file.

use std::path::Path;

use sstable::{Entry, KlogEvent};
use tracing::info;

use crate::error::InspectError;
use crate::outcome::Inspected;
use crate::traverse::walk_klog;

/// Running min/max/sum of a length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SizeRange {
    min: Option<u64>,
    pub max: u64,
    pub sum: u64,
}

impl SizeRange {
    pub fn record(&mut self, len: u64) {
        self.min = Some(self.min.map_or(len, |m| m.min(len)));
        self.max = self.max.max(len);
        self.sum = self.sum.saturating_add(len);
    }

    /// Smallest length recorded, or 0 if none was.
    #[must_use]
    pub fn min(&self) -> u64 {
        self.min.unwrap_or(0)
    }

    /// Mean over `count` samples; 0 when `count` is 0.
    #[must_use]
    pub fn avg(&self, count: u64) -> f64 {
        if count == 0 {
            0.0
        } else {
            self.sum as f64 / count as f64
        }
    }
}

/// Aggregate counters over the entries of one klog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryStats {
    pub entries: u64,
    pub tombstones: u64,
    pub ttl_entries: u64,
    pub vlog_entries: u64,
    min_seq: Option<u64>,
    pub max_seq: u64,
    pub key_len: SizeRange,
    pub value_len: SizeRange,
    pub blocks: u64,
    pub corrupt_blocks: u64,
    pub decode_failures: u64,
}

impl EntryStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one traversal event into the counters.
    pub fn observe(&mut self, event: &KlogEvent) {
        match event {
            KlogEvent::Block(info) => {
                self.blocks += 1;
                if !info.checksum_ok {
                    self.corrupt_blocks += 1;
                }
            }
            KlogEvent::Entry(e) => self.record(&e.entry),
            KlogEvent::Malformed(_) => self.decode_failures += 1,
            KlogEvent::Unreadable(_) | KlogEvent::LimitReached { .. } => {}
        }
    }

    pub fn record(&mut self, entry: &Entry) {
        self.entries += 1;
        if entry.is_tombstone() {
            self.tombstones += 1;
        }
        if entry.ttl.is_some() {
            self.ttl_entries += 1;
        }
        if entry.vlog_offset().is_some() {
            self.vlog_entries += 1;
        }
        self.min_seq = Some(self.min_seq.map_or(entry.seq, |m| m.min(entry.seq)));
        self.max_seq = self.max_seq.max(entry.seq);
        self.key_len.record(entry.key.len() as u64);
        self.value_len.record(entry.value_len);
    }

    /// Lowest sequence seen, or 0 with no entries.
    #[must_use]
    pub fn min_seq(&self) -> u64 {
        self.min_seq.unwrap_or(0)
    }

    #[must_use]
    pub fn avg_key_len(&self) -> f64 {
        self.key_len.avg(self.entries)
    }

    #[must_use]
    pub fn avg_value_len(&self) -> f64 {
        self.value_len.avg(self.entries)
    }

    /// Share of tombstones in percent; 0 with no entries.
    #[must_use]
    pub fn tombstone_pct(&self) -> f64 {
        if self.entries == 0 {
            0.0
        } else {
            self.tombstones as f64 * 100.0 / self.entries as f64
        }
    }
}

/// Result of [`sstable_stats`].
#[derive(Debug, Clone, PartialEq)]
pub struct SstableStats {
    pub file_size: u64,
    pub stats: EntryStats,
}

/// Walks every entry of the klog at `path` and aggregates statistics.
///
/// # Errors
///
/// Fails only if the file cannot be opened or its first block is unusable.
pub fn sstable_stats<P: AsRef<Path>>(path: P) -> Result<Inspected<SstableStats>, InspectError> {
    let path = path.as_ref();
    let file_size = std::fs::metadata(path)
        .map(|m| m.len())
        .map_err(|source| InspectError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    let mut stats = EntryStats::new();
    let log = walk_klog(path, usize::MAX, None, |event| stats.observe(&event))?;

    info!(
        entries = stats.entries,
        blocks = stats.blocks,
        decode_failures = stats.decode_failures,
        "klog statistics collected"
    );
    Ok(log.finish(SstableStats { file_size, stats }))
}
