//! Delta-encoded sequence numbers.
//!
//! Within a klog block an entry may store its sequence number as an offset
//! from the previous entry's resolved sequence. The base starts at 0 for
//! every block and is never carried across a block boundary.

use crate::entry::{decode_entry, Entry, EntryError, EntryFlags};

/// Resolves a raw sequence field against the previous resolved sequence.
///
/// Returns `None` if applying a delta overflows.
#[must_use]
pub fn resolve(prev: u64, flags: EntryFlags, raw: u64) -> Option<u64> {
    if flags.is_delta_seq() {
        prev.checked_add(raw)
    } else {
        Some(raw)
    }
}

/// Running "previous sequence" for one block traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceAccumulator {
    prev: u64,
}

impl SequenceAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolved sequence of the last entry decoded (0 at block start).
    #[must_use]
    pub fn prev(&self) -> u64 {
        self.prev
    }

    /// Starts a new block.
    pub fn reset(&mut self) {
        self.prev = 0;
    }

    /// Decodes the next entry of the block and records its sequence.
    ///
    /// On failure the accumulator is left unchanged.
    pub fn decode_next(&mut self, payload: &[u8]) -> Result<(Entry, usize), EntryError> {
        let (entry, used) = decode_entry(payload, self.prev)?;
        self.prev = entry.seq;
        Ok((entry, used))
    }
}
