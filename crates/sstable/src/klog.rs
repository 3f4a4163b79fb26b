use std::fs::File;
use std::io::{self, BufReader, Read, Seek};
use std::path::Path;

use block::{BlockCursor, BlockError, BlockReader, BLOCK_HEADER_BYTES};
use tracing::{debug, warn};

use crate::entry::{Entry, EntryError};
use crate::sequence::SequenceAccumulator;

/// A block opened during a klog traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    pub index: u64,
    pub offset: u64,
    pub size: u32,
    /// Whether the payload matched its stored checksum.
    pub checksum_ok: bool,
}

/// An entry together with where it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KlogEntry {
    pub block_index: u64,
    pub block_offset: u64,
    /// Offset of the entry within the block payload.
    pub entry_offset: usize,
    pub entry: Entry,
}

/// An entry that could not be decoded. The rest of its block is skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFault {
    pub block_index: u64,
    pub block_offset: u64,
    pub entry_offset: usize,
    pub error: EntryError,
}

impl EntryFault {
    /// Absolute file offset of the byte where decoding failed.
    #[must_use]
    pub fn file_offset(&self) -> u64 {
        self.block_offset + BLOCK_HEADER_BYTES + (self.entry_offset + self.error.offset) as u64
    }
}

/// One step of a klog traversal.
#[derive(Debug)]
pub enum KlogEvent {
    /// A block was read; its entries follow.
    Block(BlockInfo),
    Entry(KlogEntry),
    /// Entry decoding failed; traversal resumes at the next block.
    Malformed(EntryFault),
    /// The next block could not be read. Terminal.
    Unreadable(BlockError),
    /// The entry limit stopped the traversal before end-of-file. Terminal.
    LimitReached { limit: usize, unread_bytes: u64 },
}

/// Payload of the block currently being decoded.
struct OpenBlock {
    index: u64,
    offset: u64,
    payload: Vec<u8>,
    pos: usize,
    seq: SequenceAccumulator,
}

/// Lazy, bounded traversal of the entries in a klog file.
///
/// Blocks are read one at a time with a [`BlockCursor`]; only the current
/// block's payload is held. Each block gets a fresh [`SequenceAccumulator`],
/// so delta-encoded sequences never carry across a block boundary.
///
/// Iteration yields at most `limit` [`KlogEvent::Entry`] events. Blocks are
/// counted as they are opened, including a block in which the limit is hit.
pub struct KlogEvents<R = BufReader<File>> {
    reader: BlockReader<R>,
    cursor: BlockCursor,
    current: Option<OpenBlock>,
    limit: usize,
    emitted: usize,
    finished: bool,
}

impl KlogEvents<BufReader<File>> {
    /// Opens a klog file for traversal.
    pub fn open<P: AsRef<Path>>(path: P, limit: usize) -> io::Result<Self> {
        Ok(Self::new(BlockReader::open(path)?, limit))
    }
}

impl<R: Read + Seek> KlogEvents<R> {
    pub fn new(reader: BlockReader<R>, limit: usize) -> Self {
        Self {
            reader,
            cursor: BlockCursor::new(),
            current: None,
            limit,
            emitted: 0,
            finished: false,
        }
    }

    /// Length of the file being traversed.
    #[must_use]
    pub fn file_len(&self) -> u64 {
        self.reader.len()
    }

    /// Number of entries yielded so far.
    #[must_use]
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    fn unread_after_cursor(&self) -> u64 {
        self.reader.len().saturating_sub(self.cursor.offset())
    }

    fn open_next_block(&mut self) -> Option<KlogEvent> {
        match self.cursor.next_block(&mut self.reader)? {
            Ok((index, block)) => {
                let checksum_ok = block.verify();
                if !checksum_ok {
                    warn!(
                        index,
                        offset = block.offset,
                        stored = format_args!("{:#010x}", block.stored_checksum()),
                        computed = format_args!("{:#010x}", block.computed_checksum()),
                        "klog block checksum mismatch"
                    );
                }
                let info = BlockInfo {
                    index,
                    offset: block.offset,
                    size: block.size(),
                    checksum_ok,
                };
                self.current = Some(OpenBlock {
                    index,
                    offset: block.offset,
                    payload: block.payload,
                    pos: 0,
                    seq: SequenceAccumulator::new(),
                });
                Some(KlogEvent::Block(info))
            }
            Err(e) => {
                warn!(error = %e, "klog block unreadable");
                Some(KlogEvent::Unreadable(e))
            }
        }
    }
}

impl<R: Read + Seek> Iterator for KlogEvents<R> {
    type Item = KlogEvent;

    fn next(&mut self) -> Option<KlogEvent> {
        if self.finished {
            return None;
        }

        if let Some(block) = self.current.as_mut() {
            if block.pos < block.payload.len() {
                if self.emitted >= self.limit {
                    let in_block = (block.payload.len() - block.pos) as u64;
                    self.finished = true;
                    return Some(KlogEvent::LimitReached {
                        limit: self.limit,
                        unread_bytes: in_block + self.unread_after_cursor(),
                    });
                }

                let entry_offset = block.pos;
                match block.seq.decode_next(&block.payload[entry_offset..]) {
                    Ok((entry, used)) => {
                        block.pos += used;
                        self.emitted += 1;
                        return Some(KlogEvent::Entry(KlogEntry {
                            block_index: block.index,
                            block_offset: block.offset,
                            entry_offset,
                            entry,
                        }));
                    }
                    Err(error) => {
                        let fault = EntryFault {
                            block_index: block.index,
                            block_offset: block.offset,
                            entry_offset,
                            error,
                        };
                        debug!(
                            block = fault.block_index,
                            file_offset = fault.file_offset(),
                            "skipping rest of block after malformed entry"
                        );
                        self.current = None;
                        return Some(KlogEvent::Malformed(fault));
                    }
                }
            }
            self.current = None;
        }

        if self.emitted >= self.limit {
            self.finished = true;
            let unread_bytes = self.unread_after_cursor();
            if unread_bytes > 0 && !self.cursor.is_done() {
                return Some(KlogEvent::LimitReached {
                    limit: self.limit,
                    unread_bytes,
                });
            }
            return None;
        }

        match self.open_next_block() {
            Some(event) => {
                if matches!(event, KlogEvent::Unreadable(_)) {
                    self.finished = true;
                }
                Some(event)
            }
            None => {
                self.finished = true;
                None
            }
        }
    }
}
