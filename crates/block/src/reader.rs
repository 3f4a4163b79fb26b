use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use tracing::debug;

use crate::checksum::checksum;
use crate::error::BlockError;
use crate::format::{
    BlockFooter, BlockHeader, BLOCK_FOOTER_BYTES, BLOCK_HEADER_BYTES, FILE_HEADER_BYTES,
    MAX_BLOCK_SIZE,
};

/// One block read from disk: its location, header and payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Byte offset of the block header.
    pub offset: u64,
    pub header: BlockHeader,
    pub payload: Vec<u8>,
}

impl Block {
    /// Payload length in bytes.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.header.size
    }

    #[must_use]
    pub fn stored_checksum(&self) -> u32 {
        self.header.checksum
    }

    #[must_use]
    pub fn computed_checksum(&self) -> u32 {
        checksum(&self.payload)
    }

    /// Returns `true` if the payload matches the stored checksum.
    #[must_use]
    pub fn verify(&self) -> bool {
        self.computed_checksum() == self.header.checksum
    }

    /// Offset of the byte just past this block's footer.
    #[must_use]
    pub fn end_offset(&self) -> u64 {
        self.offset.saturating_add(self.header.span())
    }
}

/// Positioned reads over a block file.
///
/// The reader is generic over any `Read + Seek` implementor so that tests can
/// feed it an in-memory `Cursor<Vec<u8>>`. The file length is captured once at
/// construction; bytes appended afterwards by a concurrent writer are not
/// seen, and every length check is made against the captured value.
pub struct BlockReader<R = BufReader<File>> {
    inner: R,
    len: u64,
}

impl BlockReader<BufReader<File>> {
    /// Opens a block file for reading.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be opened or stat'ed.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            inner: BufReader::new(file),
            len,
        })
    }
}

impl<R: Read + Seek> BlockReader<R> {
    /// Wraps any seekable reader, measuring its length by seeking to the end.
    pub fn from_reader(mut inner: R) -> io::Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        Ok(Self { inner, len })
    }

    /// Length of the underlying file in bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reads the 8-byte header at `offset` without validating `size`.
    pub fn read_raw_header(&mut self, offset: u64) -> Result<BlockHeader, BlockError> {
        let available = self.len.saturating_sub(offset);
        if available < BLOCK_HEADER_BYTES {
            return Err(BlockError::TruncatedHeader { offset, available });
        }
        let mut buf = [0u8; 8];
        let got = self.read_at(offset, &mut buf)?;
        if got < buf.len() {
            return Err(BlockError::TruncatedHeader {
                offset,
                available: got as u64,
            });
        }
        Ok(BlockHeader::decode(&buf))
    }

    /// Reads and validates the block header at `offset`.
    ///
    /// # Errors
    ///
    /// - [`BlockError::TruncatedHeader`] if fewer than 8 bytes remain.
    /// - [`BlockError::Oversize`] if `size` is 0 or above [`MAX_BLOCK_SIZE`].
    pub fn read_header(&mut self, offset: u64) -> Result<BlockHeader, BlockError> {
        let header = self.read_raw_header(offset)?;
        if !header.has_valid_size() {
            return Err(BlockError::Oversize {
                offset,
                size: header.size,
            });
        }
        Ok(header)
    }

    /// Reads the block at `offset`: header, size validation, then exactly
    /// `size` payload bytes.
    ///
    /// The payload buffer is only allocated once the size has been validated
    /// and the file is known to hold that many bytes.
    pub fn read_block(&mut self, offset: u64) -> Result<Block, BlockError> {
        let header = self.read_header(offset)?;
        let payload_offset = offset + BLOCK_HEADER_BYTES;
        let available = self.len.saturating_sub(payload_offset);
        if available < u64::from(header.size) {
            return Err(BlockError::TruncatedPayload {
                offset,
                size: header.size,
                available,
            });
        }

        let mut payload = vec![0u8; header.size as usize];
        let got = self.read_at(payload_offset, &mut payload)?;
        if got < payload.len() {
            return Err(BlockError::TruncatedPayload {
                offset,
                size: header.size,
                available: got as u64,
            });
        }

        debug!(offset, size = header.size, "read block");
        Ok(Block {
            offset,
            header,
            payload,
        })
    }

    /// Returns the offset of the block whose footer ends at `end`, or `None`
    /// when `end` is the start of the first block.
    ///
    /// The footer's `footer_size` locates the header, and the header found
    /// there must agree with it.
    pub fn prev_block_offset(&mut self, end: u64) -> Result<Option<u64>, BlockError> {
        let end = end.min(self.len);
        if end < FILE_HEADER_BYTES + BLOCK_HEADER_BYTES + BLOCK_FOOTER_BYTES {
            return Ok(None);
        }

        let footer_offset = end - BLOCK_FOOTER_BYTES;
        let mut buf = [0u8; 8];
        let got = self.read_at(footer_offset, &mut buf)?;
        if got < buf.len() {
            return Err(BlockError::TruncatedHeader {
                offset: footer_offset,
                available: got as u64,
            });
        }
        let footer = BlockFooter::decode(&buf);

        let span = BLOCK_HEADER_BYTES + u64::from(footer.size) + BLOCK_FOOTER_BYTES;
        if footer.size > MAX_BLOCK_SIZE || end - FILE_HEADER_BYTES < span {
            return Err(BlockError::Oversize {
                offset: footer_offset,
                size: footer.size,
            });
        }

        let start = end - span;
        let header = self.read_raw_header(start)?;
        if header.size != footer.size {
            return Err(BlockError::FooterMismatch {
                offset: start,
                end,
                footer_size: footer.size,
                header_size: header.size,
            });
        }
        Ok(Some(start))
    }

    /// Offset of the last block in the file, found through the trailing footer.
    pub fn last_block_offset(&mut self) -> Result<Option<u64>, BlockError> {
        let len = self.len;
        self.prev_block_offset(len)
    }

    /// Counts blocks by walking headers forward (payloads are not read).
    ///
    /// Stops at the first header that cannot be validated and returns the
    /// count so far alongside the error that stopped it.
    pub fn count_blocks(&mut self) -> (u64, Option<BlockError>) {
        let mut cursor = BlockCursor::new();
        let mut count = 0;
        while let Some(step) = cursor.next_header(self) {
            match step {
                Ok(_) => count += 1,
                Err(e) => return (count, Some(e)),
            }
        }
        (count, None)
    }

    /// Sequential iterator over the blocks of the file, starting at offset 8.
    pub fn blocks(&mut self) -> Blocks<'_, R> {
        Blocks {
            reader: self,
            cursor: BlockCursor::new(),
        }
    }

    /// Reads into `buf` at `offset` until it is full or EOF, returning the
    /// number of bytes read.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, BlockError> {
        let io_err = |source| BlockError::Io { offset, source };
        self.inner.seek(SeekFrom::Start(offset)).map_err(io_err)?;

        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(io_err(e)),
            }
        }
        Ok(filled)
    }
}

/// Forward traversal state over a block file.
///
/// The cursor is plain data (offset + ordinal) so that owners of a
/// [`BlockReader`] can drive it without borrowing the reader for the whole
/// traversal. It advances by `8 + size + 8` per block and stops cleanly once
/// the next offset reaches end-of-file. The first error is returned once and
/// ends the traversal: after a bad header there is no way to know where the
/// next block starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockCursor {
    offset: u64,
    index: u64,
    done: bool,
}

impl Default for BlockCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockCursor {
    /// Cursor positioned at the first block (just past the file header).
    #[must_use]
    pub fn new() -> Self {
        Self {
            offset: FILE_HEADER_BYTES,
            index: 0,
            done: false,
        }
    }

    /// Offset of the next block to read.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Ordinal of the next block to read.
    #[must_use]
    pub fn index(&self) -> u64 {
        self.index
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Reads the next block, returning `(index, block)`.
    pub fn next_block<R: Read + Seek>(
        &mut self,
        reader: &mut BlockReader<R>,
    ) -> Option<Result<(u64, Block), BlockError>> {
        if self.done || self.offset >= reader.len() {
            self.done = true;
            return None;
        }
        match reader.read_block(self.offset) {
            Ok(block) => {
                let index = self.index;
                self.index += 1;
                self.offset = block.end_offset();
                Some(Ok((index, block)))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }

    /// Steps over the next block without reading its payload, returning
    /// `(index, offset, header)`.
    ///
    /// The payload is still required to fit inside the file.
    pub fn next_header<R: Read + Seek>(
        &mut self,
        reader: &mut BlockReader<R>,
    ) -> Option<Result<(u64, u64, BlockHeader), BlockError>> {
        if self.done || self.offset >= reader.len() {
            self.done = true;
            return None;
        }
        let offset = self.offset;
        let header = match reader.read_header(offset) {
            Ok(h) => h,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };
        let available = reader.len().saturating_sub(offset + BLOCK_HEADER_BYTES);
        if available < u64::from(header.size) {
            self.done = true;
            return Some(Err(BlockError::TruncatedPayload {
                offset,
                size: header.size,
                available,
            }));
        }
        let index = self.index;
        self.index += 1;
        self.offset = offset.saturating_add(header.span());
        Some(Ok((index, offset, header)))
    }
}

/// Iterator returned by [`BlockReader::blocks`].
pub struct Blocks<'a, R> {
    reader: &'a mut BlockReader<R>,
    cursor: BlockCursor,
}

impl<R: Read + Seek> Iterator for Blocks<'_, R> {
    type Item = Result<(u64, Block), BlockError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.cursor.next_block(self.reader)
    }
}
