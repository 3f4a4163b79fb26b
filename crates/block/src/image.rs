//! In-memory block file images.
//!
//! [`BlockImage`] lays out a file header followed by framed blocks exactly as
//! the storage engine does. Tests and benches use it to produce fixture files,
//! including deliberately corrupted ones via [`BlockImage::push_raw`].

use std::io;
use std::path::Path;

use crate::checksum::checksum;
use crate::format::{BlockFooter, BlockHeader, BLOCK_FOOTER_MAGIC, FILE_HEADER_BYTES};

/// Builder for a block file held in memory.
#[derive(Debug, Clone)]
pub struct BlockImage {
    bytes: Vec<u8>,
}

impl Default for BlockImage {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockImage {
    /// Starts an image containing only the (zeroed) file header.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bytes: vec![0u8; FILE_HEADER_BYTES as usize],
        }
    }

    /// Appends a well-formed block and returns its offset.
    ///
    /// # Panics
    ///
    /// Panics if `payload` is longer than `u32::MAX` bytes.
    pub fn push(&mut self, payload: &[u8]) -> u64 {
        let size = u32::try_from(payload.len()).expect("payload larger than u32::MAX");
        self.push_raw(size, checksum(payload), payload)
    }

    /// Appends a block with caller-chosen header fields.
    ///
    /// `size` is written to both the header and the footer, whatever the
    /// actual payload length is.
    pub fn push_raw(&mut self, size: u32, stored_checksum: u32, payload: &[u8]) -> u64 {
        let offset = self.offset();
        let header = BlockHeader {
            size,
            checksum: stored_checksum,
        };
        let footer = BlockFooter {
            size,
            magic: BLOCK_FOOTER_MAGIC,
        };
        self.bytes.extend_from_slice(&header.encode());
        self.bytes.extend_from_slice(payload);
        self.bytes.extend_from_slice(&footer.encode());
        offset
    }

    /// Appends arbitrary bytes (e.g. a partial block at the tail).
    pub fn push_bytes(&mut self, bytes: &[u8]) -> u64 {
        let offset = self.offset();
        self.bytes.extend_from_slice(bytes);
        offset
    }

    /// Offset at which the next block would start.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.bytes.len() as u64
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Mutable access for corrupting bytes in place.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Writes the image to `path`, replacing any existing file.
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        std::fs::write(path, &self.bytes)
    }
}
