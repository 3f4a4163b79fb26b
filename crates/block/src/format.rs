//! Block framing constants and header/footer codecs.
//!
//! ## Block header (8 bytes)
//!
//! ```text
//! [size: u32 LE][checksum: u32 LE]
//! ```
//!
//! ## Block footer (8 bytes)
//!
//! ```text
//! [footer_size: u32 LE][magic: u32 LE]
//! ```

use byteorder::{ByteOrder, LittleEndian};

/// Bytes skipped at the start of every block file before the first block.
pub const FILE_HEADER_BYTES: u64 = 8;

/// Size of a block header: 4 (`size`) + 4 (`checksum`).
pub const BLOCK_HEADER_BYTES: u64 = 4 + 4;

/// Size of a block footer: 4 (`footer_size`) + 4 (`magic`).
pub const BLOCK_FOOTER_BYTES: u64 = 4 + 4;

/// Largest payload size accepted before allocating (100 MiB).
pub const MAX_BLOCK_SIZE: u32 = 100 * 1024 * 1024;

/// Footer magic written by [`BlockImage`](crate::BlockImage).
///
/// The reader reports the magic it finds but does not reject blocks on it.
pub const BLOCK_FOOTER_MAGIC: u32 = 0x424c_4b46;

/// Parsed block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// Payload length in bytes.
    pub size: u32,
    /// Stored xxHash32 of the payload.
    pub checksum: u32,
}

impl BlockHeader {
    /// Decodes a header from its 8-byte on-disk form.
    #[must_use]
    pub fn decode(buf: &[u8; 8]) -> Self {
        Self {
            size: LittleEndian::read_u32(&buf[0..4]),
            checksum: LittleEndian::read_u32(&buf[4..8]),
        }
    }

    /// Encodes the header into its 8-byte on-disk form.
    #[must_use]
    pub fn encode(&self) -> [u8; 8] {
        let mut buf = [0u8; 8];
        LittleEndian::write_u32(&mut buf[0..4], self.size);
        LittleEndian::write_u32(&mut buf[4..8], self.checksum);
        buf
    }

    /// Returns `true` if `0 < size <= MAX_BLOCK_SIZE`.
    #[must_use]
    pub fn has_valid_size(&self) -> bool {
        self.size > 0 && self.size <= MAX_BLOCK_SIZE
    }

    /// Total on-disk bytes occupied by the block: header + payload + footer.
    #[must_use]
    pub fn span(&self) -> u64 {
        BLOCK_HEADER_BYTES + u64::from(self.size) + BLOCK_FOOTER_BYTES
    }
}

/// Parsed block footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockFooter {
    /// Copy of the payload length from the header.
    pub size: u32,
    pub magic: u32,
}

impl BlockFooter {
    #[must_use]
    pub fn decode(buf: &[u8; 8]) -> Self {
        Self {
            size: LittleEndian::read_u32(&buf[0..4]),
            magic: LittleEndian::read_u32(&buf[4..8]),
        }
    }

    #[must_use]
    pub fn encode(&self) -> [u8; 8] {
        let mut buf = [0u8; 8];
        LittleEndian::write_u32(&mut buf[0..4], self.size);
        LittleEndian::write_u32(&mut buf[4..8], self.magic);
        buf
    }
}
