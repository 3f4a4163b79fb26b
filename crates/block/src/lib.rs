//! # Block - raw block files
//!
//! Read-only access to the block-managed files written by the storage engine
//! (klog, vlog and WAL files all share this framing). Nothing in this crate
//! trusts the bytes it reads: every declared length is checked against the
//! file length before a buffer is allocated.
//!
//! ## File layout
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ FILE HEADER (8 bytes, not interpreted)                        │
//! ├───────────────────────────────────────────────────────────────┤
//! │ BLOCK                                                         │
//! │                                                               │
//! │ size (u32 LE) | checksum (u32 LE)                             │
//! │ payload (size bytes)                                          │
//! │ footer_size (u32 LE) | magic (u32 LE)                         │
//! │                                                               │
//! │ ... repeated for each block ...                               │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! The checksum is xxHash32 (seed 0) over the payload only. `footer_size`
//! repeats `size` so that the file can be walked backwards from its end.
//!
//! ## Traversal
//!
//! - [`BlockCursor`] walks forward from offset 8, advancing by
//!   `8 + size + 8` per block and stopping cleanly at end-of-file.
//! - [`BlockReader::read_block`] reads a block at any offset (value-log
//!   lookups).
//! - [`BlockReader::last_block_offset`] and
//!   [`BlockReader::prev_block_offset`] walk backwards via the footers.

pub mod checksum;
mod error;
mod format;
pub mod image;
mod reader;

pub use checksum::{checksum, verify};
pub use error::BlockError;
pub use format::{
    BlockFooter, BlockHeader, BLOCK_FOOTER_BYTES, BLOCK_FOOTER_MAGIC, BLOCK_HEADER_BYTES,
    FILE_HEADER_BYTES, MAX_BLOCK_SIZE,
};
pub use image::BlockImage;
pub use reader::{Block, BlockCursor, BlockReader, Blocks};

#[cfg(test)]
mod tests;
