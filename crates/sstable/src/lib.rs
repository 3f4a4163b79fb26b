//! # SSTable - klog entry decoding
//!
//! Decodes the key/value entries stored in the blocks of a klog file and
//! resolves externalized values from the companion vlog file.
//!
//! ## Entry layout
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ BLOCK PAYLOAD (entries back to back)                          │
//! │                                                               │
//! │ flags (u8)                                                    │
//! │ key_len (varint) | value_len (varint) | seq (varint)          │
//! │ [ttl (i64 LE)]            if flags & HAS_TTL                  │
//! │ [vlog_offset (varint)]    if flags & HAS_VLOG                 │
//! │ key | [value]             value only when not in the vlog     │
//! │                                                               │
//! │ ... repeated until the payload is exhausted ...               │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! | Bit    | Flag        | Meaning                                   |
//! |--------|-------------|-------------------------------------------|
//! | `0x01` | `TOMBSTONE` | the entry deletes its key                 |
//! | `0x02` | `HAS_TTL`   | an i64 expiry timestamp follows `seq`     |
//! | `0x04` | `HAS_VLOG`  | the value lives in the companion vlog     |
//! | `0x08` | `DELTA_SEQ` | `seq` is added to the previous entry's    |
//!
//! Delta sequences resolve against the previous entry *in the same block*;
//! each block starts from 0.
//!
//! ## Failure handling
//!
//! A malformed entry never takes down the traversal. [`KlogEvents`] reports
//! it as [`KlogEvent::Malformed`] and moves to the next block boundary; it
//! never scans byte by byte inside a damaged block.

pub mod entry;
pub mod klog;
pub mod sequence;
pub mod varint;
pub mod vlog;

pub use entry::{
    decode_entry, encode_payload, Entry, EntryError, EntryErrorKind, EntryFlags, EntryValue,
    Field, RawEntry,
};
pub use klog::{BlockInfo, EntryFault, KlogEntry, KlogEvent, KlogEvents};
pub use sequence::SequenceAccumulator;
pub use varint::{VarintError, MAX_VARINT_BYTES};
pub use vlog::{resolve, VlogError};

#[cfg(test)]
mod tests;
