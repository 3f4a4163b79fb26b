//! Entry framing inside a block payload.
//!
//! ```text
//! [flags: u8]
//! [key_len: varint][value_len: varint][sequence: varint]
//! [ttl: i64 LE]            only with HAS_TTL
//! [vlog_offset: varint]    only with HAS_VLOG
//! [key: key_len bytes]
//! [value: value_len bytes] only without HAS_VLOG
//! ```
//!
//! Fields are consumed strictly in this order and every length is checked
//! against the bytes remaining in the payload before the position moves.

use std::fmt;
use std::ops::BitOr;

use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

use crate::sequence;
use crate::varint::{self, VarintError};

/// The entry flags byte.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EntryFlags(u8);

impl EntryFlags {
    /// The entry deletes its key.
    pub const TOMBSTONE: Self = Self(0x01);
    /// An absolute expiry timestamp follows the sequence number.
    pub const HAS_TTL: Self = Self(0x02);
    /// The value lives in the companion value log.
    pub const HAS_VLOG: Self = Self(0x04);
    /// The sequence number is a delta from the previous entry in the block.
    pub const DELTA_SEQ: Self = Self(0x08);

    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Wraps a raw flags byte. Unknown bits are kept and ignored.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn is_tombstone(self) -> bool {
        self.contains(Self::TOMBSTONE)
    }

    #[must_use]
    pub const fn has_ttl(self) -> bool {
        self.contains(Self::HAS_TTL)
    }

    #[must_use]
    pub const fn has_vlog(self) -> bool {
        self.contains(Self::HAS_VLOG)
    }

    #[must_use]
    pub const fn is_delta_seq(self) -> bool {
        self.contains(Self::DELTA_SEQ)
    }
}

impl BitOr for EntryFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for EntryFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::TOMBSTONE, "TOMBSTONE"),
            (Self::HAS_TTL, "HAS_TTL"),
            (Self::HAS_VLOG, "HAS_VLOG"),
            (Self::DELTA_SEQ, "DELTA_SEQ"),
        ];
        write!(f, "EntryFlags({:#04x}", self.0)?;
        for (flag, name) in names {
            if self.contains(flag) {
                write!(f, " {}", name)?;
            }
        }
        write!(f, ")")
    }
}

/// Where an entry's value bytes live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryValue {
    /// Value bytes embedded in the block payload.
    Inline(Vec<u8>),
    /// Value stored in the companion value log, in a block at `offset`.
    External { offset: u64 },
}

/// A decoded key/value entry with its sequence number resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub flags: EntryFlags,
    /// Absolute sequence number (delta already applied).
    pub seq: u64,
    /// Absolute expiry timestamp, when `HAS_TTL` is set.
    pub ttl: Option<i64>,
    pub key: Vec<u8>,
    /// Declared value length; for external values, the length in the value log.
    pub value_len: u64,
    pub value: EntryValue,
}

impl Entry {
    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        self.flags.is_tombstone()
    }

    /// Value-log offset for externalized values.
    #[must_use]
    pub fn vlog_offset(&self) -> Option<u64> {
        match self.value {
            EntryValue::External { offset } => Some(offset),
            EntryValue::Inline(_) => None,
        }
    }

    /// Inline value bytes, if the value is not externalized.
    #[must_use]
    pub fn inline_value(&self) -> Option<&[u8]> {
        match &self.value {
            EntryValue::Inline(v) => Some(v),
            EntryValue::External { .. } => None,
        }
    }
}

/// The entry field being decoded when a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Flags,
    KeyLen,
    ValueLen,
    Sequence,
    Ttl,
    VlogOffset,
    Key,
    Value,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Flags => "flags",
            Field::KeyLen => "key_len",
            Field::ValueLen => "value_len",
            Field::Sequence => "sequence",
            Field::Ttl => "ttl",
            Field::VlogOffset => "vlog_offset",
            Field::Key => "key",
            Field::Value => "value",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryErrorKind {
    /// The field declares more bytes than remain in the payload.
    #[error("needs {needed} bytes, {remaining} remaining")]
    Truncated { needed: u64, remaining: usize },

    #[error(transparent)]
    Varint(VarintError),

    /// Applying a sequence delta overflowed `u64`.
    #[error("delta {delta} overflows base sequence {base}")]
    SequenceOverflow { base: u64, delta: u64 },
}

/// A definitive failure to decode one entry.
///
/// `offset` is relative to the start of the entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed entry: {field} at entry offset {offset}: {kind}")]
pub struct EntryError {
    pub field: Field,
    pub offset: usize,
    pub kind: EntryErrorKind,
}

/// Bounds-checked reader over one entry's bytes.
struct Framer<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Framer<'a> {
    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn fail(&self, field: Field, kind: EntryErrorKind) -> EntryError {
        EntryError {
            field,
            offset: self.pos,
            kind,
        }
    }

    fn take(&mut self, field: Field, len: u64) -> Result<&'a [u8], EntryError> {
        let remaining = self.remaining();
        if len > remaining as u64 {
            return Err(self.fail(
                field,
                EntryErrorKind::Truncated {
                    needed: len,
                    remaining,
                },
            ));
        }
        let buf: &'a [u8] = self.buf;
        let bytes = &buf[self.pos..self.pos + len as usize];
        self.pos += len as usize;
        Ok(bytes)
    }

    fn u8(&mut self, field: Field) -> Result<u8, EntryError> {
        Ok(self.take(field, 1)?[0])
    }

    fn i64_le(&mut self, field: Field) -> Result<i64, EntryError> {
        Ok(LittleEndian::read_i64(self.take(field, 8)?))
    }

    fn varint(&mut self, field: Field) -> Result<u64, EntryError> {
        let (value, used) = varint::decode(&self.buf[self.pos..], self.remaining())
            .map_err(|e| self.fail(field, EntryErrorKind::Varint(e)))?;
        self.pos += used;
        Ok(value)
    }
}

/// Decodes one entry from the start of `payload`.
///
/// `prev_seq` is the resolved sequence of the previous entry in the same
/// block (0 for the first). Returns the entry and the number of bytes it
/// occupied.
///
/// # Errors
///
/// Returns an [`EntryError`] naming the first field that could not be
/// decoded. Nothing past `payload` is ever read.
pub fn decode_entry(payload: &[u8], prev_seq: u64) -> Result<(Entry, usize), EntryError> {
    let mut f = Framer {
        buf: payload,
        pos: 0,
    };

    let flags = EntryFlags::from_bits(f.u8(Field::Flags)?);
    let key_len = f.varint(Field::KeyLen)?;
    let value_len = f.varint(Field::ValueLen)?;

    let seq_pos = f.pos;
    let seq_raw = f.varint(Field::Sequence)?;
    let seq = sequence::resolve(prev_seq, flags, seq_raw).ok_or(EntryError {
        field: Field::Sequence,
        offset: seq_pos,
        kind: EntryErrorKind::SequenceOverflow {
            base: prev_seq,
            delta: seq_raw,
        },
    })?;

    let ttl = if flags.has_ttl() {
        Some(f.i64_le(Field::Ttl)?)
    } else {
        None
    };
    let vlog_offset = if flags.has_vlog() {
        Some(f.varint(Field::VlogOffset)?)
    } else {
        None
    };

    let key = f.take(Field::Key, key_len)?.to_vec();
    let value = match vlog_offset {
        Some(offset) => EntryValue::External { offset },
        None => EntryValue::Inline(f.take(Field::Value, value_len)?.to_vec()),
    };

    Ok((
        Entry {
            flags,
            seq,
            ttl,
            key,
            value_len,
            value,
        },
        f.pos,
    ))
}

/// Field values of one entry as they are laid out on disk.
///
/// Used to build payloads for tests and benches; `seq_raw` is written as-is,
/// so callers choose between absolute and delta encoding through `flags`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry<'a> {
    pub flags: EntryFlags,
    pub seq_raw: u64,
    pub ttl: i64,
    pub vlog_offset: u64,
    pub key: &'a [u8],
    pub value: &'a [u8],
}

impl<'a> RawEntry<'a> {
    /// A plain inline put with an absolute sequence number.
    #[must_use]
    pub fn put(seq: u64, key: &'a [u8], value: &'a [u8]) -> Self {
        Self {
            flags: EntryFlags::empty(),
            seq_raw: seq,
            ttl: 0,
            vlog_offset: 0,
            key,
            value,
        }
    }

    #[must_use]
    pub fn tombstone(mut self) -> Self {
        self.flags = self.flags | EntryFlags::TOMBSTONE;
        self
    }

    /// Marks `seq_raw` as a delta from the previous entry.
    #[must_use]
    pub fn delta(mut self) -> Self {
        self.flags = self.flags | EntryFlags::DELTA_SEQ;
        self
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: i64) -> Self {
        self.flags = self.flags | EntryFlags::HAS_TTL;
        self.ttl = ttl;
        self
    }

    /// Externalizes the value: only its length is written, plus `offset`.
    #[must_use]
    pub fn external(mut self, offset: u64) -> Self {
        self.flags = self.flags | EntryFlags::HAS_VLOG;
        self.vlog_offset = offset;
        self
    }

    /// Appends the encoded entry to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.flags.bits());
        varint::encode(self.key.len() as u64, out);
        varint::encode(self.value.len() as u64, out);
        varint::encode(self.seq_raw, out);
        if self.flags.has_ttl() {
            out.extend_from_slice(&self.ttl.to_le_bytes());
        }
        if self.flags.has_vlog() {
            varint::encode(self.vlog_offset, out);
        }
        out.extend_from_slice(self.key);
        if !self.flags.has_vlog() {
            out.extend_from_slice(self.value);
        }
    }
}

/// Encodes a sequence of entries back to back into one block payload.
#[must_use]
pub fn encode_payload(entries: &[RawEntry<'_>]) -> Vec<u8> {
    let mut out = Vec::new();
    for e in entries {
        e.encode(&mut out);
    }
    out
}
