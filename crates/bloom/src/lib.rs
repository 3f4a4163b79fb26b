//! # Bloom Filter inspection
//!
//! Reads the serialized bloom filter that the storage engine embeds in every
//! klog file and reports how full it is.
//!
//! ## Payload layout
//!
//! ```text
//! [m: u32 LE][h: u32 LE][size_in_words: u32 LE][word 0: u64 LE] ... [word n-1: u64 LE]
//! ```
//!
//! `m` is the number of bits in the filter and `h` the number of hash
//! functions. The false positive rate is estimated from the observed fill
//! ratio rather than from an insertion count, which the file does not record:
//!
//! ```text
//! fill_ratio    = popcount(words) / m
//! estimated_fpr = fill_ratio ^ h
//! ```
//!
//! An empty payload means the engine was configured without bloom filters.
//!
//! ## Example
//!
//! ```rust
//! use bloom::{encode, inspect, BloomInspection};
//!
//! let payload = encode(128, 3, &[0b1011, 0]);
//! match inspect(&payload).unwrap() {
//!     BloomInspection::Present(stats) => assert_eq!(stats.bits_set, 3),
//!     BloomInspection::Disabled => unreachable!(),
//! }
//! ```

use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

/// Bytes taken by `m`, `h` and `size_in_words`.
pub const BLOOM_HEADER_BYTES: usize = 12;

/// Fill ratio above which false positives climb quickly.
pub const SATURATION_THRESHOLD: f64 = 0.5;

/// Reasons a bloom payload cannot be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BloomError {
    #[error("bloom payload of {len} bytes is shorter than its 12-byte header")]
    ShortHeader { len: usize },

    #[error("bloom filter declares zero bits")]
    ZeroBits,

    #[error("bloom filter declares zero hash functions")]
    ZeroHashes,

    #[error("bloom filter declares {words} words but only {available} bytes follow the header")]
    WordsExceedPayload { words: u32, available: usize },

    /// More bits are set than the filter has.
    #[error("bloom filter has {bits_set} bits set but only {m} bits")]
    PopulationExceedsBits { bits_set: u64, m: u32 },
}

/// Statistics computed from a serialized bloom filter.
#[derive(Clone, PartialEq)]
pub struct BloomStats {
    /// Bits in the filter.
    pub m: u32,
    /// Hash functions.
    pub k: u32,
    pub size_in_words: u32,
    /// Length of the whole payload, header included.
    pub serialized_bytes: usize,
    pub bits_set: u64,
    pub fill_ratio: f64,
    pub estimated_fpr: f64,
    /// Bytes after the last word. Tolerated.
    pub trailing_bytes: usize,
}

impl BloomStats {
    /// Returns `true` when more than half the bits are set.
    #[must_use]
    pub fn is_saturated(&self) -> bool {
        self.fill_ratio > SATURATION_THRESHOLD
    }

    /// Filter size in KiB.
    #[must_use]
    pub fn size_kib(&self) -> f64 {
        f64::from(self.m) / 8.0 / 1024.0
    }
}

impl std::fmt::Debug for BloomStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BloomStats")
            .field("m", &self.m)
            .field("k", &self.k)
            .field("words", &self.size_in_words)
            .field("bits_set", &self.bits_set)
            .field("fill_ratio", &self.fill_ratio)
            .field("estimated_fpr", &self.estimated_fpr)
            .finish()
    }
}

/// Outcome of [`inspect`].
#[derive(Debug, Clone, PartialEq)]
pub enum BloomInspection {
    /// The payload was empty: no filter was written.
    Disabled,
    Present(BloomStats),
}

/// Decodes a bloom filter payload and computes its statistics.
///
/// # Errors
///
/// Returns a [`BloomError`] if the header is short, declares zero bits or
/// zero hash functions, promises more words than the payload holds, or if
/// the bitset has more bits set than `m`.
pub fn inspect(payload: &[u8]) -> Result<BloomInspection, BloomError> {
    if payload.is_empty() {
        return Ok(BloomInspection::Disabled);
    }
    if payload.len() < BLOOM_HEADER_BYTES {
        return Err(BloomError::ShortHeader { len: payload.len() });
    }

    let m = LittleEndian::read_u32(&payload[0..4]);
    let k = LittleEndian::read_u32(&payload[4..8]);
    let size_in_words = LittleEndian::read_u32(&payload[8..12]);
    if m == 0 {
        return Err(BloomError::ZeroBits);
    }
    if k == 0 {
        return Err(BloomError::ZeroHashes);
    }

    let body = &payload[BLOOM_HEADER_BYTES..];
    let words_bytes = (size_in_words as usize)
        .checked_mul(8)
        .filter(|&n| n <= body.len())
        .ok_or(BloomError::WordsExceedPayload {
            words: size_in_words,
            available: body.len(),
        })?;

    let bits_set: u64 = body[..words_bytes]
        .chunks_exact(8)
        .map(|w| u64::from(LittleEndian::read_u64(w).count_ones()))
        .sum();
    if bits_set > u64::from(m) {
        return Err(BloomError::PopulationExceedsBits { bits_set, m });
    }

    let fill_ratio = bits_set as f64 / f64::from(m);
    let estimated_fpr = fill_ratio.powf(f64::from(k));

    Ok(BloomInspection::Present(BloomStats {
        m,
        k,
        size_in_words,
        serialized_bytes: payload.len(),
        bits_set,
        fill_ratio,
        estimated_fpr,
        trailing_bytes: body.len() - words_bytes,
    }))
}

/// Serializes a filter in the on-disk layout. Used to build fixtures.
#[must_use]
pub fn encode(m: u32, k: u32, words: &[u64]) -> Vec<u8> {
    let mut out = vec![0u8; BLOOM_HEADER_BYTES + words.len() * 8];
    LittleEndian::write_u32(&mut out[0..4], m);
    LittleEndian::write_u32(&mut out[4..8], k);
    LittleEndian::write_u32(&mut out[8..12], words.len() as u32);
    for (i, word) in words.iter().enumerate() {
        let at = BLOOM_HEADER_BYTES + i * 8;
        LittleEndian::write_u64(&mut out[at..at + 8], *word);
    }
    out
}

#[cfg(test)]
mod tests;
