//! Unsigned LEB128 varints.
//!
//! Each byte carries 7 value bits, least-significant group first; the high
//! bit marks continuation. A `u64` needs at most 10 bytes.

use thiserror::Error;

/// Longest varint accepted before declaring the input malformed.
pub const MAX_VARINT_BYTES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VarintError {
    /// The window ended before a terminating byte.
    #[error("varint incomplete after {consumed} bytes")]
    Incomplete { consumed: usize },

    /// Ten bytes were consumed and every one had its continuation bit set.
    #[error("varint longer than {MAX_VARINT_BYTES} bytes")]
    Malformed,
}

/// Decodes one varint from the first `max_bytes` bytes of `buf`.
///
/// Returns `(value, bytes_consumed)`. Never looks past
/// `min(max_bytes, buf.len())` bytes.
pub fn decode(buf: &[u8], max_bytes: usize) -> Result<(u64, usize), VarintError> {
    let window = &buf[..buf.len().min(max_bytes)];
    let mut value = 0u64;
    for (i, &byte) in window.iter().take(MAX_VARINT_BYTES).enumerate() {
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    if window.len() >= MAX_VARINT_BYTES {
        Err(VarintError::Malformed)
    } else {
        Err(VarintError::Incomplete {
            consumed: window.len(),
        })
    }
}

/// Appends the encoding of `value` to `out`, returning the bytes written.
pub fn encode(mut value: u64, out: &mut Vec<u8>) -> usize {
    let start = out.len();
    while value >= 0x80 {
        out.push((value as u8) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
    out.len() - start
}
