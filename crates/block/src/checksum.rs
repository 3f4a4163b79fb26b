//! Block payload checksums (xxHash32, seed 0).

use xxhash_rust::xxh32::xxh32;

/// Seed used for every block checksum.
pub const CHECKSUM_SEED: u32 = 0;

/// Computes the checksum of a block payload.
///
/// Covers exactly the payload bytes: the 8-byte header and the footer are
/// excluded.
#[must_use]
pub fn checksum(payload: &[u8]) -> u32 {
    xxh32(payload, CHECKSUM_SEED)
}

/// Returns `true` if `payload` hashes to `stored`.
#[must_use]
pub fn verify(payload: &[u8], stored: u32) -> bool {
    checksum(payload) == stored
}
