use std::path::{Path, PathBuf};

use block::BlockImage;
use sstable::{encode_payload, RawEntry};

/// Writes `image` to `dir/name` and returns the path.
pub fn write(dir: &Path, name: &str, image: &BlockImage) -> PathBuf {
    let path = dir.join(name);
    image.write_to(&path).unwrap();
    path
}

/// One block per slice, each entry a plain put.
pub fn klog(blocks: &[&[RawEntry<'_>]]) -> BlockImage {
    let mut image = BlockImage::new();
    for entries in blocks {
        image.push(&encode_payload(entries));
    }
    image
}

/// `n` blocks holding one put each, with sequences 1..=n and keys `key-NN`.
/// Returns the image and the offset of every block.
pub fn numbered_klog(n: u64) -> (BlockImage, Vec<u64>) {
    let mut image = BlockImage::new();
    let mut offsets = Vec::new();
    for seq in 1..=n {
        let key = format!("key-{seq:02}");
        offsets.push(image.push(&encode_payload(&[RawEntry::put(seq, key.as_bytes(), b"v")])));
    }
    (image, offsets)
}

/// Flips one payload byte of the block at `offset`, leaving its checksum stale.
pub fn corrupt_payload(image: &mut BlockImage, offset: u64) {
    image.as_bytes_mut()[offset as usize + 8] ^= 0xff;
}

pub fn wal(entries: &[RawEntry<'_>]) -> BlockImage {
    let mut image = BlockImage::new();
    for entry in entries {
        image.push(&encode_payload(std::slice::from_ref(entry)));
    }
    image
}
