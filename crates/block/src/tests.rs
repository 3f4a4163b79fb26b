use super::*;
use std::io::Cursor;
use tempfile::tempdir;

// -------------------- Helpers --------------------

fn reader_for(image: &BlockImage) -> BlockReader<Cursor<Vec<u8>>> {
    BlockReader::from_reader(Cursor::new(image.as_bytes().to_vec())).unwrap()
}

fn reader_from_bytes(bytes: &[u8]) -> BlockReader<Cursor<Vec<u8>>> {
    BlockReader::from_reader(Cursor::new(bytes.to_vec())).unwrap()
}

// -------------------- Checksum --------------------

#[test]
fn checksum_of_empty_input_matches_xxh32_reference() {
    assert_eq!(checksum(b""), 0x02CC_5D05);
}

#[test]
fn verify_accepts_matching_and_rejects_other_checksums() {
    let payload = b"some block payload";
    let stored = checksum(payload);
    assert!(verify(payload, stored));
    assert!(!verify(payload, stored ^ 1));
    assert!(!verify(b"some block payloaD", stored));
}

#[test]
fn checksum_is_deterministic() {
    let payload: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    assert_eq!(checksum(&payload), checksum(&payload.clone()));
}

// -------------------- Header / footer codecs --------------------

#[test]
fn header_encode_decode() {
    let h = BlockHeader {
        size: 0x0102_0304,
        checksum: 0xdead_beef,
    };
    let bytes = h.encode();
    assert_eq!(&bytes[0..4], &[0x04, 0x03, 0x02, 0x01]);
    assert_eq!(BlockHeader::decode(&bytes), h);
    assert_eq!(h.span(), 8 + 0x0102_0304 + 8);
}

#[test]
fn header_size_bounds() {
    let mk = |size| BlockHeader { size, checksum: 0 };
    assert!(!mk(0).has_valid_size());
    assert!(mk(1).has_valid_size());
    assert!(mk(MAX_BLOCK_SIZE).has_valid_size());
    assert!(!mk(MAX_BLOCK_SIZE + 1).has_valid_size());
}

// -------------------- read_block --------------------

#[test]
fn read_block_at_offset() {
    let mut image = BlockImage::new();
    let first = image.push(b"hello");
    let second = image.push(b"world!");
    assert_eq!(first, FILE_HEADER_BYTES);
    assert_eq!(second, FILE_HEADER_BYTES + 8 + 5 + 8);

    let mut r = reader_for(&image);
    let b = r.read_block(second).unwrap();
    assert_eq!(b.offset, second);
    assert_eq!(b.payload, b"world!");
    assert_eq!(b.size(), 6);
    assert!(b.verify());
    assert_eq!(b.end_offset(), image.offset());
}

#[test]
fn read_block_short_header_is_truncated() {
    let mut r = reader_from_bytes(&[0u8; 11]);
    match r.read_block(8) {
        Err(BlockError::TruncatedHeader { offset, available }) => {
            assert_eq!(offset, 8);
            assert_eq!(available, 3);
        }
        other => panic!("expected TruncatedHeader, got {:?}", other),
    }
}

#[test]
fn read_block_past_eof_is_truncated() {
    let mut image = BlockImage::new();
    image.push(b"x");
    let mut r = reader_for(&image);
    let err = r.read_block(10_000).unwrap_err();
    assert!(err.is_truncation());
    assert_eq!(err.offset(), 10_000);
}

#[test]
fn read_block_zero_size_is_oversize() {
    let mut image = BlockImage::new();
    image.push_raw(0, 0, b"");
    let mut r = reader_for(&image);
    assert!(matches!(
        r.read_block(8),
        Err(BlockError::Oversize { offset: 8, size: 0 })
    ));
}

#[test]
fn read_block_huge_size_fails_before_allocating() {
    let mut image = BlockImage::new();
    image.push_raw(MAX_BLOCK_SIZE + 1, 0, b"tiny");
    let mut r = reader_for(&image);
    assert!(matches!(
        r.read_block(8),
        Err(BlockError::Oversize { size, .. }) if size == MAX_BLOCK_SIZE + 1
    ));
}

#[test]
fn read_block_declared_size_beyond_file_is_truncated_payload() {
    let mut image = BlockImage::new();
    image.push_bytes(&BlockHeader { size: 1000, checksum: 0 }.encode());
    image.push_bytes(b"only a few bytes");
    let mut r = reader_for(&image);
    match r.read_block(8) {
        Err(BlockError::TruncatedPayload {
            offset,
            size,
            available,
        }) => {
            assert_eq!(offset, 8);
            assert_eq!(size, 1000);
            assert_eq!(available, 16);
        }
        other => panic!("expected TruncatedPayload, got {:?}", other),
    }
}

#[test]
fn read_block_detects_corrupted_payload() {
    let mut image = BlockImage::new();
    let off = image.push(b"abcdef") as usize;
    image.as_bytes_mut()[off + 8 + 2] ^= 0xff;
    let mut r = reader_for(&image);
    let b = r.read_block(off as u64).unwrap();
    assert!(!b.verify());
    assert_ne!(b.computed_checksum(), b.stored_checksum());
}

#[test]
fn read_block_with_offset_near_u64_max() {
    let mut image = BlockImage::new();
    image.push(b"x");
    let mut r = reader_for(&image);
    assert!(r.read_block(u64::MAX - 3).unwrap_err().is_truncation());
}

// -------------------- Sequential traversal --------------------

#[test]
fn blocks_iterates_in_order_and_stops_at_eof() {
    let mut image = BlockImage::new();
    for i in 0..5u8 {
        image.push(&vec![i; (i as usize) + 1]);
    }
    let mut r = reader_for(&image);
    let blocks: Vec<_> = r.blocks().collect::<Result<_, _>>().unwrap();
    assert_eq!(blocks.len(), 5);
    for (i, (index, block)) in blocks.iter().enumerate() {
        assert_eq!(*index, i as u64);
        assert_eq!(block.payload, vec![i as u8; i + 1]);
    }
}

#[test]
fn empty_file_and_header_only_file_have_no_blocks() {
    let mut r = reader_from_bytes(&[]);
    assert!(r.blocks().next().is_none());

    let mut r = reader_from_bytes(&[0u8; 3]);
    assert!(r.blocks().next().is_none());

    let mut r = reader_for(&BlockImage::new());
    assert!(r.blocks().next().is_none());
}

#[test]
fn trailing_partial_block_is_reported_once() {
    let mut image = BlockImage::new();
    image.push(b"complete");
    image.push_bytes(&[7, 0, 0]);
    let mut r = reader_for(&image);
    let mut it = r.blocks();
    assert!(it.next().unwrap().is_ok());
    let err = it.next().unwrap().unwrap_err();
    assert!(matches!(err, BlockError::TruncatedHeader { available: 3, .. }));
    assert!(it.next().is_none());
}

#[test]
fn cursor_stops_after_invalid_size() {
    let mut image = BlockImage::new();
    image.push(b"a");
    image.push_raw(0, 0, b"");
    image.push(b"never reached");
    let mut r = reader_for(&image);
    let mut cursor = BlockCursor::new();
    assert!(cursor.next_block(&mut r).unwrap().is_ok());
    assert!(matches!(
        cursor.next_block(&mut r),
        Some(Err(BlockError::Oversize { .. }))
    ));
    assert!(cursor.is_done());
    assert!(cursor.next_block(&mut r).is_none());
}

#[test]
fn count_blocks_walks_headers() {
    let mut image = BlockImage::new();
    for _ in 0..7 {
        image.push(b"payload");
    }
    let mut r = reader_for(&image);
    let (count, err) = r.count_blocks();
    assert_eq!(count, 7);
    assert!(err.is_none());

    image.push_bytes(&BlockHeader { size: 64, checksum: 0 }.encode());
    let mut r = reader_for(&image);
    let (count, err) = r.count_blocks();
    assert_eq!(count, 7);
    assert!(matches!(err, Some(BlockError::TruncatedPayload { size: 64, .. })));
}

// -------------------- Backward traversal --------------------

#[test]
fn backward_navigation_visits_every_block() {
    let mut image = BlockImage::new();
    let offsets: Vec<u64> = [&b"one"[..], b"two two", b"three"]
        .iter()
        .map(|p| image.push(p))
        .collect();
    let mut r = reader_for(&image);

    let last = r.last_block_offset().unwrap().unwrap();
    assert_eq!(last, offsets[2]);
    let mid = r.prev_block_offset(last).unwrap().unwrap();
    assert_eq!(mid, offsets[1]);
    let first = r.prev_block_offset(mid).unwrap().unwrap();
    assert_eq!(first, offsets[0]);
    assert_eq!(r.prev_block_offset(first).unwrap(), None);
}

#[test]
fn backward_navigation_allows_empty_block() {
    let mut image = BlockImage::new();
    let first = image.push(b"index");
    let empty = image.push_raw(0, 0, b"");
    image.push(b"meta");
    let mut r = reader_for(&image);
    let last = r.last_block_offset().unwrap().unwrap();
    let prev = r.prev_block_offset(last).unwrap().unwrap();
    assert_eq!(prev, empty);
    assert_eq!(r.read_raw_header(prev).unwrap().size, 0);
    assert_eq!(r.prev_block_offset(prev).unwrap(), Some(first));
}

#[test]
fn backward_navigation_detects_footer_mismatch() {
    let mut image = BlockImage::new();
    image.push(b"aaaa");
    image.push(b"bbbb");
    let len = image.as_bytes().len();
    // a footer_size of 24 spans back exactly to the first block's header
    let bogus = 24u32.to_le_bytes();
    image.as_bytes_mut()[len - 8..len - 4].copy_from_slice(&bogus);

    let mut r = reader_for(&image);
    let err = r.last_block_offset().unwrap_err();
    assert!(matches!(
        err,
        BlockError::FooterMismatch {
            footer_size: 24,
            header_size: 4,
            ..
        }
    ));
}

#[test]
fn backward_navigation_rejects_footer_reaching_before_file_start() {
    let mut image = BlockImage::new();
    image.push(b"abc");
    let len = image.as_bytes().len();
    image.as_bytes_mut()[len - 8..len - 4].copy_from_slice(&1000u32.to_le_bytes());
    let mut r = reader_for(&image);
    assert!(matches!(
        r.last_block_offset(),
        Err(BlockError::Oversize { size: 1000, .. })
    ));
}

#[test]
fn last_block_of_tiny_file_is_none() {
    let mut r = reader_from_bytes(&[0u8; 12]);
    assert_eq!(r.last_block_offset().unwrap(), None);
}

// -------------------- Files on disk --------------------

#[test]
fn open_reads_image_written_to_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("000001.klog");
    let mut image = BlockImage::new();
    image.push(b"on disk");
    image.write_to(&path).unwrap();

    let mut r = BlockReader::open(&path).unwrap();
    assert_eq!(r.len(), image.offset());
    let block = r.read_block(FILE_HEADER_BYTES).unwrap();
    assert_eq!(block.payload, b"on disk");
    assert!(block.verify());
}

#[test]
fn open_missing_file_fails() {
    let dir = tempdir().unwrap();
    assert!(BlockReader::open(dir.path().join("missing.klog")).is_err());
}
