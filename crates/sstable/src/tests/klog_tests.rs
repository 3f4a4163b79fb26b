use crate::*;
use anyhow::Result;
use block::{BlockImage, BlockReader};
use std::io::Cursor;
use tempfile::tempdir;

fn events(image: &BlockImage, limit: usize) -> Vec<KlogEvent> {
    let reader = BlockReader::from_reader(Cursor::new(image.as_bytes().to_vec())).unwrap();
    KlogEvents::new(reader, limit).collect()
}

fn entries(events: &[KlogEvent]) -> Vec<&KlogEntry> {
    events
        .iter()
        .filter_map(|e| match e {
            KlogEvent::Entry(entry) => Some(entry),
            _ => None,
        })
        .collect()
}

fn block_count(events: &[KlogEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, KlogEvent::Block(_)))
        .count()
}

// -------------------- Delta sequences --------------------

#[test]
fn delta_tombstone_resolves_against_previous_entry() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("000001.klog");

    let mut image = BlockImage::new();
    image.push(&encode_payload(&[RawEntry::put(1, b"a", b"x")]));
    image.push(&encode_payload(&[
        RawEntry::put(1, b"a", b"x"),
        RawEntry::put(2, b"b", b"y").delta().tombstone(),
    ]));
    image.write_to(&path)?;

    let all: Vec<_> = KlogEvents::open(&path, 100)?.collect();
    let found = entries(&all);
    assert_eq!(found.len(), 3);
    assert_eq!(found[1].entry.seq, 1);
    assert_eq!(found[2].entry.seq, 3);
    assert!(found[2].entry.is_tombstone());
    assert_eq!(found[2].block_index, 1);
    assert_eq!(block_count(&all), 2);
    Ok(())
}

#[test]
fn delta_base_resets_at_block_boundary() {
    let mut image = BlockImage::new();
    image.push(&encode_payload(&[RawEntry::put(500, b"a", b"1")]));
    image.push(&encode_payload(&[RawEntry::put(4, b"b", b"2").delta()]));

    let all = events(&image, 100);
    let found = entries(&all);
    assert_eq!(found[0].entry.seq, 500);
    assert_eq!(found[1].entry.seq, 4);
}

// -------------------- Blocks --------------------

#[test]
fn block_events_carry_checksum_state() {
    let mut image = BlockImage::new();
    let good = image.push(&encode_payload(&[RawEntry::put(1, b"a", b"x")]));
    let payload = encode_payload(&[RawEntry::put(2, b"b", b"y")]);
    let bad = image.push_raw(payload.len() as u32, 0, &payload);

    let infos: Vec<BlockInfo> = events(&image, 100)
        .into_iter()
        .filter_map(|e| match e {
            KlogEvent::Block(info) => Some(info),
            _ => None,
        })
        .collect();
    assert_eq!(infos.len(), 2);
    assert_eq!((infos[0].offset, infos[0].checksum_ok), (good, true));
    assert_eq!((infos[1].offset, infos[1].checksum_ok), (bad, false));
    assert_eq!(infos[1].index, 1);
}

#[test]
fn entry_offsets_point_inside_block() {
    let mut image = BlockImage::new();
    let payload = encode_payload(&[RawEntry::put(1, b"a", b"x"), RawEntry::put(2, b"b", b"y")]);
    image.push(&payload);
    let all = events(&image, 100);
    let found = entries(&all);
    assert_eq!(found[0].entry_offset, 0);
    assert_eq!(found[1].entry_offset, payload.len() / 2);
}

// -------------------- Malformed entries --------------------

#[test]
fn malformed_entry_skips_rest_of_block_only() {
    let mut image = BlockImage::new();
    let mut first = encode_payload(&[RawEntry::put(1, b"a", b"x")]);
    // key_len 50 with nothing behind it, then a well-formed entry that must not be read
    first.extend_from_slice(&[0x00, 50, 0, 1]);
    first.extend_from_slice(&encode_payload(&[RawEntry::put(9, b"z", b"z")]));
    let first_offset = image.push(&first);
    image.push(&encode_payload(&[RawEntry::put(2, b"b", b"y")]));

    let all = events(&image, 100);
    let keys: Vec<&[u8]> = entries(&all).iter().map(|e| e.entry.key.as_slice()).collect();
    assert_eq!(keys, vec![&b"a"[..], &b"b"[..]]);

    let fault = all
        .iter()
        .find_map(|e| match e {
            KlogEvent::Malformed(f) => Some(f),
            _ => None,
        })
        .expect("malformed event");
    assert_eq!(fault.block_index, 0);
    assert_eq!(fault.entry_offset, 6);
    assert_eq!(fault.error.field, Field::Key);
    assert_eq!(fault.file_offset(), first_offset + 8 + 6 + 4);
}

// -------------------- Limits --------------------

#[test]
fn limit_mid_block_counts_opened_block() {
    let mut image = BlockImage::new();
    image.push(&encode_payload(&[
        RawEntry::put(1, b"a", b"x"),
        RawEntry::put(2, b"b", b"y"),
        RawEntry::put(3, b"c", b"z"),
    ]));
    image.push(&encode_payload(&[RawEntry::put(4, b"d", b"w")]));

    let all = events(&image, 2);
    assert_eq!(entries(&all).len(), 2);
    assert_eq!(block_count(&all), 1);
    match all.last() {
        Some(KlogEvent::LimitReached {
            limit,
            unread_bytes,
        }) => {
            assert_eq!(*limit, 2);
            // the third entry (6 bytes) plus the whole second block
            assert_eq!(*unread_bytes, 6 + 8 + 6 + 8);
        }
        other => panic!("expected LimitReached, got {:?}", other),
    }
}

#[test]
fn limit_at_block_end_with_more_blocks_reports_limit() {
    let mut image = BlockImage::new();
    image.push(&encode_payload(&[RawEntry::put(1, b"a", b"x")]));
    image.push(&encode_payload(&[RawEntry::put(2, b"b", b"y")]));
    let all = events(&image, 1);
    assert_eq!(block_count(&all), 1);
    assert!(matches!(all.last(), Some(KlogEvent::LimitReached { .. })));
}

#[test]
fn limit_equal_to_total_ends_cleanly() {
    let mut image = BlockImage::new();
    image.push(&encode_payload(&[RawEntry::put(1, b"a", b"x")]));
    let all = events(&image, 1);
    assert_eq!(entries(&all).len(), 1);
    assert!(matches!(all.last(), Some(KlogEvent::Entry(_))));
}

#[test]
fn zero_limit_reads_nothing() {
    let mut image = BlockImage::new();
    image.push(&encode_payload(&[RawEntry::put(1, b"a", b"x")]));
    let all = events(&image, 0);
    assert_eq!(all.len(), 1);
    assert!(matches!(all[0], KlogEvent::LimitReached { limit: 0, .. }));
}

// -------------------- Truncation --------------------

#[test]
fn three_byte_file_yields_nothing() {
    let reader = BlockReader::from_reader(Cursor::new(vec![1u8, 2, 3])).unwrap();
    let all: Vec<_> = KlogEvents::new(reader, 100).collect();
    assert!(all.is_empty());
}

#[test]
fn partial_tail_is_unreadable_and_terminal() {
    let mut image = BlockImage::new();
    image.push(&encode_payload(&[RawEntry::put(1, b"a", b"x")]));
    image.push_bytes(&[9, 0, 0, 0, 1]);
    let all = events(&image, 100);
    assert_eq!(entries(&all).len(), 1);
    match all.last() {
        Some(KlogEvent::Unreadable(e)) => assert!(e.is_truncation()),
        other => panic!("expected Unreadable, got {:?}", other),
    }
}
