use crate::*;
use proptest::prelude::*;

fn one(raw: RawEntry<'_>) -> Vec<u8> {
    encode_payload(&[raw])
}

// -------------------- Grammar --------------------

#[test]
fn decodes_plain_put() {
    let bytes = one(RawEntry::put(42, b"key", b"value"));
    let (entry, used) = decode_entry(&bytes, 0).unwrap();
    assert_eq!(used, bytes.len());
    assert_eq!(entry.seq, 42);
    assert_eq!(entry.key, b"key");
    assert_eq!(entry.inline_value(), Some(&b"value"[..]));
    assert_eq!(entry.value_len, 5);
    assert_eq!(entry.ttl, None);
    assert!(!entry.is_tombstone());
}

#[test]
fn decodes_ttl_and_external_value() {
    let bytes = one(RawEntry::put(7, b"k", b"0123456789").with_ttl(-5).external(4096));
    let (entry, used) = decode_entry(&bytes, 0).unwrap();
    assert_eq!(used, bytes.len());
    assert_eq!(entry.ttl, Some(-5));
    assert_eq!(entry.vlog_offset(), Some(4096));
    assert_eq!(entry.value_len, 10);
    assert_eq!(entry.inline_value(), None);
}

#[test]
fn external_value_bytes_are_not_in_payload() {
    let bytes = one(RawEntry::put(1, b"k", b"large value").external(8));
    // flags + key_len + value_len + seq + vlog_offset + key
    assert_eq!(bytes.len(), 1 + 1 + 1 + 1 + 1 + 1);
}

#[test]
fn consumed_length_stops_at_entry_boundary() {
    let bytes = encode_payload(&[RawEntry::put(1, b"a", b"x"), RawEntry::put(2, b"b", b"y")]);
    let (first, used) = decode_entry(&bytes, 0).unwrap();
    let (second, _) = decode_entry(&bytes[used..], first.seq).unwrap();
    assert_eq!(first.key, b"a");
    assert_eq!(second.key, b"b");
}

#[test]
fn unknown_flag_bits_are_ignored() {
    let mut bytes = one(RawEntry::put(3, b"k", b"v"));
    bytes[0] |= 0xf0;
    let (entry, _) = decode_entry(&bytes, 0).unwrap();
    assert_eq!(entry.flags.bits(), 0xf0);
    assert!(!entry.is_tombstone());
    assert_eq!(entry.inline_value(), Some(&b"v"[..]));
}

// -------------------- Sequences --------------------

#[test]
fn delta_sequence_adds_to_previous() {
    let bytes = one(RawEntry::put(2, b"b", b"y").delta());
    let (entry, _) = decode_entry(&bytes, 1).unwrap();
    assert_eq!(entry.seq, 3);
}

#[test]
fn absolute_sequence_ignores_previous() {
    let bytes = one(RawEntry::put(2, b"b", b"y"));
    let (entry, _) = decode_entry(&bytes, 100).unwrap();
    assert_eq!(entry.seq, 2);
}

#[test]
fn delta_overflow_is_a_decode_failure() {
    let bytes = one(RawEntry::put(2, b"k", b"v").delta());
    let err = decode_entry(&bytes, u64::MAX).unwrap_err();
    assert_eq!(err.field, Field::Sequence);
    assert_eq!(
        err.kind,
        EntryErrorKind::SequenceOverflow {
            base: u64::MAX,
            delta: 2
        }
    );
}

#[test]
fn accumulator_tracks_previous_sequence() {
    let bytes = encode_payload(&[
        RawEntry::put(10, b"a", b""),
        RawEntry::put(5, b"b", b"").delta(),
        RawEntry::put(1, b"c", b"").delta(),
    ]);
    let mut acc = SequenceAccumulator::new();
    let mut pos = 0;
    let mut seqs = Vec::new();
    while pos < bytes.len() {
        let (entry, used) = acc.decode_next(&bytes[pos..]).unwrap();
        seqs.push(entry.seq);
        pos += used;
    }
    assert_eq!(seqs, vec![10, 15, 16]);
    assert_eq!(acc.prev(), 16);
    acc.reset();
    assert_eq!(acc.prev(), 0);
}

#[test]
fn accumulator_unchanged_after_failure() {
    let mut acc = SequenceAccumulator::new();
    acc.decode_next(&one(RawEntry::put(9, b"a", b"x"))).unwrap();
    assert!(acc.decode_next(&[0x00, 0x05]).is_err());
    assert_eq!(acc.prev(), 9);
}

// -------------------- Failures --------------------

#[test]
fn key_longer_than_payload_is_truncated() {
    // flags, key_len = 100, value_len = 0, seq = 1, then 2 key bytes
    let bytes = [0x00, 100, 0, 1, b'a', b'b'];
    let err = decode_entry(&bytes, 0).unwrap_err();
    assert_eq!(err.field, Field::Key);
    assert_eq!(err.offset, 4);
    assert_eq!(
        err.kind,
        EntryErrorKind::Truncated {
            needed: 100,
            remaining: 2
        }
    );
}

#[test]
fn huge_declared_value_len_fails_without_allocating() {
    let mut bytes = vec![0x00, 1];
    crate::varint::encode(u64::MAX, &mut bytes);
    bytes.extend_from_slice(&[1, b'k', b'v']);
    let err = decode_entry(&bytes, 0).unwrap_err();
    assert_eq!(err.field, Field::Value);
    assert!(matches!(err.kind, EntryErrorKind::Truncated { needed: u64::MAX, .. }));
}

#[test]
fn short_ttl_is_truncated() {
    let bytes = [EntryFlags::HAS_TTL.bits(), 1, 1, 1, 0, 0, 0];
    let err = decode_entry(&bytes, 0).unwrap_err();
    assert_eq!(err.field, Field::Ttl);
}

#[test]
fn runaway_varint_is_reported_as_malformed() {
    let mut bytes = vec![0x00];
    bytes.extend_from_slice(&[0x80; 11]);
    let err = decode_entry(&bytes, 0).unwrap_err();
    assert_eq!(err.field, Field::KeyLen);
    assert_eq!(err.offset, 1);
    assert_eq!(err.kind, EntryErrorKind::Varint(VarintError::Malformed));
}

#[test]
fn empty_payload_fails_on_flags() {
    let err = decode_entry(&[], 0).unwrap_err();
    assert_eq!(err.field, Field::Flags);
    assert_eq!(err.offset, 0);
}

// -------------------- Properties --------------------

fn arb_raw() -> impl Strategy<Value = (u8, u64, i64, u64, Vec<u8>, Vec<u8>)> {
    (
        0u8..16,
        any::<u64>(),
        any::<i64>(),
        any::<u64>(),
        prop::collection::vec(any::<u8>(), 0..40),
        prop::collection::vec(any::<u8>(), 0..200),
    )
}

proptest! {
    #[test]
    fn every_truncated_prefix_fails_in_bounds(
        (flags, seq, ttl, vlog, key, value) in arb_raw()
    ) {
        let raw = RawEntry {
            flags: EntryFlags::from_bits(flags),
            seq_raw: seq,
            ttl,
            vlog_offset: vlog,
            key: &key,
            value: &value,
        };
        let bytes = one(raw);
        // delta entries decode against base 0 so they cannot overflow
        let (entry, used) = decode_entry(&bytes, 0).unwrap();
        prop_assert_eq!(used, bytes.len());
        prop_assert_eq!(&entry.key, &key);

        for cut in 0..bytes.len() {
            let err = decode_entry(&bytes[..cut], 0);
            prop_assert!(err.is_err(), "prefix of {} bytes decoded", cut);
            prop_assert!(err.unwrap_err().offset <= cut);
        }
    }
}
