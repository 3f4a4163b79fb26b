use super::*;

fn present(payload: &[u8]) -> BloomStats {
    match inspect(payload).unwrap() {
        BloomInspection::Present(stats) => stats,
        BloomInspection::Disabled => panic!("expected a filter"),
    }
}

// -------------------- Statistics --------------------

#[test]
fn popcount_and_fill_ratio() {
    let stats = present(&encode(256, 4, &[u64::MAX, 0, 0xff, 0]));
    assert_eq!(stats.m, 256);
    assert_eq!(stats.k, 4);
    assert_eq!(stats.size_in_words, 4);
    assert_eq!(stats.bits_set, 72);
    assert_eq!(stats.fill_ratio, 72.0 / 256.0);
    assert_eq!(stats.serialized_bytes, 12 + 32);
    assert_eq!(stats.trailing_bytes, 0);
}

#[test]
fn fpr_is_fill_ratio_to_the_k() {
    let stats = present(&encode(128, 3, &[0x0f0f_0f0f_0f0f_0f0f, 0]));
    let fill = 32.0 / 128.0;
    assert_eq!(stats.fill_ratio, fill);
    assert_eq!(stats.estimated_fpr, f64::powf(fill, 3.0));
}

#[test]
fn all_zero_bitset() {
    let stats = present(&encode(640, 7, &[0; 10]));
    assert_eq!(stats.bits_set, 0);
    assert_eq!(stats.fill_ratio, 0.0);
    assert_eq!(stats.estimated_fpr, 0.0);
    assert!(!stats.is_saturated());
}

#[test]
fn saturation_above_half() {
    let half = present(&encode(128, 2, &[u64::MAX, 0]));
    assert_eq!(half.fill_ratio, 0.5);
    assert!(!half.is_saturated());

    let over = present(&encode(128, 2, &[u64::MAX, 1]));
    assert!(over.is_saturated());
}

#[test]
fn full_filter_has_fpr_one() {
    let stats = present(&encode(64, 5, &[u64::MAX]));
    assert_eq!(stats.fill_ratio, 1.0);
    assert_eq!(stats.estimated_fpr, 1.0);
}

#[test]
fn words_are_little_endian() {
    let mut payload = encode(64, 1, &[0]);
    payload[12] = 0x01;
    payload[19] = 0x80;
    assert_eq!(present(&payload).bits_set, 2);
}

#[test]
fn trailing_bytes_are_tolerated() {
    let mut payload = encode(64, 1, &[0b111]);
    payload.extend_from_slice(&[0xff, 0xff, 0xff]);
    let stats = present(&payload);
    assert_eq!(stats.bits_set, 3);
    assert_eq!(stats.trailing_bytes, 3);
}

#[test]
fn size_kib() {
    assert_eq!(present(&encode(8 * 1024 * 2, 1, &[0])).size_kib(), 2.0);
}

// -------------------- Disabled / invalid --------------------

#[test]
fn empty_payload_is_disabled() {
    assert_eq!(inspect(&[]), Ok(BloomInspection::Disabled));
}

#[test]
fn short_header() {
    assert_eq!(
        inspect(&[1, 2, 3, 4, 5]),
        Err(BloomError::ShortHeader { len: 5 })
    );
}

#[test]
fn zero_bits_and_zero_hashes() {
    assert_eq!(inspect(&encode(0, 3, &[])), Err(BloomError::ZeroBits));
    assert_eq!(inspect(&encode(64, 0, &[0])), Err(BloomError::ZeroHashes));
}

#[test]
fn declared_words_beyond_payload() {
    let mut payload = encode(64, 2, &[0, 0]);
    payload[8..12].copy_from_slice(&3u32.to_le_bytes());
    assert_eq!(
        inspect(&payload),
        Err(BloomError::WordsExceedPayload {
            words: 3,
            available: 16
        })
    );
}

#[test]
fn huge_word_count_is_rejected() {
    let mut payload = encode(64, 2, &[0]);
    payload[8..12].copy_from_slice(&u32::MAX.to_le_bytes());
    assert!(matches!(
        inspect(&payload),
        Err(BloomError::WordsExceedPayload { .. })
    ));
}

#[test]
fn more_bits_set_than_m() {
    assert_eq!(
        inspect(&encode(10, 2, &[u64::MAX])),
        Err(BloomError::PopulationExceedsBits { bits_set: 64, m: 10 })
    );
}

// -------------------- Debug --------------------

#[test]
fn debug_impl_works() {
    let stats = present(&encode(64, 1, &[1]));
    let dbg = format!("{:?}", stats);
    assert!(dbg.contains("BloomStats"));
    assert!(dbg.contains("bits_set"));
}
