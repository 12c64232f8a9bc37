mod common;

use piupsp::compression::{compress, decompress, CompressionError};

#[test]
fn test_decompress_fixture_payload() {
    common::read_test("respack", "two-entries.dat", |data| {
        let entries = piupsp::respack::decode(data).unwrap();
        assert_eq!(decompress(&entries[1].compressed).unwrap().len(), 1024);
    });
}

#[test]
fn test_corrupt_header() {
    let mut data = compress(b"Pump It Up").unwrap();
    data[0] = 0x00;
    assert!(matches!(
        decompress(&data),
        Err(CompressionError::CorruptStream(_))
    ));
}

#[test]
fn test_truncated_stream() {
    let data = compress("Pump It Up".repeat(100)).unwrap();
    assert!(matches!(
        decompress(&data[..data.len() / 2]),
        Err(CompressionError::CorruptStream(_))
    ));
}

#[test]
fn test_checksum_mismatch() {
    let mut data = compress(b"Pump It Up").unwrap();
    let last = data.len() - 1;
    data[last] ^= 0xFF;
    assert!(matches!(
        decompress(&data),
        Err(CompressionError::CorruptStream(_))
    ));
}

#[test]
fn test_large_round_trip() {
    let data: Vec<u8> = (0..200_000u32).map(|n| (n * 7 % 251) as u8).collect();
    assert_eq!(decompress(compress(&data).unwrap()).unwrap(), data);
}

#[test]
fn test_zero_run_expands_far_past_input() {
    let data = vec![0u8; 1 << 20];
    let compressed = compress(&data).unwrap();
    assert!(compressed.len() < 4096);
    assert_eq!(decompress(&compressed).unwrap(), data);
}

#[test]
fn test_placeholder_grid_round_trip() {
    // 64 empty rows, the shape of every placeholder chart.
    let data = vec![0u8; 64 * 13 + 0x84];
    assert_eq!(decompress(compress(&data).unwrap()).unwrap(), data);
}
