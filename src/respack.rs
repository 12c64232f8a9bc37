//! The RESPACK resource archive.
//!
//! ```text
//! 0x00  magic "RESPACK\x1A"
//! 0x08  u32 0
//! 0x0C  u32 entry count
//! 0x10  u32 0, u32 0
//! 0x18  index, one 0x12C-byte record per entry, XORed with the keystream
//!       then per entry: 0x118-byte metadata block, zlib payload
//! ```
//!
//! An index record is the metadata block followed by 16 reserved bytes and a `u32` offset of
//! the entry's metadata block, relative to the end of the index.

use crate::{
    binary::{read_u32, slice, write_u32, OutOfBounds},
    compression::{self, CompressionError},
    keystream,
};
use std::{convert::TryFrom, io};
use thiserror::Error;
use tracing::{debug, trace};

pub mod disk;
mod entry;

pub use entry::{Entry, PackEntry};
use entry::EntryRecord;

/// Size of one index record.
pub const RECORD_SIZE: usize = 0x12C;
/// Size of the metadata block in front of every payload.
pub const METADATA_SIZE: usize = 0x118;

const MAGIC: &[u8; 8] = b"RESPACK\x1A";
const COUNT_OFFSET: usize = 0x0C;
const HEADER_SIZE: usize = 0x18;
const DATA_OFFSET_FIELD: usize = 0x128;

#[derive(Error, Debug)]
pub enum RespackError {
    #[error("not a PIU RESPACK file")]
    InvalidFormat,
    #[error("truncated RESPACK data: {0}")]
    TruncatedData(#[from] OutOfBounds),
    #[error("compression error: {0}")]
    Compression(#[from] CompressionError),
    #[error("file name '{0}' is too long (256 byte limit)")]
    NameTooLong(String),
    #[error("entry name '{0}' cannot be used as a file name")]
    UnsafeName(String),
    #[error("archive contents do not fit 32-bit offsets")]
    TooLarge,
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Reads every entry of an archive. Payloads are sliced out still compressed.
pub fn decode(data: &[u8]) -> Result<Vec<Entry>, RespackError> {
    if data.get(..MAGIC.len()) != Some(MAGIC.as_slice()) {
        return Err(RespackError::InvalidFormat);
    }

    let count = read_u32(data, COUNT_OFFSET)? as usize;
    let index_len = count.saturating_mul(RECORD_SIZE);
    let mut index = slice(data, HEADER_SIZE, index_len)?.to_vec();
    keystream::apply(&mut index, count);
    let index_end = HEADER_SIZE + index_len;
    debug!("reading {count} entries, data starts at {index_end:#x}");

    index
        .chunks_exact(RECORD_SIZE)
        .map(|record| -> Result<Entry, RespackError> {
            let metadata = EntryRecord::read(record)?;
            let relative = read_u32(record, DATA_OFFSET_FIELD)? as usize;
            let position = relative
                .saturating_add(index_end)
                .saturating_add(METADATA_SIZE);
            let compressed = slice(data, position, metadata.compressed_length as usize)?;
            trace!(
                "entry {:?}: {} bytes at {position:#x}, {} uncompressed",
                metadata.name,
                compressed.len(),
                metadata.length
            );
            Ok(metadata.into_entry(compressed.to_vec()))
        })
        .collect()
}

/// Compresses and packs entries into an archive, in the given order.
pub fn encode(entries: &[PackEntry]) -> Result<Vec<u8>, RespackError> {
    let count = u32::try_from(entries.len()).map_err(|_| RespackError::TooLarge)?;
    if let Some(entry) = entries.iter().find(|entry| entry.name.len() >= 0x100) {
        return Err(RespackError::NameTooLong(entry.name.clone()));
    }

    let packed = entries
        .iter()
        .map(|entry| -> Result<_, RespackError> {
            let payload = compression::compress(&entry.contents)?;
            Ok((entry.record(payload.len())?, payload))
        })
        .collect::<Result<Vec<_>, RespackError>>()?;

    let mut index = vec![0; entries.len() * RECORD_SIZE];
    let mut relative = 0u32;
    for ((record, _), slot) in packed.iter().zip(index.chunks_exact_mut(RECORD_SIZE)) {
        record.write(slot)?;
        write_u32(slot, DATA_OFFSET_FIELD, relative);
        relative = relative
            .checked_add(record.compressed_length)
            .and_then(|offset| offset.checked_add(METADATA_SIZE as u32))
            .ok_or(RespackError::TooLarge)?;
    }
    keystream::apply(&mut index, entries.len());

    let mut out = Vec::with_capacity(HEADER_SIZE + index.len() + relative as usize);
    out.extend_from_slice(MAGIC);
    for word in [0, count, 0, 0] {
        out.extend_from_slice(&u32::to_le_bytes(word));
    }
    out.extend_from_slice(&index);

    let mut metadata = [0; METADATA_SIZE];
    for (record, payload) in &packed {
        record.write(&mut metadata)?;
        out.extend_from_slice(&metadata);
        out.extend_from_slice(payload);
    }

    debug!("packed {count} entries into {} bytes", out.len());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_archive() {
        let out = encode(&[]).unwrap();
        assert_eq!(out.len(), HEADER_SIZE);
        assert_eq!(&out[..8], b"RESPACK\x1A");
        assert!(decode(&out).unwrap().is_empty());
    }

    #[test]
    fn test_header_words() {
        let entries = vec![PackEntry::new("A", vec![1]), PackEntry::new("B", vec![2])];
        let out = encode(&entries).unwrap();
        assert_eq!(read_u32(&out, 0x08).unwrap(), 0);
        assert_eq!(read_u32(&out, 0x0C).unwrap(), 2);
        assert_eq!(read_u32(&out, 0x10).unwrap(), 0);
        assert_eq!(read_u32(&out, 0x14).unwrap(), 0);
    }

    #[test]
    fn test_index_is_obfuscated() {
        let out = encode(&[PackEntry::new("A", vec![1, 2, 3])]).unwrap();
        // 'A' ^ 0x5C, then the terminator XORed with the second key byte.
        assert_eq!(out[HEADER_SIZE], b'A' ^ 0x5C);
        assert_eq!(out[HEADER_SIZE + 1], 0x1D);
    }

    #[test]
    fn test_metadata_block_is_plain() {
        let out = encode(&[PackEntry::new("A", vec![1, 2, 3])]).unwrap();
        let metadata = HEADER_SIZE + RECORD_SIZE;
        assert_eq!(&out[metadata..metadata + 2], b"A\0");
        assert_eq!(read_u32(&out, metadata + 0x10C).unwrap(), 3);
    }

    #[test]
    fn test_relative_offsets() {
        let entries = vec![
            PackEntry::new("first", vec![7; 100]),
            PackEntry::new("second", vec![8; 10]),
        ];
        let out = encode(&entries).unwrap();

        let mut index = out[HEADER_SIZE..HEADER_SIZE + 2 * RECORD_SIZE].to_vec();
        keystream::apply(&mut index, 2);
        let first_len = read_u32(&index, 0x110).unwrap();
        assert_eq!(read_u32(&index, DATA_OFFSET_FIELD).unwrap(), 0);
        assert_eq!(
            read_u32(&index, RECORD_SIZE + DATA_OFFSET_FIELD).unwrap(),
            first_len + METADATA_SIZE as u32
        );
    }

    #[test]
    fn test_decode_does_not_touch_input() {
        let out = encode(&[PackEntry::new("A", vec![1, 2, 3])]).unwrap();
        let copy = out.clone();
        decode(&out).unwrap();
        assert_eq!(out, copy);
    }
}
