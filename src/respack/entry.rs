use super::{RespackError, METADATA_SIZE};
use crate::{
    binary::{read_cstr, read_u32, slice, write_cstr, write_u32, OutOfBounds, TextFieldError},
    compression::{self, CompressionError},
};
use std::convert::TryFrom;

const NAME_SIZE: usize = 0x100;
const UNK00_OFFSET: usize = 0x100;
const CRC32_1_OFFSET: usize = 0x104;
const UNK08_OFFSET: usize = 0x108;
const LENGTH_OFFSET: usize = 0x10C;
const COMPRESSED_LENGTH_OFFSET: usize = 0x110;
const CRC32_2_OFFSET: usize = 0x114;

/// A file stored in a RESPACK archive, as read. The payload is still compressed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub unk00: u32,
    pub crc32_1: u32,
    pub unk08: u32,
    /// Uncompressed size.
    pub length: u32,
    pub crc32_2: u32,
    pub compressed: Vec<u8>,
}

impl Entry {
    pub fn decompress(&self) -> Result<Vec<u8>, CompressionError> {
        compression::decompress(&self.compressed)
    }
}

/// A file to be packed into a RESPACK archive, with its raw contents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackEntry {
    pub name: String,
    pub unk00: u32,
    pub crc32_1: u32,
    pub unk08: u32,
    pub crc32_2: u32,
    pub contents: Vec<u8>,
}

impl PackEntry {
    /// A new entry with the tags the game's own archives use for plain files.
    pub fn new(name: impl Into<String>, contents: Vec<u8>) -> PackEntry {
        PackEntry {
            name: name.into(),
            unk00: 0,
            crc32_1: 0,
            unk08: 1,
            crc32_2: 0,
            contents,
        }
    }

    /// Builds the record describing this entry once its payload is `compressed_length` bytes.
    pub(crate) fn record(&self, compressed_length: usize) -> Result<EntryRecord, RespackError> {
        Ok(EntryRecord {
            name: self.name.clone(),
            unk00: self.unk00,
            crc32_1: self.crc32_1,
            unk08: self.unk08,
            length: u32::try_from(self.contents.len()).map_err(|_| RespackError::TooLarge)?,
            compressed_length: u32::try_from(compressed_length)
                .map_err(|_| RespackError::TooLarge)?,
            crc32_2: self.crc32_2,
        })
    }
}

/// Inflates a read entry so it can be packed again with its tags intact.
impl TryFrom<&Entry> for PackEntry {
    type Error = CompressionError;

    fn try_from(entry: &Entry) -> Result<Self, Self::Error> {
        Ok(PackEntry {
            name: entry.name.clone(),
            unk00: entry.unk00,
            crc32_1: entry.crc32_1,
            unk08: entry.unk08,
            crc32_2: entry.crc32_2,
            contents: entry.decompress()?,
        })
    }
}

/// The metadata fields shared by an index record and the block preceding each payload.
///
/// Both places use the same layout, so the same [`read`](Self::read) and [`write`](Self::write)
/// serve the index and the data region.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct EntryRecord {
    pub name: String,
    pub unk00: u32,
    pub crc32_1: u32,
    pub unk08: u32,
    pub length: u32,
    pub compressed_length: u32,
    pub crc32_2: u32,
}

impl EntryRecord {
    pub fn read(buf: &[u8]) -> Result<EntryRecord, OutOfBounds> {
        slice(buf, 0, METADATA_SIZE)?;

        Ok(EntryRecord {
            name: read_cstr(buf, 0, NAME_SIZE)?,
            unk00: read_u32(buf, UNK00_OFFSET)?,
            crc32_1: read_u32(buf, CRC32_1_OFFSET)?,
            unk08: read_u32(buf, UNK08_OFFSET)?,
            length: read_u32(buf, LENGTH_OFFSET)?,
            compressed_length: read_u32(buf, COMPRESSED_LENGTH_OFFSET)?,
            crc32_2: read_u32(buf, CRC32_2_OFFSET)?,
        })
    }

    /// Writes the first [`METADATA_SIZE`] bytes of `buf`, which must be at least that long.
    pub fn write(&self, buf: &mut [u8]) -> Result<(), RespackError> {
        write_cstr(buf, 0, NAME_SIZE, &self.name).map_err(|err| match err {
            TextFieldError::Overflow { .. } => RespackError::NameTooLong(self.name.clone()),
            TextFieldError::InteriorNul { .. } => RespackError::UnsafeName(self.name.clone()),
        })?;
        write_u32(buf, UNK00_OFFSET, self.unk00);
        write_u32(buf, CRC32_1_OFFSET, self.crc32_1);
        write_u32(buf, UNK08_OFFSET, self.unk08);
        write_u32(buf, LENGTH_OFFSET, self.length);
        write_u32(buf, COMPRESSED_LENGTH_OFFSET, self.compressed_length);
        write_u32(buf, CRC32_2_OFFSET, self.crc32_2);
        Ok(())
    }

    pub fn into_entry(self, compressed: Vec<u8>) -> Entry {
        Entry {
            name: self.name,
            unk00: self.unk00,
            crc32_1: self.crc32_1,
            unk08: self.unk08,
            length: self.length,
            crc32_2: self.crc32_2,
            compressed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> EntryRecord {
        EntryRecord {
            name: "BGM_01.ogg".into(),
            unk00: 0x11,
            crc32_1: 0x2222_2222,
            unk08: 1,
            length: 0x4000,
            compressed_length: 0x1234,
            crc32_2: 0x3333_3333,
        }
    }

    #[test]
    fn test_record_layout() {
        let mut buf = vec![0xFF; METADATA_SIZE];
        record().write(&mut buf).unwrap();

        assert_eq!(&buf[..11], b"BGM_01.ogg\0");
        assert!(buf[11..NAME_SIZE].iter().all(|&b| b == 0));
        assert_eq!(&buf[0x100..0x104], &0x11u32.to_le_bytes());
        assert_eq!(&buf[0x108..0x10C], &1u32.to_le_bytes());
        assert_eq!(&buf[0x10C..0x110], &0x4000u32.to_le_bytes());
        assert_eq!(&buf[0x110..0x114], &0x1234u32.to_le_bytes());
        assert_eq!(&buf[0x114..0x118], &0x3333_3333u32.to_le_bytes());
        assert_eq!(EntryRecord::read(&buf).unwrap(), record());
    }

    #[test]
    fn test_name_limit() {
        let mut buf = vec![0; METADATA_SIZE];
        let mut record = record();

        record.name = "a".repeat(255);
        assert!(record.write(&mut buf).is_ok());

        record.name = "a".repeat(256);
        assert!(matches!(
            record.write(&mut buf),
            Err(RespackError::NameTooLong(_))
        ));
    }

    #[test]
    fn test_name_with_nul() {
        let mut buf = vec![0; METADATA_SIZE];
        let mut record = record();
        record.name = "a\0b".into();
        assert!(matches!(
            record.write(&mut buf),
            Err(RespackError::UnsafeName(name)) if name == "a\0b"
        ));
    }

    #[test]
    fn test_read_short_record() {
        assert!(EntryRecord::read(&[0; METADATA_SIZE - 1]).is_err());
    }

    #[test]
    fn test_pack_entry_from_entry() {
        let contents = b"step data".to_vec();
        let entry = Entry {
            name: "X.STX".into(),
            unk00: 5,
            crc32_1: 6,
            unk08: 7,
            length: contents.len() as u32,
            crc32_2: 8,
            compressed: compression::compress(&contents).unwrap(),
        };

        let packed = PackEntry::try_from(&entry).unwrap();
        assert_eq!((packed.unk00, packed.crc32_1, packed.unk08, packed.crc32_2), (5, 6, 7, 8));
        assert_eq!(packed.contents, contents);
    }
}
