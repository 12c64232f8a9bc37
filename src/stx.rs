//! The STX (`STF4`) chart container.
//!
//! ```text
//! 0x000  magic "STF4"
//! 0x03C  title   [64] NUL-terminated
//! 0x07C  artist  [64]
//! 0x0BC  author  [64]
//! 0x0FC  u32 chart offsets [9]
//! 0x120  charts, each:
//!          +0x00 difficulty
//!          +0x04 compressed flag (always 1)
//!          +0x08 reserved [0xC4]
//!          +0xCC { u32 length, zlib block }* u32 0
//! ```

use crate::{
    binary::{read_cstr, read_u32, slice, write_cstr, write_u32, OutOfBounds, TextFieldError},
    compression::{self, CompressionError},
};
use std::{convert::TryFrom, io};
use thiserror::Error;
use tracing::{debug, trace};

mod block;

pub use block::{Block, DivisionSet, Note, NOTES_PER_ROW};

/// Chart slots in every STX file, one per difficulty tier.
pub const CHART_SLOTS: usize = 9;

/// Longest title, artist or author that fits its field.
pub const MAX_TEXT_LEN: usize = TEXT_FIELD_SIZE - 1;

const MAGIC: &[u8; 4] = b"STF4";
const TITLE_OFFSET: usize = 0x3C;
const ARTIST_OFFSET: usize = 0x7C;
const AUTHOR_OFFSET: usize = 0xBC;
const TEXT_FIELD_SIZE: usize = 0x40;
const CHART_TABLE_OFFSET: usize = 0xFC;
const HEADER_SIZE: usize = CHART_TABLE_OFFSET + CHART_SLOTS * 4;

const COMPRESSED_FLAG: u32 = 1;
const RESERVED_GAP: usize = 0xC4;
const BLOCKS_OFFSET: usize = 0xCC;

const _: () = assert!(HEADER_SIZE == 0x120);
const _: () = assert!(8 + RESERVED_GAP == BLOCKS_OFFSET);

#[derive(Error, Debug)]
pub enum StxError {
    #[error("not a STX/STF4 file")]
    InvalidFormat,
    #[error("truncated STX data: {0}")]
    TruncatedData(#[from] OutOfBounds),
    #[error("compression error: {0}")]
    Compression(#[from] CompressionError),
    #[error("{field} is {len} bytes long, at most 63 fit")]
    FieldTooLong { field: &'static str, len: usize },
    #[error("{field} contains a NUL byte at {position}")]
    NulInField { field: &'static str, position: usize },
    #[error("note grid of {0} bytes is not a whole number of 13-column rows")]
    RaggedNotes(usize),
    #[error("chart data does not fit 32-bit offsets")]
    TooLarge,
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// A difficulty variant: its tier number and tempo blocks.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Chart {
    pub difficulty: u32,
    pub blocks: Vec<Block>,
}

/// A complete chart set as stored in one STX file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Step {
    pub title: String,
    pub artist: String,
    pub author: String,
    pub charts: [Chart; CHART_SLOTS],
}

/// Decodes an STX file.
pub fn decode(data: &[u8]) -> Result<Step, StxError> {
    if data.get(..MAGIC.len()) != Some(MAGIC.as_slice()) {
        return Err(StxError::InvalidFormat);
    }
    slice(data, 0, HEADER_SIZE)?;

    let mut step = Step {
        title: read_cstr(data, TITLE_OFFSET, TEXT_FIELD_SIZE)?,
        artist: read_cstr(data, ARTIST_OFFSET, TEXT_FIELD_SIZE)?,
        author: read_cstr(data, AUTHOR_OFFSET, TEXT_FIELD_SIZE)?,
        charts: Default::default(),
    };
    debug!(title = %step.title, artist = %step.artist, "decoding STX");

    for (slot, chart) in step.charts.iter_mut().enumerate() {
        let offset = read_u32(data, CHART_TABLE_OFFSET + slot * 4)? as usize;
        *chart = decode_chart(data, offset)?;
        trace!(
            "slot {slot} at {offset:#x}: difficulty {}, {} blocks",
            chart.difficulty,
            chart.blocks.len()
        );
    }

    Ok(step)
}

fn decode_chart(data: &[u8], offset: usize) -> Result<Chart, StxError> {
    slice(data, offset, BLOCKS_OFFSET)?;
    let difficulty = read_u32(data, offset)?;
    let flag = read_u32(data, offset.saturating_add(4))?;
    if flag != COMPRESSED_FLAG {
        debug!("chart at {offset:#x} has compressed flag {flag}");
    }

    let mut blocks = Vec::new();
    let mut cursor = offset.saturating_add(BLOCKS_OFFSET);
    while cursor < data.len() {
        let len = read_u32(data, cursor)? as usize;
        cursor += 4;
        if len == 0 {
            break;
        }

        let inflated = compression::decompress(slice(data, cursor, len)?)?;
        blocks.push(block::Block::decode(&inflated)?);
        cursor += len;
    }

    Ok(Chart { difficulty, blocks })
}

/// Encodes a chart set into the STX layout.
pub fn encode(step: &Step) -> Result<Vec<u8>, StxError> {
    let mut out = vec![0; HEADER_SIZE];
    out[..MAGIC.len()].copy_from_slice(MAGIC);

    let fields = [
        ("title", TITLE_OFFSET, &step.title),
        ("artist", ARTIST_OFFSET, &step.artist),
        ("author", AUTHOR_OFFSET, &step.author),
    ];
    for (field, offset, value) in fields {
        write_cstr(&mut out, offset, TEXT_FIELD_SIZE, value).map_err(|err| match err {
            TextFieldError::Overflow { len, .. } => StxError::FieldTooLong { field, len },
            TextFieldError::InteriorNul { position } => StxError::NulInField { field, position },
        })?;
    }

    let mut offsets = [0u32; CHART_SLOTS];
    for (chart, chart_offset) in step.charts.iter().zip(offsets.iter_mut()) {
        *chart_offset = u32::try_from(out.len()).map_err(|_| StxError::TooLarge)?;

        out.extend_from_slice(&chart.difficulty.to_le_bytes());
        out.extend_from_slice(&COMPRESSED_FLAG.to_le_bytes());
        out.resize(out.len() + RESERVED_GAP, 0);

        for block in &chart.blocks {
            let compressed = compression::compress(block.encode()?)?;
            let len = u32::try_from(compressed.len()).map_err(|_| StxError::TooLarge)?;
            out.extend_from_slice(&len.to_le_bytes());
            out.extend_from_slice(&compressed);
        }
        out.extend_from_slice(&0u32.to_le_bytes());
    }

    for (slot, offset) in offsets.into_iter().enumerate() {
        write_u32(&mut out, CHART_TABLE_OFFSET + slot * 4, offset);
    }

    debug!("encoded STX of {} bytes", out.len());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_step_layout() {
        let out = encode(&Step::default()).unwrap();

        // Each empty chart is a header plus the zero terminator.
        let chart_size = BLOCKS_OFFSET + 4;
        assert_eq!(out.len(), HEADER_SIZE + CHART_SLOTS * chart_size);
        assert_eq!(&out[..4], b"STF4");
        for slot in 0..CHART_SLOTS {
            let offset = read_u32(&out, CHART_TABLE_OFFSET + slot * 4).unwrap() as usize;
            assert_eq!(offset, HEADER_SIZE + slot * chart_size);
            assert_eq!(read_u32(&out, offset + 4).unwrap(), COMPRESSED_FLAG);
            assert!(out[offset + 8..offset + BLOCKS_OFFSET].iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn test_text_fields() {
        let step = Step {
            title: "Final Audition".into(),
            artist: "BanYa".into(),
            author: "Andamiro".into(),
            ..Default::default()
        };
        let out = encode(&step).unwrap();

        assert_eq!(&out[TITLE_OFFSET..TITLE_OFFSET + 15], b"Final Audition\0");
        assert_eq!(&out[ARTIST_OFFSET..ARTIST_OFFSET + 6], b"BanYa\0");
        assert_eq!(&out[AUTHOR_OFFSET..AUTHOR_OFFSET + 9], b"Andamiro\0");
    }

    #[test]
    fn test_chart_ends_at_end_of_buffer() {
        let mut out = encode(&Step::default()).unwrap();
        // Drop the last terminator; the final chart then simply runs into the end of the file.
        out.truncate(out.len() - 4);
        let step = decode(&out).unwrap();
        assert!(step.charts[CHART_SLOTS - 1].blocks.is_empty());
    }

    #[test]
    fn test_short_chart_header() {
        let mut out = encode(&Step::default()).unwrap();
        // The last chart keeps its difficulty and flag but loses most of the reserved gap.
        out.truncate(out.len() - 4 - 0x40);
        assert!(matches!(decode(&out), Err(StxError::TruncatedData(_))));
    }

    #[test]
    fn test_nul_in_text_field() {
        let step = Step {
            title: "x\0y".into(),
            ..Default::default()
        };
        assert!(matches!(
            encode(&step),
            Err(StxError::NulInField {
                field: "title",
                position: 1
            })
        ));
    }

    #[test]
    fn test_partial_length_prefix() {
        let mut out = encode(&Step::default()).unwrap();
        out.truncate(out.len() - 2);
        assert!(matches!(decode(&out), Err(StxError::TruncatedData(_))));
    }
}
