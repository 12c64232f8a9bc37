use super::StxError;
use crate::binary::{read_f32, read_u32, slice, write_f32, write_u32, OutOfBounds};
use std::convert::TryFrom;
use tracing::debug;

/// Columns in one row of a note grid.
pub const NOTES_PER_ROW: usize = 13;

const BPM_OFFSET: usize = 0x00;
const BEAT_PER_MEASURE_OFFSET: usize = 0x04;
const BEAT_SPLIT_OFFSET: usize = 0x08;
const DELAY_OFFSET: usize = 0x0C;
const DIVISION_SETS_OFFSET: usize = 0x10;
const DIVISION_SET_STRIDE: usize = 0x08;
const DIVISION_SET_COUNT: usize = 10;
const SPEED_OFFSET: usize = 0x60;
const ROW_COUNT_OFFSET: usize = 0x80;
const NOTES_OFFSET: usize = 0x84;

/// A note grid cell code. Blocks store raw codes; this is for callers that want to interpret them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Note {
    Empty = 0,
    Tap = 1,
    G = 2,
    W = 3,
    A = 4,
    B = 5,
    C = 6,
    Unknown7 = 7,
    Unknown8 = 8,
    Unknown9 = 9,
    HoldStart = 10,
    Hold = 11,
    HoldEnd = 12,
}

impl TryFrom<u8> for Note {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Ok(match code {
            0 => Self::Empty,
            1 => Self::Tap,
            2 => Self::G,
            3 => Self::W,
            4 => Self::A,
            5 => Self::B,
            6 => Self::C,
            7 => Self::Unknown7,
            8 => Self::Unknown8,
            9 => Self::Unknown9,
            10 => Self::HoldStart,
            11 => Self::Hold,
            12 => Self::HoldEnd,
            _ => return Err(code),
        })
    }
}

impl From<Note> for u8 {
    fn from(note: Note) -> Self {
        note as u8
    }
}

/// A pair of judgment counters.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct DivisionSet {
    pub first: u32,
    pub second: u32,
}

/// One tempo segment of a chart together with its note grid.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Block {
    pub bpm: f32,
    pub beat_per_measure: u32,
    pub beat_split: u32,
    pub delay: u32,
    pub perfect: DivisionSet,
    pub great: DivisionSet,
    pub good: DivisionSet,
    pub bad: DivisionSet,
    pub miss: DivisionSet,
    pub step_g: DivisionSet,
    pub step_w: DivisionSet,
    pub step_a: DivisionSet,
    pub step_b: DivisionSet,
    pub step_c: DivisionSet,
    pub speed: u32,
    /// Row-major cell codes, [`NOTES_PER_ROW`] per row.
    pub notes: Vec<u8>,
}

impl Block {
    pub fn row_count(&self) -> usize {
        self.notes.len() / NOTES_PER_ROW
    }

    pub fn rows(&self) -> std::slice::ChunksExact<'_, u8> {
        self.notes.chunks_exact(NOTES_PER_ROW)
    }

    fn division_sets(&self) -> [&DivisionSet; DIVISION_SET_COUNT] {
        [
            &self.perfect,
            &self.great,
            &self.good,
            &self.bad,
            &self.miss,
            &self.step_g,
            &self.step_w,
            &self.step_a,
            &self.step_b,
            &self.step_c,
        ]
    }

    /// Decodes an inflated block buffer. The stored row count decides how much of the grid is read.
    pub(crate) fn decode(buf: &[u8]) -> Result<Block, OutOfBounds> {
        let mut sets = [DivisionSet::default(); DIVISION_SET_COUNT];
        for (i, set) in sets.iter_mut().enumerate() {
            let offset = DIVISION_SETS_OFFSET + i * DIVISION_SET_STRIDE;
            set.first = read_u32(buf, offset)?;
            set.second = read_u32(buf, offset + 4)?;
        }
        let [perfect, great, good, bad, miss, step_g, step_w, step_a, step_b, step_c] = sets;

        let row_count = read_u32(buf, ROW_COUNT_OFFSET)? as usize;
        let notes_len = row_count.saturating_mul(NOTES_PER_ROW);
        let notes = slice(buf, NOTES_OFFSET, notes_len)?.to_vec();

        let trailing = buf.len() - NOTES_OFFSET - notes_len;
        if trailing > 0 {
            debug!("ignoring {trailing} bytes after a grid of {row_count} rows");
        }

        Ok(Block {
            bpm: read_f32(buf, BPM_OFFSET)?,
            beat_per_measure: read_u32(buf, BEAT_PER_MEASURE_OFFSET)?,
            beat_split: read_u32(buf, BEAT_SPLIT_OFFSET)?,
            delay: read_u32(buf, DELAY_OFFSET)?,
            perfect,
            great,
            good,
            bad,
            miss,
            step_g,
            step_w,
            step_a,
            step_b,
            step_c,
            speed: read_u32(buf, SPEED_OFFSET)?,
            notes,
        })
    }

    /// Lays the block out as an uncompressed buffer, deriving the row count from the grid.
    pub(crate) fn encode(&self) -> Result<Vec<u8>, StxError> {
        if self.notes.len() % NOTES_PER_ROW != 0 {
            return Err(StxError::RaggedNotes(self.notes.len()));
        }
        let row_count = u32::try_from(self.row_count()).map_err(|_| StxError::TooLarge)?;

        let mut buf = vec![0; NOTES_OFFSET + self.notes.len()];
        write_f32(&mut buf, BPM_OFFSET, self.bpm);
        write_u32(&mut buf, BEAT_PER_MEASURE_OFFSET, self.beat_per_measure);
        write_u32(&mut buf, BEAT_SPLIT_OFFSET, self.beat_split);
        write_u32(&mut buf, DELAY_OFFSET, self.delay);
        for (i, set) in self.division_sets().into_iter().enumerate() {
            let offset = DIVISION_SETS_OFFSET + i * DIVISION_SET_STRIDE;
            write_u32(&mut buf, offset, set.first);
            write_u32(&mut buf, offset + 4, set.second);
        }
        write_u32(&mut buf, SPEED_OFFSET, self.speed);
        write_u32(&mut buf, ROW_COUNT_OFFSET, row_count);
        buf[NOTES_OFFSET..].copy_from_slice(&self.notes);

        Ok(buf)
    }
}
