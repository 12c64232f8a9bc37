//! Turns a parsed text chart into a nine-slot STX chart set.

use crate::{
    output::write_atomic,
    ssc::Song,
    stx::{self, Block, Chart, Step, StxError, CHART_SLOTS, NOTES_PER_ROW},
};
use memmap2::Mmap;
use std::{fs::File, io, path::Path};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("song has {available} charts, chart {index} does not exist")]
    MissingChart { index: usize, available: usize },
    #[error("chart {0} has no blocks to take the tempo from")]
    EmptyChart(usize),
    #[error("slot {0} is out of range, an STX file has 9 slots")]
    InvalidSlot(usize),
    #[error("STX error: {0}")]
    Stx(#[from] StxError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Which chart ends up where.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Index of the chart taken from the song, in file order.
    pub source_chart: usize,
    /// STX slot that receives it.
    pub target_slot: usize,
    /// Empty rows in each placeholder chart.
    pub placeholder_rows: usize,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        ConvertOptions {
            source_chart: 8,
            target_slot: 1,
            placeholder_rows: 64,
        }
    }
}

/// Builds the chart set for `song`.
///
/// Every slot other than `target_slot` holds a placeholder: difficulty 0 and a single block of
/// empty rows that keeps the tempo, time signature and speed of the song's first chart.
pub fn build_step(song: &Song, options: &ConvertOptions) -> Result<Step, ConvertError> {
    if options.target_slot >= CHART_SLOTS {
        return Err(ConvertError::InvalidSlot(options.target_slot));
    }

    let source = song
        .charts
        .get(options.source_chart)
        .ok_or(ConvertError::MissingChart {
            index: options.source_chart,
            available: song.charts.len(),
        })?;
    let tempo = song
        .charts
        .first()
        .and_then(|chart| chart.blocks.first())
        .ok_or(ConvertError::EmptyChart(0))?;

    let placeholder = Chart {
        difficulty: 0,
        blocks: vec![Block {
            bpm: tempo.bpm,
            beat_per_measure: tempo.beat_per_measure,
            beat_split: tempo.beat_split,
            speed: tempo.speed,
            notes: vec![0; options.placeholder_rows * NOTES_PER_ROW],
            ..Default::default()
        }],
    };

    let mut charts: [Chart; CHART_SLOTS] = Default::default();
    for (slot, chart) in charts.iter_mut().enumerate() {
        *chart = if slot == options.target_slot {
            source.clone()
        } else {
            placeholder.clone()
        };
    }
    debug!(
        "chart {} (difficulty {}) goes to slot {}",
        options.source_chart, source.difficulty, options.target_slot
    );

    Ok(Step {
        title: song.title.clone(),
        artist: song.artist.clone(),
        author: song.author.clone(),
        charts,
    })
}

/// Encodes `step` and writes it to `path`, replacing any existing file only once the new one
/// is complete.
pub fn write_stx<P: AsRef<Path>>(path: P, step: &Step) -> Result<(), ConvertError> {
    let data = stx::encode(step)?;
    write_atomic(path.as_ref(), &data)?;
    info!("wrote {} ({} bytes)", path.as_ref().display(), data.len());
    Ok(())
}

pub fn read_stx<P: AsRef<Path>>(path: P) -> Result<Step, ConvertError> {
    let file = File::open(path.as_ref())?;
    if file.metadata()?.len() == 0 {
        return Ok(stx::decode(&[])?);
    }

    let data = unsafe { Mmap::map(&file)? };
    Ok(stx::decode(&data)?)
}
