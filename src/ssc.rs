//! Reader for StepMania `.ssc` charts.
//!
//! Only what an STX chart can carry is read: song tags, the display tempo, time signatures,
//! chart meters and note grids. Each `#NOTEDATA` section becomes one [`Chart`] with a single
//! block.

use crate::stx::{Block, Chart, Note, NOTES_PER_ROW};
use std::{fs, io, path::Path, str::Lines};
use thiserror::Error;
use tracing::{debug, trace};

/// Scroll speed given to every parsed block.
pub const DEFAULT_SPEED: u32 = 1000;

#[derive(Error, Debug)]
pub enum SscError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("line {line}: invalid display BPM '{value}'")]
    InvalidDisplayBpm { line: usize, value: String },
    #[error("line {line}: invalid time signature '{value}'")]
    InvalidTimeSignature { line: usize, value: String },
    #[error("line {line}: invalid meter '{value}'")]
    InvalidMeter { line: usize, value: String },
}

/// A song as written in the text format: any number of charts, in file order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Song {
    pub title: String,
    pub artist: String,
    pub author: String,
    pub charts: Vec<Chart>,
}

#[derive(Clone, Copy, Debug, Default)]
struct Timing {
    bpm: f32,
    beat_per_measure: u32,
    beat_split: u32,
}

/// Numbered lines, shared between the song and chart readers.
struct Reader<'a> {
    lines: Lines<'a>,
    number: usize,
    pushed_back: Option<&'a str>,
}

impl<'a> Reader<'a> {
    fn new(text: &'a str) -> Reader<'a> {
        Reader {
            lines: text.lines(),
            number: 0,
            pushed_back: None,
        }
    }

    fn next_line(&mut self) -> Option<&'a str> {
        let line = self.pushed_back.take().or_else(|| self.lines.next())?;
        self.number += 1;
        Some(line)
    }

    /// Hands `line` back so the next call to [`next_line`](Self::next_line) returns it again.
    fn unread(&mut self, line: &'a str) {
        self.pushed_back = Some(line);
        self.number -= 1;
    }
}

pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Song, SscError> {
    let text = fs::read_to_string(path.as_ref())?;
    debug!("parsing {}", path.as_ref().display());
    parse(&text)
}

pub fn parse(text: &str) -> Result<Song, SscError> {
    let mut song = Song::default();
    let mut timing = Timing::default();
    let mut reader = Reader::new(text);

    while let Some(line) = reader.next_line() {
        let Some((key, value)) = tag(line) else {
            continue;
        };
        match key {
            "TITLE" => song.title = value.to_owned(),
            "ARTIST" => song.artist = value.to_owned(),
            "CREDIT" => song.author = value.to_owned(),
            "DISPLAYBPM" => {
                timing.bpm = parse_display_bpm(value).ok_or_else(|| SscError::InvalidDisplayBpm {
                    line: reader.number,
                    value: value.to_owned(),
                })?;
            }
            "TIMESIGNATURES" => {
                let (beat_per_measure, beat_split) = parse_time_signature(value, reader.number)?;
                timing.beat_per_measure = beat_per_measure;
                timing.beat_split = beat_split;
            }
            "NOTEDATA" => {
                let chart = parse_chart(&mut reader, timing)?;
                trace!(
                    "chart {} has difficulty {}",
                    song.charts.len(),
                    chart.difficulty
                );
                song.charts.push(chart);
            }
            _ => {}
        }
    }

    debug!("parsed '{}' with {} charts", song.title, song.charts.len());
    Ok(song)
}

fn parse_chart(reader: &mut Reader<'_>, timing: Timing) -> Result<Chart, SscError> {
    let mut chart = Chart::default();
    let mut block = Block {
        bpm: timing.bpm / 2.0,
        beat_per_measure: timing.beat_per_measure,
        beat_split: timing.beat_split,
        speed: DEFAULT_SPEED,
        ..Default::default()
    };

    while let Some(line) = reader.next_line() {
        match tag(line) {
            Some(("METER", value)) => {
                chart.difficulty = value.parse().map_err(|_| SscError::InvalidMeter {
                    line: reader.number,
                    value: value.to_owned(),
                })?;
            }
            Some(("TIMESIGNATURES", value)) => {
                let (beat_per_measure, beat_split) = parse_time_signature(value, reader.number)?;
                block.beat_per_measure = beat_per_measure;
                block.beat_split = beat_split;
            }
            Some(("NOTES", _)) => {
                block.notes = read_notes(reader);
                break;
            }
            Some(("NOTEDATA", _)) => {
                // The next chart starts before this one had any notes.
                reader.unread(line);
                break;
            }
            _ => {}
        }
    }

    chart.blocks.push(block);
    Ok(chart)
}

/// Reads grid rows up to the `;` that closes them.
///
/// A `2` opens a hold in its column and a `3` closes it; every other cell inside an open hold
/// becomes a hold body, so bodies only ever sit between a start and an end.
fn read_notes(reader: &mut Reader<'_>) -> Vec<u8> {
    let mut notes = Vec::new();
    let mut holding = [false; NOTES_PER_ROW];

    while let Some(line) = reader.next_line() {
        let line = line.trim();
        if line.starts_with(';') {
            break;
        }
        if line.is_empty() || line.starts_with(',') || line.starts_with("//") {
            continue;
        }

        let mut cells = line.bytes();
        for held in holding.iter_mut() {
            let note = match cells.next() {
                Some(b'1') => Note::Tap,
                Some(b'2') => {
                    *held = true;
                    Note::HoldStart
                }
                Some(b'3') => {
                    *held = false;
                    Note::HoldEnd
                }
                _ if *held => Note::Hold,
                _ => Note::Empty,
            };
            notes.push(note as u8);
        }
    }

    notes
}

/// Splits `#KEY:VALUE;` into its key and value. The value stops at the next `:` or `;`.
fn tag(line: &str) -> Option<(&str, &str)> {
    let body = line.trim().strip_prefix('#')?;
    match body.split_once(':') {
        Some((key, rest)) => {
            let value = rest.split([':', ';']).next().unwrap_or_default();
            Some((key.trim(), value.trim()))
        }
        None => Some((body.trim_end_matches(';').trim(), "")),
    }
}

fn parse_display_bpm(value: &str) -> Option<f32> {
    value.parse::<f32>().ok().filter(|bpm| *bpm > 0.0)
}

/// Parses the first `beat=numerator=denominator` entry of a time signature list.
fn parse_time_signature(value: &str, line: usize) -> Result<(u32, u32), SscError> {
    let invalid = || SscError::InvalidTimeSignature {
        line,
        value: value.to_owned(),
    };

    let first = value.split(',').next().unwrap_or_default();
    let parts: Vec<&str> = first.split('=').map(str::trim).collect();
    let [_, numerator, denominator] = parts[..] else {
        return Err(invalid());
    };

    let positive = |text: &str| text.parse::<u32>().ok().filter(|n| *n > 0);
    match (positive(numerator), positive(denominator)) {
        (Some(numerator), Some(denominator)) => Ok((numerator, denominator)),
        _ => Err(invalid()),
    }
}
