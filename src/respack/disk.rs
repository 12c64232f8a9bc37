use super::{decode, encode, Entry, PackEntry, RespackError};
use crate::{compression::CompressionError, output::write_atomic};
use memmap2::Mmap;
use std::{fs, fs::File, path::Path};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Reads every entry of the archive at `path`.
pub fn read_archive<P: AsRef<Path>>(path: P) -> Result<Vec<Entry>, RespackError> {
    let file = File::open(path.as_ref())?;
    if file.metadata()?.len() == 0 {
        return decode(&[]);
    }

    // The map is private to this call and dropped before returning.
    let data = unsafe { Mmap::map(&file)? };
    decode(&data)
}

/// Extracts every entry of `archive` into `out_dir`, decompressing as it goes.
///
/// Returns the number of files written.
pub fn unpack<P: AsRef<Path>, Q: AsRef<Path>>(
    archive: P,
    out_dir: Q,
) -> Result<usize, RespackError> {
    let out_dir = out_dir.as_ref();
    let entries = read_archive(archive)?;

    fs::create_dir_all(out_dir)?;
    for entry in &entries {
        let name = checked_name(&entry.name)?;
        let contents = entry.decompress()?;
        if contents.len() != entry.length as usize {
            warn!(
                "{name}: index says {} bytes, inflated to {}",
                entry.length,
                contents.len()
            );
        }
        fs::write(out_dir.join(name), &contents)?;
        debug!("extracted {name} ({} bytes)", contents.len());
    }

    info!("extracted {} files to {}", entries.len(), out_dir.display());
    Ok(entries.len())
}

/// Packs the regular files directly inside `in_dir`, sorted by name, into `out_file`.
///
/// Returns the number of files packed.
pub fn pack<P: AsRef<Path>, Q: AsRef<Path>>(
    in_dir: P,
    out_file: Q,
) -> Result<usize, RespackError> {
    let mut entries = Vec::new();
    for dir_entry in WalkDir::new(in_dir.as_ref())
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let dir_entry = dir_entry?;
        if !dir_entry.file_type().is_file() {
            debug!("skipping {}", dir_entry.path().display());
            continue;
        }

        let name = dir_entry.file_name().to_str().ok_or_else(|| {
            RespackError::UnsafeName(dir_entry.file_name().to_string_lossy().into_owned())
        })?;
        let contents = fs::read(dir_entry.path())?;
        debug!("packing {name} ({} bytes)", contents.len());
        entries.push(PackEntry::new(name, contents));
    }

    let archive = encode(&entries)?;
    write_atomic(out_file.as_ref(), &archive)?;

    info!(
        "packed {} files into {} ({} bytes)",
        entries.len(),
        out_file.as_ref().display(),
        archive.len()
    );
    Ok(entries.len())
}

/// Rejects entry names that would escape the output directory.
fn checked_name(name: &str) -> Result<&str, RespackError> {
    let unsafe_name = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', ':']);
    if unsafe_name {
        Err(RespackError::UnsafeName(name.to_owned()))
    } else {
        Ok(name)
    }
}

/// Something wrong with one entry, found by [`verify`].
#[derive(Error, Debug)]
pub enum Problem {
    #[error("payload does not inflate: {0}")]
    Corrupt(#[from] CompressionError),
    #[error("index says {expected} bytes, payload inflates to {actual}")]
    LengthMismatch { expected: u32, actual: usize },
    #[error("{field} is {stored:#010x}, contents hash to {contents:#010x}, payload to {payload:#010x}")]
    CrcMismatch {
        field: &'static str,
        stored: u32,
        contents: u32,
        payload: u32,
    },
}

#[derive(Debug)]
pub struct EntryReport {
    pub name: String,
    pub problems: Vec<Problem>,
}

impl EntryReport {
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Checks every entry of `archive` without writing anything.
///
/// Each payload must inflate to its recorded length. CRC fields are opaque to the codec; a
/// non-zero one is reported only if it matches the CRC-32 of neither the contents nor the
/// compressed payload.
pub fn verify<P: AsRef<Path>>(archive: P) -> Result<Vec<EntryReport>, RespackError> {
    let entries = read_archive(archive)?;
    Ok(entries.iter().map(verify_entry).collect())
}

pub(crate) fn verify_entry(entry: &Entry) -> EntryReport {
    let mut problems = Vec::new();

    match entry.decompress() {
        Ok(contents) => {
            if contents.len() != entry.length as usize {
                problems.push(Problem::LengthMismatch {
                    expected: entry.length,
                    actual: contents.len(),
                });
            }

            let contents_crc = crc32fast::hash(&contents);
            let payload_crc = crc32fast::hash(&entry.compressed);
            for (field, stored) in [("crc32_1", entry.crc32_1), ("crc32_2", entry.crc32_2)] {
                if stored != 0 && stored != contents_crc && stored != payload_crc {
                    problems.push(Problem::CrcMismatch {
                        field,
                        stored,
                        contents: contents_crc,
                        payload: payload_crc,
                    });
                }
            }
        }
        Err(err) => problems.push(Problem::Corrupt(err)),
    }

    EntryReport {
        name: entry.name.clone(),
        problems,
    }
}
