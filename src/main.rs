use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use piupsp::{
    convert::{self, ConvertOptions},
    respack::disk,
    ssc,
};
use tracing::{error, info, metadata::LevelFilter, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

#[derive(Subcommand)]
enum Command {
    /// Build an STX chart set from a StepMania .ssc file.
    MakeStx {
        /// Text chart to convert.
        input: PathBuf,
        /// Output file. Defaults to the input's file name with an .STX extension, in the
        /// current directory.
        output: Option<PathBuf>,
        /// Chart of the .ssc file to convert, counted from 0 in file order.
        #[clap(long, default_value_t = 8)]
        chart: usize,
        /// STX slot that receives the chart. The other slots get placeholders.
        #[clap(long, default_value_t = 1)]
        slot: usize,
    },

    /// Print the header and per-slot summary of an STX file.
    DumpStx {
        file: PathBuf,
    },

    /// Extract every file of a RESPACK archive.
    Unpack {
        archive: PathBuf,
        /// Directory to extract into. Defaults to the archive's file name without its
        /// extension, in the current directory.
        output: Option<PathBuf>,
    },

    /// Pack the files of a directory into a RESPACK archive.
    Pack {
        input: PathBuf,
        /// Output archive. Defaults to the directory name with a .DAT extension.
        output: Option<PathBuf>,
    },

    /// List the entries of a RESPACK archive.
    List {
        archive: PathBuf,
    },

    /// Check that every entry of a RESPACK archive inflates to its recorded size and CRCs.
    Verify {
        archive: PathBuf,
    },
}

#[derive(Parser)]
#[clap(version, about = "Pump It Up PSP chart and archive tools")]
struct Args {
    /// Tool to run.
    #[clap(subcommand)]
    command: Command,
}

fn fallible_main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.command {
        Command::MakeStx {
            input,
            output,
            chart,
            slot,
        } => {
            let output = output.unwrap_or_else(|| with_suffix(file_stem(&input), ".STX"));
            make_stx(&input, &output, chart, slot)?
        }
        Command::DumpStx { file } => dump_stx(&file)?,
        Command::Unpack { archive, output } => {
            let output = output.unwrap_or_else(|| file_stem(&archive));
            disk::unpack(&archive, &output)
                .with_context(|| format!("cannot unpack {}", archive.display()))?;
        }
        Command::Pack { input, output } => {
            let output = match output {
                Some(output) => output,
                None => default_archive_path(&input)?,
            };
            disk::pack(&input, &output)
                .with_context(|| format!("cannot pack {}", input.display()))?;
        }
        Command::List { archive } => list(&archive)?,
        Command::Verify { archive } => verify(&archive)?,
    }

    Ok(())
}

fn make_stx(input: &Path, output: &Path, chart: usize, slot: usize) -> anyhow::Result<()> {
    let song = ssc::parse_file(input).with_context(|| format!("cannot read {}", input.display()))?;
    let options = ConvertOptions {
        source_chart: chart,
        target_slot: slot,
        ..Default::default()
    };
    let step = convert::build_step(&song, &options)?;
    convert::write_stx(output, &step)
        .with_context(|| format!("cannot write {}", output.display()))?;
    Ok(())
}

fn dump_stx(file: &Path) -> anyhow::Result<()> {
    let step = convert::read_stx(file).with_context(|| format!("cannot read {}", file.display()))?;

    println!("title:  {}", step.title);
    println!("artist: {}", step.artist);
    println!("author: {}", step.author);
    for (slot, chart) in step.charts.iter().enumerate() {
        print!(
            "slot {slot}: difficulty {:>2}, {} blocks",
            chart.difficulty,
            chart.blocks.len()
        );
        if let Some(block) = chart.blocks.first() {
            print!(
                ", {} BPM {}/{}, speed {}",
                block.bpm, block.beat_per_measure, block.beat_split, block.speed
            );
        }
        let rows: usize = chart.blocks.iter().map(|block| block.row_count()).sum();
        println!(", {rows} rows");
    }
    Ok(())
}

fn list(archive: &Path) -> anyhow::Result<()> {
    let entries =
        disk::read_archive(archive).with_context(|| format!("cannot read {}", archive.display()))?;

    for entry in &entries {
        println!(
            "{:<32} {:>10} {:>10}  unk00={:#x} crc32_1={:#010x} unk08={:#x} crc32_2={:#010x}",
            entry.name,
            entry.length,
            entry.compressed.len(),
            entry.unk00,
            entry.crc32_1,
            entry.unk08,
            entry.crc32_2
        );
    }
    info!("{} entries", entries.len());
    Ok(())
}

fn verify(archive: &Path) -> anyhow::Result<()> {
    let reports =
        disk::verify(archive).with_context(|| format!("cannot read {}", archive.display()))?;

    let mut failed = 0;
    for report in &reports {
        if report.is_ok() {
            println!("ok    {}", report.name);
            continue;
        }
        failed += 1;
        println!("FAIL  {}", report.name);
        for problem in &report.problems {
            println!("      {problem}");
        }
    }

    if failed > 0 {
        bail!("{failed} of {} entries failed verification", reports.len());
    }
    info!("all {} entries verified", reports.len());
    Ok(())
}

fn file_stem(path: &Path) -> PathBuf {
    path.file_stem().map(PathBuf::from).unwrap_or_default()
}

fn with_suffix(path: PathBuf, suffix: &str) -> PathBuf {
    let mut path = path.into_os_string();
    path.push(suffix);
    PathBuf::from(path)
}

fn default_archive_path(input: &Path) -> anyhow::Result<PathBuf> {
    let dir = input
        .canonicalize()
        .with_context(|| format!("cannot resolve {}", input.display()))?;
    let Some(name) = dir.file_name() else {
        bail!("cannot derive an archive name from {}", input.display());
    };
    Ok(with_suffix(PathBuf::from(name), ".DAT"))
}

fn main() -> ExitCode {
    let subscriber = tracing_subscriber::registry()
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer().without_time());
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        warn!("cannot set default tracing subscriber");
    }

    match fallible_main() {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:?}");
            ExitCode::FAILURE
        }
    }
}
