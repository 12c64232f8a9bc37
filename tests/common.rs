#![allow(dead_code)]

use memmap2::Mmap;
use std::{fs::File, path::Path};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

pub fn setup() {
    // a builder for `FmtSubscriber`.
    let subscriber = FmtSubscriber::builder()
        // all spans/events with a level higher than TRACE (e.g, debug, info, warn, etc.)
        // will be written to stdout.
        .with_max_level(Level::TRACE)
        .with_test_writer()
        .finish();

    tracing::subscriber::set_global_default(subscriber).ok();
}

/// Maps `tests/data/<dir>/<name>` and hands its bytes to `f`.
pub fn read_test<P, F>(dir: &str, p: P, f: F)
where
    P: AsRef<Path>,
    F: FnOnce(&[u8]),
{
    setup();
    let path = Path::new("tests/data").join(dir).join(p);
    let data = unsafe { Mmap::map(&File::open(path).unwrap()) }.unwrap();
    f(&data)
}

pub fn data_path(dir: &str, name: &str) -> std::path::PathBuf {
    Path::new("tests/data").join(dir).join(name)
}
