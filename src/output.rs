use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};
use tracing::debug;

/// Writes `contents` to a sibling temporary file and renames it over `path`.
///
/// The destination is only replaced once the whole file is on disk; on failure the temporary
/// file is removed and any existing destination is left as it was.
pub fn write_atomic<P: AsRef<Path>>(path: P, contents: &[u8]) -> io::Result<()> {
    let path = path.as_ref();
    let temp = temp_path(path);

    let result = fs::File::create(&temp)
        .and_then(|mut file| {
            file.write_all(contents)?;
            file.sync_all()
        })
        .and_then(|_| fs::rename(&temp, path));

    if result.is_err() {
        let _ = fs::remove_file(&temp);
    } else {
        debug!("wrote {} bytes to {}", contents.len(), path.display());
    }
    result
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
