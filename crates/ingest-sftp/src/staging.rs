//! Staged local writes
//!
//! Downloads are streamed into a uniquely named hidden file next to the
//! destination and renamed over it only after the copy finished, so an
//! interrupted transfer never leaves a truncated file under the final name.
//! The staging name is generated by `tempfile`, so it can never coincide with
//! another download's destination (e.g. a remote `a.txt.part`).

use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use tempfile::{Builder, NamedTempFile};
use tracing::debug;

/// Prefix of in-flight staging files
pub const STAGING_PREFIX: &str = ".sftp-ingest-";

/// Streams `reader` into `destination`, replacing any existing file
///
/// Returns the number of bytes written. On error the staging file is
/// removed and `destination` is left untouched.
pub fn copy_to_staged<R: Read>(reader: &mut R, destination: &Path) -> io::Result<u64> {
    let dir = destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut staged = Builder::new()
        .prefix(STAGING_PREFIX)
        .suffix(".tmp")
        .tempfile_in(dir)?;
    debug!(path = %staged.path().display(), "writing staging file");

    // Dropping `staged` on any early return deletes it.
    let bytes = write_staging(reader, &mut staged)?;
    staged.persist(destination).map_err(|e| e.error)?;

    Ok(bytes)
}

fn write_staging<R: Read>(reader: &mut R, staged: &mut NamedTempFile) -> io::Result<u64> {
    let mut writer = BufWriter::new(staged.as_file_mut());
    let bytes = io::copy(reader, &mut writer)?;
    writer.flush()?;
    drop(writer);
    staged.as_file().sync_all()?;

    Ok(bytes)
}
