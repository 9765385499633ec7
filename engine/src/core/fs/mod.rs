//! Filesystem utilities.
//!
//! Caption tracks, sessions and settings are rewritten in place while a
//! player or another cuekit process may be reading them. Writes are staged
//! next to the destination and swapped in with renames, so a reader sees
//! either the old file or the new one.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::core::CoreResult;

const STAGED_SUFFIX: &str = "cuekit-staged";
const PREVIOUS_SUFFIX: &str = "cuekit-prev";

/// Write bytes to `path` atomically, creating parent directories as needed.
pub fn atomic_write_bytes(path: &Path, bytes: &[u8]) -> CoreResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let staged = sibling(path, STAGED_SUFFIX);
    stage(&staged, bytes)?;
    swap_into_place(path, &staged, |from, to| fs::rename(from, to))?;
    Ok(())
}

/// Write a text file (a `.vtt` track, usually) atomically.
pub fn atomic_write_text(path: &Path, text: &str) -> CoreResult<()> {
    atomic_write_bytes(path, text.as_bytes())
}

/// Write a JSON file atomically with pretty formatting.
pub fn atomic_write_json_pretty<T: serde::Serialize>(path: &Path, value: &T) -> CoreResult<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    atomic_write_bytes(path, &bytes)
}

/// `track.vtt` -> `track.vtt.<suffix>`
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "cuekit".into(), |n| n.to_string_lossy().into_owned());
    path.with_file_name(format!("{name}.{suffix}"))
}

fn stage(staged: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(staged)?);
    writer.write_all(bytes)?;
    writer.flush()?;
    writer.get_ref().sync_all()
}

/// Moves `staged` over `dest`.
///
/// Renaming onto an existing file is not atomic everywhere (Windows), so the
/// current file is first parked beside it and put back if the swap fails.
fn swap_into_place(
    dest: &Path,
    staged: &Path,
    rename: impl Fn(&Path, &Path) -> io::Result<()>,
) -> io::Result<()> {
    if !dest.exists() {
        return rename(staged, dest).inspect_err(|_| discard(staged));
    }

    let previous = sibling(dest, PREVIOUS_SUFFIX);
    discard(&previous);
    rename(dest, &previous).inspect_err(|_| discard(staged))?;

    match rename(staged, dest) {
        Ok(()) => {
            discard(&previous);
            Ok(())
        }
        Err(e) => {
            if let Err(restore) = rename(&previous, dest) {
                warn!(
                    "Could not restore {:?} from {:?}: {}",
                    dest, previous, restore
                );
            }
            discard(staged);
            Err(e)
        }
    }
}

fn discard(path: &Path) {
    if path.exists() {
        let _ = fs::remove_file(path);
    }
}
