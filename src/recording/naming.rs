//! Date-stamped, auto-incrementing session filenames.
//!
//! Sessions land as `YYYYMMDD-<label><N>.<ext>` inside the sink directory,
//! where `N` counts the same day's existing files for that label plus one.
//! An existing file is never overwritten; if the count-derived name is taken
//! (files deleted out of the middle of the sequence), the number keeps
//! bumping until a free slot is found.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::sampling::error::RigError;

pub fn next_session_path(
    dir: &Path,
    date: NaiveDate,
    label: &str,
    extension: &str,
) -> Result<PathBuf, RigError> {
    fs::create_dir_all(dir)?;
    let prefix = format!("{}-{label}", date.format("%Y%m%d"));
    let suffix = format!(".{extension}");

    let existing = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            name.starts_with(&prefix) && name.ends_with(&suffix)
        })
        .count();

    let mut number = existing + 1;
    loop {
        let candidate = dir.join(format!("{prefix}{number}{suffix}"));
        if !candidate.exists() {
            return Ok(candidate);
        }
        number += 1;
    }
}
