//! Turns a stored archive filename into a safe output path (spec.md 6):
//! filenames are flat (no directory components), so this only guards
//! against a corrupted header smuggling a path separator or `..`.

use std::path::{Path, PathBuf};

use crate::error::ArchiveError;

pub fn fmt_file_out(name: &str) -> Result<PathBuf, ArchiveError> {
    let path = Path::new(name);
    if name.is_empty() || path.components().count() != 1 {
        return Err(ArchiveError::InvalidFilename(name.to_string()));
    }
    Ok(PathBuf::from(name))
}
