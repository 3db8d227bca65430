//! A single archive member: its source path, the flat name stored in the
//! header, and its original length (spec.md 6's `<decimal-size>\t<filename>`
//! header line).

use std::path::PathBuf;

use crate::error::ArchiveError;

#[derive(Clone, Debug)]
pub struct FileData {
    pub path: PathBuf,
    pub name: String,
    pub len: u64,
}

impl FileData {
    /// Reads `path`'s metadata and validates its file name against spec.md 6's
    /// forbidden bytes (CR, LF, TAB, NUL, CTRL-Z) before it can corrupt a
    /// header line.
    pub fn new(path: PathBuf) -> Result<FileData, ArchiveError> {
        let meta = path.metadata().map_err(|_| ArchiveError::FileNotFound(path.clone()))?;

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ArchiveError::InvalidFilename(path.display().to_string()))?
            .to_string();

        if name.bytes().any(|b| matches!(b, b'\r' | b'\n' | b'\t' | 0 | 0x1A)) {
            return Err(ArchiveError::InvalidFilename(name));
        }

        Ok(FileData { path, name, len: meta.len() })
    }
}
