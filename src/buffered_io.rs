//! Minimal file-creation helpers in the teacher's idiom (spec.md 7): turn
//! std::io errors into typed `ArchiveError`s instead of the teacher's
//! print-and-exit handlers, since the library API returns `Result`s.

use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::ArchiveError;

/// Opens `path` for reading, mapping not-found/permission-denied to typed errors.
pub fn open_input(path: &Path) -> Result<File, ArchiveError> {
    File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ArchiveError::FileNotFound(path.to_path_buf()),
        ErrorKind::PermissionDenied => ArchiveError::PermissionDenied(path.to_path_buf()),
        _ => ArchiveError::Io(e),
    })
}

/// Creates `path` for writing, refusing to clobber an existing file unless `clobber` is set.
pub fn create_output(path: &Path, clobber: bool) -> Result<File, ArchiveError> {
    if path.exists() && !clobber {
        return Err(ArchiveError::FileAlreadyExists(path.to_path_buf()));
    }
    File::create(path).map_err(|e| match e.kind() {
        ErrorKind::PermissionDenied => ArchiveError::PermissionDenied(path.to_path_buf()),
        _ => ArchiveError::Io(e),
    })
}
