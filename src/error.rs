//! Typed errors for config parsing and archive I/O (spec.md 7). The teacher's
//! original `error.rs` printed a message and called `process::exit`; library
//! consumers of `Cmpaq` need `Result`s instead, so these implement
//! `std::error::Error` and the CLI shell decides whether to print-and-exit.

use std::fmt;
use std::io;
use std::path::PathBuf;

#[derive(Debug)]
pub enum ConfigError {
    InvalidMemoryOption(String),
    NoInputs,
    InvalidInput(PathBuf),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidMemoryOption(s) => {
                write!(f, "'{s}' is not a valid memory option (0..9)")
            }
            ConfigError::NoInputs => write!(f, "no input files given"),
            ConfigError::InvalidInput(p) => write!(f, "{} is not a valid input", p.display()),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug)]
pub enum ArchiveError {
    Io(io::Error),
    BadHeader,
    BadOption(u8),
    InvalidFilename(String),
    FileAlreadyExists(PathBuf),
    FileNotFound(PathBuf),
    PermissionDenied(PathBuf),
    DirAlreadyExists(PathBuf),
    TotalSizeExceeded(u64),
}

impl fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveError::Io(e) => write!(f, "{e}"),
            ArchiveError::BadHeader => write!(f, "not a cmarc archive"),
            ArchiveError::BadOption(b) => write!(f, "invalid memory option byte {b:#x} in header"),
            ArchiveError::InvalidFilename(s) => write!(f, "invalid filename in archive: {s:?}"),
            ArchiveError::FileAlreadyExists(p) => write!(
                f,
                "a file at {} already exists (use -clobber to overwrite)",
                p.display()
            ),
            ArchiveError::FileNotFound(p) => write!(f, "couldn't open file {}: not found", p.display()),
            ArchiveError::PermissionDenied(p) => {
                write!(f, "couldn't open file {}: permission denied", p.display())
            }
            ArchiveError::DirAlreadyExists(p) => write!(
                f,
                "a directory at {} already exists (use -clobber to overwrite)",
                p.display()
            ),
            ArchiveError::TotalSizeExceeded(n) => write!(
                f,
                "total input size {n} bytes exceeds the 2 GiB limit"
            ),
        }
    }
}

impl std::error::Error for ArchiveError {}

impl From<io::Error> for ArchiveError {
    fn from(e: io::Error) -> ArchiveError {
        ArchiveError::Io(e)
    }
}
