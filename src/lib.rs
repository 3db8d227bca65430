//! `cmarc`: a context-mixing single-file archiver (spec.md). The core
//! predictor/coder pipeline lives under [`cm`]; everything else here is the
//! archive container, CLI glue, and file validation around it.

pub mod cm;
pub mod config;
pub mod constant;
pub mod error;

mod archive;
mod buffered_io;
mod extract;
mod filedata;
mod filter;
mod formatting;
mod parse_args;
mod progress;

use std::path::PathBuf;

use crate::error::{ArchiveError, ConfigError};
use crate::filedata::FileData;

/// `cmarc` API: chain configuration methods, then call
/// [`Cmpaq::create_archive`] or [`Cmpaq::extract_archive`].
#[derive(Clone, Default)]
pub struct Cmpaq {
    archive: PathBuf,
    inputs: Vec<PathBuf>,
    extract_names: Vec<String>,
    mem_option: u8,
    quiet: bool,
    clobber: bool,
}

impl Cmpaq {
    pub fn new() -> Cmpaq {
        Cmpaq { mem_option: 2, ..Default::default() }
    }

    /// Suppress output other than errors.
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    /// Allow overwriting existing output files.
    pub fn clobber(mut self) -> Self {
        self.clobber = true;
        self
    }

    /// Choose memory option (0..9); each step doubles the predictor's memory use.
    pub fn memory(mut self, opt: u8) -> Result<Self, ConfigError> {
        if opt > 9 {
            return Err(ConfigError::InvalidMemoryOption(opt.to_string()));
        }
        self.mem_option = opt;
        Ok(self)
    }

    /// Choose the archive path, existing or not.
    pub fn archive(mut self, path: &str) -> Self {
        self.archive = PathBuf::from(path);
        self
    }

    /// Choose inputs to compress into a new archive.
    pub fn inputs(mut self, inputs: &[&str]) -> Result<Self, ConfigError> {
        for input in inputs {
            let path = PathBuf::from(input);
            if !path.is_file() {
                return Err(ConfigError::InvalidInput(path));
            }
            self.inputs.push(path);
        }
        Ok(self)
    }

    /// Restrict extraction to these stored names; empty means extract everything.
    pub fn extract_names(mut self, names: &[&str]) -> Self {
        self.extract_names = names.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Create an archive from the chosen inputs.
    pub fn create_archive(self) -> Result<(), ArchiveError> {
        if self.inputs.is_empty() {
            return Err(ArchiveError::InvalidFilename(String::new()));
        }
        let files: Result<Vec<FileData>, ArchiveError> =
            self.inputs.iter().cloned().map(FileData::new).collect();
        let files = files?;
        archive::Archiver::new(self.mem_option, self.quiet, self.clobber)
            .create_archive(&self.archive, &files)
    }

    /// Extract (or compare against existing files in) the chosen archive.
    pub fn extract_archive(self) -> Result<(), ArchiveError> {
        extract::extract_archive(&self.archive, &self.extract_names, self.clobber, self.quiet)
    }
}
