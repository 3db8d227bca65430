//! Parsed command-line configuration (spec.md 6): archive path, mode
//! (create vs extract), memory option, and the create/extract-filter
//! flags. Built by [`crate::parse_args::parse`].

use std::path::PathBuf;

use crate::error::ConfigError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    CreateArchive,
    ExtractArchive,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub archive: PathBuf,
    pub inputs: Vec<PathBuf>,
    pub mem_option: u8,
    pub quiet: bool,
    pub clobber: bool,
    pub mode: Mode,
}

impl Config {
    pub fn new(args: &[String]) -> Result<Config, ConfigError> {
        crate::parse_args::parse(args)
    }
}
