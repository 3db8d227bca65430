//! Command-line tokenizer (spec.md 6), grounded in the teacher's manual
//! `Parse`-state-machine idiom rather than a derive-macro CLI crate.
//!
//! USAGE: prog [-<0..9>] <archive> [files...]
//!   -q, -quiet    suppress non-error output
//!   -clobber      allow overwriting existing files on extract

use std::path::PathBuf;

use crate::config::{Config, Mode};
use crate::error::ConfigError;

pub fn parse(args: &[String]) -> Result<Config, ConfigError> {
    let mut mem_option: u8 = 2;
    let mut quiet = false;
    let mut clobber = false;
    let mut archive: Option<PathBuf> = None;
    let mut inputs: Vec<PathBuf> = Vec::new();

    for arg in args {
        if let Some(opt) = arg.strip_prefix('-') {
            match opt {
                "q" | "quiet" => quiet = true,
                "clobber" => clobber = true,
                _ if opt.len() == 1 && opt.chars().next().unwrap().is_ascii_digit() => {
                    mem_option = opt.parse().unwrap();
                }
                _ => return Err(ConfigError::InvalidMemoryOption(arg.clone())),
            }
            continue;
        }
        if archive.is_none() {
            archive = Some(PathBuf::from(arg));
        } else {
            inputs.push(PathBuf::from(arg));
        }
    }

    let archive = archive.ok_or(ConfigError::NoInputs)?;
    let mode = if archive.is_file() { Mode::ExtractArchive } else { Mode::CreateArchive };

    if mode == Mode::CreateArchive && inputs.is_empty() {
        return Err(ConfigError::NoInputs);
    }
    for input in &inputs {
        if mode == Mode::CreateArchive && !input.is_file() {
            return Err(ConfigError::InvalidInput(input.clone()));
        }
    }

    Ok(Config { archive, inputs, mem_option, quiet, clobber, mode })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_memory_option_two() {
        let args = ["arch.cma".to_string(), "Cargo.toml".to_string()];
        let cfg = parse(&args).unwrap();
        assert_eq!(cfg.mem_option, 2);
        assert_eq!(cfg.mode, Mode::CreateArchive);
    }

    #[test]
    fn parses_explicit_memory_option() {
        let args = ["-7".to_string(), "arch.cma".to_string(), "Cargo.toml".to_string()];
        let cfg = parse(&args).unwrap();
        assert_eq!(cfg.mem_option, 7);
    }

    #[test]
    fn rejects_out_of_range_memory_flag() {
        let err = parse(&["-x".to_string(), "arch.cma".to_string()]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMemoryOption(_)));
    }

    #[test]
    fn no_archive_argument_is_an_error() {
        let err = parse(&["-q".to_string()]).unwrap_err();
        assert!(matches!(err, ConfigError::NoInputs));
    }
}
