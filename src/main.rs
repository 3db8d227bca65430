//! CLI shell (spec.md 6): thin wrapper around [`cmarc::Cmpaq`], matching the
//! teacher's fail-fast `main()` over the library's `Result`-returning API.

use std::env;
use std::process::exit;

use log::error;

use cmarc::config::{Config, Mode};

fn main() {
    simple_logger::SimpleLogger::new().init().unwrap();
    let args: Vec<String> = env::args().skip(1).collect();

    let cfg = Config::new(&args).unwrap_or_else(|e| {
        error!("{e}");
        exit(1);
    });

    if let Err(e) = run(cfg) {
        error!("{e}");
        exit(1);
    }
}

fn run(cfg: Config) -> Result<(), cmarc::error::ArchiveError> {
    let archive_str = cfg.archive.to_str().expect("non-utf8 archive path");
    let cmpaq = cmarc::Cmpaq::new()
        .archive(archive_str)
        .memory(cfg.mem_option)
        .unwrap_or_else(|e| {
            error!("{e}");
            exit(1);
        });

    let cmpaq = if cfg.quiet { cmpaq.quiet() } else { cmpaq };
    let cmpaq = if cfg.clobber { cmpaq.clobber() } else { cmpaq };

    match cfg.mode {
        Mode::CreateArchive => {
            let inputs: Vec<&str> =
                cfg.inputs.iter().map(|p| p.to_str().expect("non-utf8 input path")).collect();
            let cmpaq = cmpaq.inputs(&inputs).unwrap_or_else(|e| {
                error!("{e}");
                exit(1);
            });
            cmpaq.create_archive()
        }
        Mode::ExtractArchive => {
            let names: Vec<&str> =
                cfg.inputs.iter().map(|p| p.to_str().expect("non-utf8 input path")).collect();
            cmpaq.extract_names(&names).extract_archive()
        }
    }
}
