//! Archive creation (spec.md 6): writes the header, then arithmetic-codes
//! every file's filetype tag and filtered payload through one continuous
//! `Encoder` so later files benefit from context learned on earlier ones.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::buffered_io;
use crate::cm::coder::Encoder;
use crate::cm::ring::FileType;
use crate::constant::{CTRL_Z, MAX_TOTAL_SIZE, PROGNAME};
use crate::error::ArchiveError;
use crate::filedata::FileData;
use crate::filter;
use crate::progress::Progress;

pub struct Archiver {
    mem_option: u8,
    quiet: bool,
    clobber: bool,
}

impl Archiver {
    pub fn new(mem_option: u8, quiet: bool, clobber: bool) -> Archiver {
        Archiver { mem_option, quiet, clobber }
    }

    pub fn create_archive(&self, archive_path: &Path, inputs: &[FileData]) -> Result<(), ArchiveError> {
        let total: u64 = inputs.iter().map(|f| f.len).sum();
        if total > MAX_TOTAL_SIZE {
            return Err(ArchiveError::TotalSizeExceeded(total));
        }

        let mut header = Vec::new();
        header.extend_from_slice(format!("{PROGNAME} -{}\r\n", self.mem_option).as_bytes());
        for f in inputs {
            header.extend_from_slice(format!("{}\t{}\r\n", f.len, f.name).as_bytes());
        }
        header.push(CTRL_Z);

        let out = buffered_io::create_output(archive_path, self.clobber)?;
        let mut out = BufWriter::new(out);
        out.write_all(&header)?;

        let mem = 0x10000usize << self.mem_option;
        let mut enc = Encoder::new(mem, out);

        let progress = Progress::new(self.quiet);
        for f in inputs {
            let data = fs::read(&f.path)?;
            let (ft, payload) = filter::encode_with_selftest(&f.path, &data)?;

            enc.predictor_mut().set_filetype(FileType::Default);
            enc.code_byte(ft.tag())?;
            enc.predictor_mut().set_filetype(ft);
            for &b in &payload {
                enc.code_byte(b)?;
            }

            progress.compressed(&f.name, f.len, payload.len());
        }

        let mut out = enc.finish()?;
        out.flush()?;
        progress.finished();
        Ok(())
    }
}
