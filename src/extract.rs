//! Archive extraction (spec.md 6): reads the header, then decodes every
//! file's filetype tag and exactly `filter::transformed_len` bytes of
//! payload through one continuous `Decoder`, reverses the filter, and
//! either writes the recovered bytes or compares them against an existing
//! file of the same name (spec.md 7).

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::buffered_io;
use crate::cm::coder::Decoder;
use crate::cm::ring::FileType;
use crate::constant::{CTRL_Z, PROGNAME};
use crate::error::ArchiveError;
use crate::filter;
use crate::formatting;
use crate::progress::Progress;

fn read_line_crlf<R: BufRead>(r: &mut R) -> std::io::Result<String> {
    let mut buf = Vec::new();
    r.read_until(b'\n', &mut buf)?;
    while buf.last() == Some(&b'\n') || buf.last() == Some(&b'\r') {
        buf.pop();
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn parse_magic_line(line: &str) -> Result<u8, ArchiveError> {
    let (name, opt) = line.rsplit_once(" -").ok_or(ArchiveError::BadHeader)?;
    if name != PROGNAME {
        return Err(ArchiveError::BadHeader);
    }
    let opt: u8 = opt.parse().map_err(|_| ArchiveError::BadHeader)?;
    if opt > 9 {
        return Err(ArchiveError::BadOption(opt));
    }
    Ok(opt)
}

/// Extracts `archive_path` into its own parent directory. If `out_names` is
/// non-empty, only files whose stored name appears there are written; every
/// file must still be decoded in order since the coder runs continuously.
pub fn extract_archive(
    archive_path: &Path,
    out_names: &[String],
    clobber: bool,
    quiet: bool,
) -> Result<(), ArchiveError> {
    let file = buffered_io::open_input(archive_path)?;
    let mut reader = BufReader::new(file);

    let first_line = read_line_crlf(&mut reader)?;
    let mem_option = parse_magic_line(&first_line)?;

    let mut entries = Vec::new();
    loop {
        let byte = {
            let buf = reader.fill_buf()?;
            if buf.is_empty() {
                return Err(ArchiveError::BadHeader);
            }
            buf[0]
        };
        if byte == CTRL_Z {
            reader.consume(1);
            break;
        }
        let line = read_line_crlf(&mut reader)?;
        let (size_str, name) = line.split_once('\t').ok_or(ArchiveError::BadHeader)?;
        let size: u64 = size_str.parse().map_err(|_| ArchiveError::BadHeader)?;
        entries.push((size, name.to_string()));
    }

    let mem = 0x10000usize << mem_option;
    let mut dec = Decoder::new(mem, reader)?;
    let progress = Progress::new(quiet);
    let out_dir = archive_path.parent().unwrap_or_else(|| Path::new("."));

    for (size, name) in entries.iter() {
        dec.predictor_mut().set_filetype(FileType::Default);
        let tag = dec.code_byte()?;
        let ft = FileType::from_tag(tag);
        dec.predictor_mut().set_filetype(ft);

        let tlen = filter::transformed_len(*size, ft) as usize;
        let mut payload = Vec::with_capacity(tlen);
        for _ in 0..tlen {
            payload.push(dec.code_byte()?);
        }

        if !out_names.is_empty() && !out_names.iter().any(|n| n == name) {
            continue;
        }

        let recovered = filter::for_filetype(ft).decode(&payload);
        let rel_path = formatting::fmt_file_out(name)?;
        let out_path = out_dir.join(rel_path);

        if out_path.exists() && !clobber {
            let existing = fs::read(&out_path)?;
            if existing == recovered {
                progress.identical(name);
            } else {
                let diff_at = existing
                    .iter()
                    .zip(recovered.iter())
                    .position(|(a, b)| a != b)
                    .unwrap_or_else(|| existing.len().min(recovered.len()));
                progress.differs(name, diff_at);
            }
        } else {
            fs::write(&out_path, &recovered)?;
            progress.extracted(name);
        }
    }
    progress.finished();
    Ok(())
}
