//! Prints per-file progress lines (spec.md 7): "extracted"/"identical"/
//! "differ at offset N" on extraction, and a size summary per file plus a
//! total-time summary on creation.

use std::time::Instant;

pub struct Progress {
    quiet: bool,
    start: Instant,
}

impl Progress {
    pub fn new(quiet: bool) -> Progress {
        Progress { quiet, start: Instant::now() }
    }

    pub fn compressed(&self, name: &str, in_len: u64, out_len: usize) {
        if !self.quiet {
            println!("{name}: {in_len} -> {out_len} bytes");
        }
    }

    pub fn extracted(&self, name: &str) {
        if !self.quiet {
            println!("{name}: extracted");
        }
    }

    pub fn identical(&self, name: &str) {
        if !self.quiet {
            println!("{name}: identical");
        }
    }

    pub fn differs(&self, name: &str, offset: usize) {
        if !self.quiet {
            println!("{name}: differ at offset {offset}");
        }
    }

    pub fn finished(&self) {
        if !self.quiet {
            println!("Done in {:.2?}", self.start.elapsed());
        }
    }
}
