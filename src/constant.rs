//! Archive-wide constants (spec.md 6): the program tag written at the start
//! of every header, and the CTRL-Z byte that terminates it.

/// First word of the header's first line (`"<progname> -<digit>\r\n"`).
pub const PROGNAME: &str = "cmarc";

/// Terminates the archive header; compressed payload begins immediately after.
pub const CTRL_Z: u8 = 0x1A;

/// Inputs whose total uncompressed size reaches this are rejected (spec.md 1,
/// Non-goals: "multi-gigabyte (>2 GiB) total payloads").
pub const MAX_TOTAL_SIZE: u64 = 2 << 30;
