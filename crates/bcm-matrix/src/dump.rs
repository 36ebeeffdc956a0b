//! Hex dump of a render buffer as a C array initializer.
//!
//! The output can be pasted into firmware as a static test pattern, or
//! diffed between builds.

use core::fmt::{self, Write};

/// Bytes per output line.
pub const BYTES_PER_LINE: usize = 8;

/// Write `bytes` as `static const uint8_t img[] = { 0xNN,... };`, eight
/// upper-case hex bytes per line.
pub fn write_c_array<W: Write>(out: &mut W, bytes: &[u8]) -> fmt::Result {
    out.write_str("static const uint8_t img[] = {\n")?;
    let lines = bytes.chunks(BYTES_PER_LINE);
    let count = lines.len();
    for (n, line) in lines.enumerate() {
        out.write_str("  ")?;
        for (i, byte) in line.iter().enumerate() {
            if i > 0 {
                out.write_char(',')?;
            }
            write!(out, "0x{byte:02X}")?;
        }
        if n.saturating_add(1) < count {
            out.write_char(',')?;
        }
        out.write_char('\n')?;
    }
    out.write_str("};\n")
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::arithmetic_side_effects,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn test_format_two_lines() {
        let bytes: Vec<u8> = (0u8..10).map(|b| b * 0x11).collect();
        let mut s = String::new();
        write_c_array(&mut s, &bytes).unwrap();
        assert_eq!(
            s,
            "static const uint8_t img[] = {\n  \
             0x00,0x11,0x22,0x33,0x44,0x55,0x66,0x77,\n  \
             0x88,0x99\n};\n"
        );
    }

    #[test]
    fn test_empty() {
        let mut s = String::new();
        write_c_array(&mut s, &[]).unwrap();
        assert_eq!(s, "static const uint8_t img[] = {\n};\n");
    }
}
