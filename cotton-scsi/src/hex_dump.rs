use core::fmt;

const RULE: &str =
    "  +----------+-------------------------------------------------+";

/// Format bytes as a table of 16 per row, with offsets
///
/// ```text
///   +----------+-------------------------------------------------+
///   |  OFFSET  | 00 01 02 03 04 05 06 07 08 09 0A 0B 0C 0D 0E 0F |
///   +----------+-------------------------------------------------+
///   | 00000000 | 12 00 00 00 24 00                               |
///   +----------+-------------------------------------------------+
/// ```
pub struct HexDump<'a>(pub &'a [u8]);

impl fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{RULE}")?;
        writeln!(
            f,
            "  |  OFFSET  | 00 01 02 03 04 05 06 07 08 09 0A 0B 0C 0D 0E 0F |"
        )?;
        writeln!(f, "{RULE}")?;
        for (row, chunk) in self.0.chunks(16).enumerate() {
            write!(f, "  | {:08x} |", row * 16)?;
            for b in chunk {
                write!(f, " {b:02x}")?;
            }
            for _ in chunk.len()..16 {
                f.write_str("   ")?;
            }
            writeln!(f, " |")?;
        }
        write!(f, "{RULE}")
    }
}
