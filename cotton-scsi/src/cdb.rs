use core::str::FromStr;

/// Longest command block accepted, of either type
pub const CDB_MAX_SIZE: usize = 32;

/// How the bytes of a command block are to be interpreted
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CdbType {
    /// A SCSI command block, issued as-is
    Scsi,
    /// An ATA taskfile in the 8-byte (28-bit) or 12-byte (48-bit) layout
    /// of [`crate::ata`], translated into ATA PASSTHROUGH(16) before issue
    Ata,
}

/// Reasons for rejecting a command block before it reaches the device
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CdbError {
    /// No bytes at all
    Empty,
    /// More than [`CDB_MAX_SIZE`] bytes
    TooLong,
    /// Something other than hex digits and whitespace
    InvalidCharacter,
    /// A hex token larger than one byte
    InvalidValue,
    /// ATA command blocks are 8 or 12 bytes, never this
    InvalidAtaSize(usize),
    /// The ATA command was recognised, but its CDB was the wrong size for
    /// its addressing width
    AddressingMismatch {
        /// The command recognised
        name: &'static str,
        /// The size it requires
        expected: usize,
    },
}

impl core::fmt::Display for CdbError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Empty => f.write_str("empty CDB"),
            Self::TooLong => {
                write!(f, "CDB is longer than {CDB_MAX_SIZE} bytes")
            }
            Self::InvalidCharacter => f.write_str("invalid character in CDB"),
            Self::InvalidValue => f.write_str("invalid value in CDB"),
            Self::InvalidAtaSize(n) => write!(
                f,
                "ATA CDB must be 8 (28-bit) or 12 (48-bit) bytes, not {n}"
            ),
            Self::AddressingMismatch { name, expected } => {
                write!(f, "{name} requires a {expected}-byte CDB")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CdbError {}

/// A command block of up to [`CDB_MAX_SIZE`] bytes
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Cdb {
    bytes: [u8; CDB_MAX_SIZE],
    len: usize,
}

impl Cdb {
    /// Copy a command block, checking its size
    pub fn new(bytes: &[u8]) -> Result<Self, CdbError> {
        if bytes.is_empty() {
            return Err(CdbError::Empty);
        }
        if bytes.len() > CDB_MAX_SIZE {
            return Err(CdbError::TooLong);
        }
        let mut cdb = Self {
            bytes: [0u8; CDB_MAX_SIZE],
            len: bytes.len(),
        };
        cdb.bytes[..bytes.len()].copy_from_slice(bytes);
        Ok(cdb)
    }

    /// The command bytes themselves
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Number of bytes in use
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false: an empty `Cdb` cannot be constructed
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Parse whitespace-separated hex bytes, e.g. `"12 00 00 00 24 00"`
///
/// Each token may carry a `0x` prefix.
impl FromStr for Cdb {
    type Err = CdbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; CDB_MAX_SIZE];
        let mut len = 0;

        for token in s.split_ascii_whitespace() {
            if len >= CDB_MAX_SIZE {
                return Err(CdbError::TooLong);
            }
            let digits = token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .unwrap_or(token);
            if digits.is_empty()
                || !digits.bytes().all(|b| b.is_ascii_hexdigit())
            {
                return Err(CdbError::InvalidCharacter);
            }
            bytes[len] = u8::from_str_radix(digits, 16)
                .map_err(|_| CdbError::InvalidValue)?;
            len += 1;
        }

        Self::new(&bytes[..len])
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn parse_inquiry() {
        let cdb: Cdb = "12 00 00 00 24 00".parse().unwrap();
        assert_eq!(cdb.as_bytes(), &[0x12, 0, 0, 0, 0x24, 0]);
        assert_eq!(cdb.len(), 6);
    }

    #[test]
    fn parse_mixed_whitespace_and_prefix() {
        let cdb: Cdb = "\t0x85  0X0d\n e 0".parse().unwrap();
        assert_eq!(cdb.as_bytes(), &[0x85, 0x0D, 0x0E, 0]);
    }

    #[test]
    fn parse_empty() {
        assert_eq!("".parse::<Cdb>(), Err(CdbError::Empty));
        assert_eq!("   ".parse::<Cdb>(), Err(CdbError::Empty));
    }

    #[test]
    fn parse_bad_character() {
        assert_eq!("12 zz".parse::<Cdb>(), Err(CdbError::InvalidCharacter));
        assert_eq!("12,00".parse::<Cdb>(), Err(CdbError::InvalidCharacter));
        assert_eq!("0x".parse::<Cdb>(), Err(CdbError::InvalidCharacter));
    }

    #[test]
    fn parse_value_too_big() {
        assert_eq!("100".parse::<Cdb>(), Err(CdbError::InvalidValue));
        assert_eq!("12 1234".parse::<Cdb>(), Err(CdbError::InvalidValue));
    }

    #[test]
    fn parse_leading_zeroes_allowed() {
        let cdb: Cdb = "00ff".parse().unwrap();
        assert_eq!(cdb.as_bytes(), &[0xFF]);
    }

    #[test]
    fn parse_max_size() {
        let s = "00 ".repeat(CDB_MAX_SIZE);
        assert_eq!(s.parse::<Cdb>().unwrap().len(), CDB_MAX_SIZE);
        let s = "00 ".repeat(CDB_MAX_SIZE + 1);
        assert_eq!(s.parse::<Cdb>(), Err(CdbError::TooLong));
    }

    #[test]
    fn new_checks_size() {
        assert_eq!(Cdb::new(&[]), Err(CdbError::Empty));
        assert_eq!(Cdb::new(&[0u8; 33]), Err(CdbError::TooLong));
        assert!(Cdb::new(&[0u8; 16]).is_ok());
    }

    #[test]
    fn display() {
        assert_eq!(
            format!("{}", CdbError::InvalidAtaSize(10)),
            "ATA CDB must be 8 (28-bit) or 12 (48-bit) bytes, not 10"
        );
        assert_eq!(
            format!(
                "{}",
                CdbError::AddressingMismatch {
                    name: "READ_DMA_EXT",
                    expected: 12
                }
            ),
            "READ_DMA_EXT requires a 12-byte CDB"
        );
    }
}
