//! Recognising ATA commands from their taskfile encoding
//!
//! An ATA command block is either 8 bytes (28-bit addressing):
//!
//! | 0       | 1     | 2..=5          | 6      | 7       |
//! | ---     | ---   | ---            | ---    | ---     |
//! | feature | count | LBA 27:0 (BE)  | device | command |
//!
//! or 12 bytes (48-bit addressing):
//!
//! | 0..=1        | 2..=3      | 4..=9         | 10     | 11      |
//! | ---          | ---        | ---           | ---    | ---     |
//! | feature (BE) | count (BE) | LBA 47:0 (BE) | device | command |
//!
//! Either way the command byte is last.

/// How the device transfers data for a command
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Protocol {
    /// No data phase
    NonData,
    /// PIO, device to host
    PioIn,
    /// PIO, host to device
    PioOut,
    /// DMA, either direction
    Dma,
    /// EXECUTE DEVICE DIAGNOSTIC
    ExecuteDiagnostic,
}

/// What, beyond the command byte, identifies a table entry
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Match {
    /// The command byte alone
    Opcode,
    /// The whole feature field
    Feature(u16),
    /// Bits 3:0 of the feature field (NCQ NON-DATA subcommands)
    FeatureLowNibble(u8),
    /// Bits 11:8 of the count field (NCQ SEND/RECEIVE subcommands)
    CountHighNibble(u8),
}

/// One recognisable ATA command
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AtaCommand {
    /// ATA command byte
    pub opcode: u8,
    pub matches: Match,
    pub protocol: Protocol,
    /// Native Command Queuing: translated with protocol 0x0C
    pub ncq: bool,
    /// 48-bit addressing: a 12-byte command block
    pub lba48: bool,
    /// Name as printed in verbose output
    pub name: &'static str,
}

/// Size of a 28-bit ATA command block
pub const LBA28_CDB_SIZE: usize = 8;
/// Size of a 48-bit ATA command block
pub const LBA48_CDB_SIZE: usize = 12;

impl AtaCommand {
    /// The command block size this command's addressing width requires
    pub fn cdb_size(&self) -> usize {
        if self.lba48 {
            LBA48_CDB_SIZE
        } else {
            LBA28_CDB_SIZE
        }
    }

    /// Does this entry describe the given command block?
    ///
    /// Fields are read at the offsets this entry's own addressing width
    /// implies, so a block of the other width may still match; callers
    /// check [`AtaCommand::cdb_size`] afterwards.
    pub fn is_match(&self, cdb: &[u8]) -> bool {
        if cdb.last() != Some(&self.opcode) {
            return false;
        }
        match self.matches {
            Match::Opcode => true,
            Match::Feature(f) => self.feature(cdb) == Some(f),
            Match::FeatureLowNibble(n) => {
                self.feature(cdb).map(|f| (f & 0xF) as u8) == Some(n)
            }
            Match::CountHighNibble(n) => {
                self.count(cdb).map(|c| ((c >> 8) & 0xF) as u8) == Some(n)
            }
        }
    }

    fn feature(&self, cdb: &[u8]) -> Option<u16> {
        if self.lba48 {
            Some(u16::from_be_bytes([*cdb.first()?, *cdb.get(1)?]))
        } else {
            cdb.first().map(|&b| b as u16)
        }
    }

    fn count(&self, cdb: &[u8]) -> Option<u16> {
        if self.lba48 {
            Some(u16::from_be_bytes([*cdb.get(2)?, *cdb.get(3)?]))
        } else {
            cdb.get(1).map(|&b| b as u16)
        }
    }
}

/// Find the entry describing an ATA command block
///
/// The first match in [`ATA_COMMANDS`] wins.
pub fn find(cdb: &[u8]) -> Option<&'static AtaCommand> {
    ATA_COMMANDS.iter().find(|c| c.is_match(cdb))
}

const fn cmd(
    opcode: u8,
    matches: Match,
    protocol: Protocol,
    ncq: bool,
    lba48: bool,
    name: &'static str,
) -> AtaCommand {
    AtaCommand {
        opcode,
        matches,
        protocol,
        ncq,
        lba48,
        name,
    }
}

use Match::{CountHighNibble, Feature, FeatureLowNibble, Opcode};
use Protocol::{Dma, ExecuteDiagnostic, NonData, PioIn, PioOut};

/// Every ATA command the translator knows
///
/// Order matters: entries sharing an opcode must have mutually exclusive
/// matches, or else put the more specific first. (Currently every shared
/// opcode is split by `Feature`/`FeatureLowNibble`/`CountHighNibble`
/// values which are mutually exclusive, and no `Opcode` entry shares its
/// opcode with another entry.)
#[rustfmt::skip]
pub static ATA_COMMANDS: &[AtaCommand] = &[
    cmd(0xE5, Opcode, NonData, false, false, "CHECK_POWER_MODE"),
    cmd(0x14, Opcode, NonData, false, true, "CLEAR_DEVICE_FAULT_EXT"),
    cmd(0x51, Opcode, NonData, false, true, "CONFIGURE_STREAM"),
    cmd(0x06, Opcode, Dma, false, true, "DATA_SET_MANAGEMENT"),
    cmd(0x07, Opcode, Dma, false, true, "DATA_SET_MANAGEMENT_XL"),
    cmd(0x92, Opcode, PioOut, false, false, "DOWNLOAD_MICROCODE"),
    cmd(0x93, Opcode, Dma, false, false, "DOWNLOAD_MICROCODE_DMA"),
    cmd(0x90, Opcode, ExecuteDiagnostic, false, false,
        "EXECUTE_DEVICE_DIAGNOSTIC"),
    cmd(0xE7, Opcode, NonData, false, false, "FLUSH_CACHE"),
    cmd(0xEA, Opcode, NonData, false, true, "FLUSH_CACHE_EXT"),
    cmd(0x78, Feature(0x00), NonData, false, true,
        "GET_NATIVE_MAX_ADDRESS_EXT"),
    cmd(0x78, Feature(0x01), NonData, false, true,
        "SET_ACCESSIBLE_MAX_ADDRESS_EXT"),
    cmd(0x78, Feature(0x02), NonData, false, true,
        "FREEZE_ACCESSIBLE_MAX_ADDRESS_EXT"),
    cmd(0x12, Opcode, Dma, false, true, "GET_PHYSICAL_ELEMENT_STATUS"),
    cmd(0xEC, Opcode, PioIn, false, false, "IDENTIFY_DEVICE"),
    cmd(0xE3, Opcode, NonData, false, false, "IDLE"),
    cmd(0xE1, Opcode, NonData, false, false, "IDLE_IMMEDIATE"),
    cmd(0x96, Opcode, NonData, false, true, "MUTATE_EXT"),
    cmd(0x63, FeatureLowNibble(0x0), NonData, true, true,
        "NCQ_NON_DATA/ABORT_NCQ_QUEUE"),
    cmd(0x63, FeatureLowNibble(0x1), NonData, true, true,
        "NCQ_NON_DATA/DEADLINE_HANDLING"),
    cmd(0x63, FeatureLowNibble(0x2), NonData, true, true,
        "NCQ_NON_DATA/HYBRID_DEMOTE_BY_SIZE"),
    cmd(0x63, FeatureLowNibble(0x3), NonData, true, true,
        "NCQ_NON_DATA/HYBRID_CHANGE_BY_LBA_RANGE"),
    cmd(0x63, FeatureLowNibble(0x4), NonData, true, true,
        "NCQ_NON_DATA/HYBRID_CONTROL"),
    cmd(0x63, FeatureLowNibble(0x5), NonData, true, true,
        "NCQ_NON_DATA/SET_FEATURES"),
    cmd(0x63, FeatureLowNibble(0x6), NonData, true, true,
        "NCQ_NON_DATA/ZERO_EXT"),
    cmd(0x63, FeatureLowNibble(0x7), NonData, true, true,
        "NCQ_NON_DATA/ZAC_MANAGEMENT_OUT"),
    cmd(0x63, FeatureLowNibble(0x8), NonData, true, true,
        "NCQ_NON_DATA/DURABLE_ORDERED_WRITE_NOTIFICATION"),
    cmd(0x00, Opcode, NonData, false, false, "NOP"),
    cmd(0xE4, Opcode, PioIn, false, false, "READ_BUFFER"),
    cmd(0xE9, Opcode, Dma, false, false, "READ_BUFFER_DMA"),
    cmd(0xC8, Opcode, Dma, false, false, "READ_DMA"),
    cmd(0x25, Opcode, Dma, false, true, "READ_DMA_EXT"),
    cmd(0x60, Opcode, Dma, true, true, "READ_FPDMA_QUEUED"),
    cmd(0x47, Opcode, Dma, false, true, "READ_LOG_DMA_EXT"),
    cmd(0x2F, Opcode, PioIn, false, true, "READ_LOG_EXT"),
    cmd(0x20, Opcode, PioIn, false, false, "READ_SECTORS"),
    cmd(0x24, Opcode, PioIn, false, true, "READ_SECTORS_EXT"),
    cmd(0x2A, Opcode, Dma, false, true, "READ_STREAM_DMA_EXT"),
    cmd(0x2B, Opcode, PioIn, false, true, "READ_STREAM_EXT"),
    cmd(0x40, Opcode, NonData, false, false, "READ_VERIFY_SECTORS"),
    cmd(0x42, Opcode, NonData, false, true, "READ_VERIFY_SECTORS_EXT"),
    cmd(0x65, CountHighNibble(0x1), Dma, true, true,
        "RECEIVE_FPDMA_QUEUED/READ_LOG_DMA_EXT"),
    cmd(0x65, CountHighNibble(0x2), Dma, true, true,
        "RECEIVE_FPDMA_QUEUED/ZAC_MANAGEMENT_IN"),
    cmd(0x7C, Opcode, NonData, false, true, "REMOVE_ELEMENT_AND_TRUNCATE"),
    cmd(0x7E, Opcode, NonData, false, true,
        "REMOVE_ELEMENT_AND_MODIFY_ZONES"),
    cmd(0x0B, Opcode, NonData, false, true, "REQUEST_SENSE_DATA_EXT"),
    cmd(0x7D, Opcode, NonData, false, true, "RESTORE_ELEMENTS_AND_REBUILD"),
    cmd(0xB4, Feature(0x00), NonData, false, true, "SANITIZE_STATUS_EXT"),
    cmd(0xB4, Feature(0x11), NonData, false, true, "CRYPTO_SCRAMBLE_EXT"),
    cmd(0xB4, Feature(0x12), NonData, false, true, "BLOCK_ERASE_EXT"),
    cmd(0xB4, Feature(0x14), NonData, false, true, "OVERWRITE_EXT"),
    cmd(0xB4, Feature(0x20), NonData, false, true,
        "SANITIZE_FREEZE_LOCK_EXT"),
    cmd(0xB4, Feature(0x40), NonData, false, true,
        "SANITIZE_ANTIFREEZE_LOCK_EXT"),
    cmd(0xF6, Opcode, PioOut, false, false, "SECURITY_DISABLE_PASSWORD"),
    cmd(0xF3, Opcode, NonData, false, false, "SECURITY_ERASE_PREPARE"),
    cmd(0xF4, Opcode, PioOut, false, false, "SECURITY_ERASE_UNIT"),
    cmd(0xF5, Opcode, NonData, false, false, "SECURITY_FREEZE_LOCK"),
    cmd(0xF1, Opcode, NonData, false, false, "SECURITY_SET_PASSWORD"),
    cmd(0xF2, Opcode, NonData, false, false, "SECURITY_UNLOCK"),
    cmd(0x64, CountHighNibble(0x0), Dma, true, true,
        "SEND_FPDMA_QUEUED/DATA_SET_MANAGEMENT"),
    cmd(0x64, CountHighNibble(0x1), Dma, true, true,
        "SEND_FPDMA_QUEUED/HYBRID_EVICT"),
    cmd(0x64, CountHighNibble(0x2), Dma, true, true,
        "SEND_FPDMA_QUEUED/WRITE_LOG_DMA_EXT"),
    cmd(0x64, CountHighNibble(0x3), Dma, true, true,
        "SEND_FPDMA_QUEUED/ZAC_MANAGEMENT_OUT"),
    cmd(0x64, CountHighNibble(0x4), Dma, true, true,
        "SEND_FPDMA_QUEUED/DATA_SET_MANAGEMENT_XL"),
    cmd(0x64, CountHighNibble(0x5), Dma, true, true,
        "SEND_FPDMA_QUEUED/WRITE_GATHERED_EXT"),
    cmd(0x77, Opcode, NonData, false, true, "SET_DATE_AND_TIME_EXT"),
    cmd(0xEF, Opcode, NonData, false, false, "SET_FEATURES"),
    cmd(0xB2, Opcode, NonData, false, true, "SET_SECTOR_CONFIGURATION_EXT"),
    cmd(0xE6, Opcode, NonData, false, false, "SLEEP"),
    cmd(0xB0, Feature(0xD5), PioIn, false, false, "SMART_READ_LOG"),
    cmd(0xB0, Feature(0xD6), PioOut, false, false, "SMART_WRITE_LOG"),
    cmd(0xB0, Feature(0xDA), NonData, false, false, "SMART_RETURN_STATUS"),
    cmd(0xE2, Opcode, NonData, false, false, "STANDBY"),
    cmd(0xE0, Opcode, NonData, false, false, "STANDBY_IMMEDIATE"),
    cmd(0x5B, Opcode, NonData, false, false, "TRUSTED_NONDATA"),
    cmd(0x5C, Opcode, PioIn, false, false, "TRUSTED_RECEIVE"),
    cmd(0x5D, Opcode, Dma, false, false, "TRUSTED_RECEIVE_DMA"),
    cmd(0x5E, Opcode, NonData, false, false, "TRUSTED_SEND"),
    cmd(0x5F, Opcode, Dma, false, false, "TRUSTED_SEND_DMA"),
    cmd(0xE8, Opcode, PioOut, false, false, "WRITE_BUFFER"),
    cmd(0xEB, Opcode, Dma, false, false, "WRITE_BUFFER_DMA"),
    cmd(0xCA, Opcode, Dma, false, false, "WRITE_DMA"),
    cmd(0x35, Opcode, Dma, false, true, "WRITE_DMA_EXT"),
    cmd(0x3D, Opcode, Dma, false, true, "WRITE_DMA_FUA_EXT"),
    cmd(0x61, Opcode, Dma, true, true, "WRITE_FPDMA_QUEUED"),
    cmd(0x66, Opcode, Dma, false, true, "WRITE_GATHERED_EXT"),
    cmd(0x57, Opcode, Dma, false, true, "WRITE_LOG_DMA_EXT"),
    cmd(0x3F, Opcode, PioOut, false, true, "WRITE_LOG_EXT"),
    cmd(0x30, Opcode, PioOut, false, false, "WRITE_SECTORS"),
    cmd(0x34, Opcode, PioOut, false, true, "WRITE_SECTORS_EXT"),
    cmd(0x3A, Opcode, Dma, false, true, "WRITE_STREAM_DMA_EXT"),
    cmd(0x3B, Opcode, PioOut, false, true, "WRITE_STREAM_EXT"),
    cmd(0x45, Opcode, NonData, false, true, "WRITE_UNCORRECTABLE_EXT"),
    cmd(0x44, Opcode, NonData, false, true, "ZERO_EXT"),
];

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    /// The command block each entry is meant to recognise
    fn designed_encoding(c: &AtaCommand) -> Vec<u8> {
        let mut cdb = vec![0u8; c.cdb_size()];
        let feature = if c.lba48 { 1 } else { 0 };
        match c.matches {
            Match::Opcode => {}
            Match::Feature(f) => {
                if c.lba48 {
                    cdb[0..2].copy_from_slice(&f.to_be_bytes());
                } else {
                    cdb[0] = f as u8;
                }
            }
            Match::FeatureLowNibble(n) => cdb[feature] = n,
            Match::CountHighNibble(n) => {
                // A 28-bit count field has no bits 11:8
                assert!(c.lba48, "{}", c.name);
                cdb[2] = n;
            }
        }
        *cdb.last_mut().unwrap() = c.opcode;
        cdb
    }

    #[test]
    fn every_entry_resolves_to_itself() {
        for c in ATA_COMMANDS {
            let cdb = designed_encoding(c);
            let found = find(&cdb).unwrap();
            assert_eq!(found, c, "{} resolved to {}", c.name, found.name);
        }
    }

    #[test]
    fn no_opcode_entry_shadows_a_later_one() {
        for (i, c) in ATA_COMMANDS.iter().enumerate() {
            if c.matches == Match::Opcode {
                assert!(
                    ATA_COMMANDS[i + 1..].iter().all(|d| d.opcode != c.opcode),
                    "{} shadows a later entry",
                    c.name
                );
            }
        }
    }

    #[test]
    fn names_unique() {
        for (i, c) in ATA_COMMANDS.iter().enumerate() {
            assert!(ATA_COMMANDS[i + 1..].iter().all(|d| d.name != c.name));
        }
    }

    #[test]
    fn identify_28bit() {
        let c = find(&[0, 1, 0, 0, 0, 0, 0xA0, 0xEC]).unwrap();
        assert_eq!(c.name, "IDENTIFY_DEVICE");
        assert_eq!(c.protocol, Protocol::PioIn);
        assert!(!c.lba48);
        assert_eq!(c.cdb_size(), 8);
    }

    #[test]
    fn sanitize_by_feature() {
        let mut cdb = [0u8; 12];
        cdb[11] = 0xB4;
        cdb[1] = 0x12;
        assert_eq!(find(&cdb).unwrap().name, "BLOCK_ERASE_EXT");
        cdb[1] = 0x40;
        assert_eq!(find(&cdb).unwrap().name, "SANITIZE_ANTIFREEZE_LOCK_EXT");
        // High byte of a 48-bit feature field counts too
        cdb[0] = 0x01;
        assert_eq!(find(&cdb), None);
    }

    #[test]
    fn ncq_non_data_ignores_high_feature_bits() {
        let mut cdb = [0u8; 12];
        cdb[11] = 0x63;
        cdb[1] = 0xF5;
        assert_eq!(find(&cdb).unwrap().name, "NCQ_NON_DATA/SET_FEATURES");
    }

    #[test]
    fn send_fpdma_by_count() {
        let mut cdb = [0u8; 12];
        cdb[11] = 0x64;
        cdb[2] = 0xF2;
        cdb[3] = 0xFF;
        let c = find(&cdb).unwrap();
        assert_eq!(c.name, "SEND_FPDMA_QUEUED/WRITE_LOG_DMA_EXT");
        assert!(c.ncq);
        cdb[2] = 0x06;
        assert_eq!(find(&cdb), None);
    }

    #[test]
    fn smart_28bit_feature() {
        let cdb = [0xDA, 0, 0, 0x4F, 0xC2, 0, 0xA0, 0xB0];
        assert_eq!(find(&cdb).unwrap().name, "SMART_RETURN_STATUS");
        let cdb = [0xD0, 0, 0, 0x4F, 0xC2, 0, 0xA0, 0xB0];
        assert_eq!(find(&cdb), None);
    }

    #[test]
    fn unknown_opcode() {
        assert_eq!(find(&[0u8, 0, 0, 0, 0, 0, 0, 0xFF]), None);
        assert_eq!(find(&[]), None);
    }
}
