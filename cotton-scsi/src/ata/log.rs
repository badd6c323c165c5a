//! ATA log pages, read with READ LOG DMA EXT through PASSTHROUGH (16)

use super::command_table;
use super::passthrough::{self, AtaPassthrough16};
use crate::byte_field::get_le16;
use crate::cdb::CdbError;
use crate::config::CommandFlags;
use crate::scsi_transport::{Direction, Error};

/// Size of one log page
pub const LOG_PAGE_SIZE: usize = 512;

/// General Purpose Log Directory: page counts of every log
pub const GENERAL_PURPOSE_LOG_DIRECTORY: u8 = 0x00;
/// Identify Device Data log
pub const IDENTIFY_DEVICE_DATA: u8 = 0x30;
/// Identify Device Data log: copy of IDENTIFY DEVICE data
pub const IDENTIFY_DEVICE_DATA_COPY: u16 = 0x01;

const READ_LOG_DMA_EXT: u8 = 0x47;

/// Byte offset of the major version number (word 80) in IDENTIFY data
const MAJOR_VERSION_OFFSET: usize = 80 * 2;

/// Most pages one READ LOG DMA EXT can transfer
const MAX_PAGES: usize = 0xFFFF;

/// Build READ LOG DMA EXT for `len` bytes (whole pages) of a log
///
/// The page number lands in LBA 23:8, the log address in LBA 7:0.
/// `initialize` sets feature bit 0, which some logs use to reset
/// their contents once read.
///
/// `len` must be a non-zero multiple of [`LOG_PAGE_SIZE`], and at most
/// 65535 pages: a Count of zero would mean 65536 pages to the device.
pub fn read_log_dma_ext<T: PartialEq + Eq>(
    log: u8,
    page: u16,
    initialize: bool,
    len: usize,
) -> Result<AtaPassthrough16, Error<T>> {
    if len == 0 || len % LOG_PAGE_SIZE != 0 || len / LOG_PAGE_SIZE > MAX_PAGES
    {
        return Err(Error::InvalidCdb(CdbError::InvalidValue));
    }
    let count = ((len / LOG_PAGE_SIZE) as u16).to_be_bytes();
    let page = page.to_be_bytes();
    let ata = [
        0,
        initialize as u8,
        count[0],
        count[1],
        0,
        0,
        0,
        page[0],
        page[1],
        log,
        0,
        READ_LOG_DMA_EXT,
    ];
    let cmd = command_table::find(&ata).ok_or(Error::UnknownAtaCommand)?;
    Ok(passthrough::translate(
        cmd,
        &ata,
        Direction::FromDevice,
        len,
        CommandFlags::empty(),
    ))
}

/// Number of pages of `log`, from the General Purpose Log Directory
///
/// Zero means the log is not supported; `None` means the directory is
/// too short to say.
pub fn log_page_count(directory: &[u8], log: u8) -> Option<u16> {
    let offset = log as usize * 2;
    (directory.len() >= offset + 2).then(|| get_le16(directory, offset))
}

/// ATA/ATAPI Command Set generation
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum AcsVersion {
    Ata8Acs = 1,
    Acs2 = 2,
    Acs3 = 3,
    Acs4 = 4,
    Acs5 = 5,
    Acs6 = 6,
}

impl AcsVersion {
    /// Decode the major version number word
    ///
    /// The newest generation whose bit (8 for ATA8-ACS up to 13 for
    /// ACS-6) is set wins. Bits 14 and 15 are generations we don't know.
    pub fn from_major_version(word: u16) -> Option<Self> {
        if word & 0xC000 != 0 {
            return None;
        }
        match (word & 0x3F00).checked_ilog2()? {
            8 => Some(Self::Ata8Acs),
            9 => Some(Self::Acs2),
            10 => Some(Self::Acs3),
            11 => Some(Self::Acs4),
            12 => Some(Self::Acs5),
            13 => Some(Self::Acs6),
            _ => None,
        }
    }

    /// Decode page 1 of the Identify Device Data log
    pub fn parse<T: PartialEq + Eq>(page: &[u8]) -> Result<Self, Error<T>> {
        if page.len() < MAJOR_VERSION_OFFSET + 2 {
            return Err(Error::ProtocolError);
        }
        let word = get_le16(page, MAJOR_VERSION_OFFSET);
        Self::from_major_version(word).ok_or(Error::UnknownAcsVersion(word))
    }

    /// 1 for ATA8-ACS up to 6 for ACS-6
    pub fn ordinal(&self) -> u8 {
        *self as u8
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ata8Acs => "ATA8-ACS",
            Self::Acs2 => "ACS-2",
            Self::Acs3 => "ACS-3",
            Self::Acs4 => "ACS-4",
            Self::Acs5 => "ACS-5",
            Self::Acs6 => "ACS-6",
        }
    }
}

impl core::fmt::Display for AcsVersion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}
