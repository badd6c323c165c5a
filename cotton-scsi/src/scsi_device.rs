use crate::ata::{self, log, AcsVersion};
use crate::cdb::{CdbError, CdbType, CDB_MAX_SIZE};
use crate::config::{CommandFlags, Config};
use crate::debug::verbose;
use crate::device_info::{
    trimmed_ascii, AtaInfo, DeviceInfo, SatIdentity,
    ATA_INFORMATION_VPD_LENGTH, ATA_INFORMATION_VPD_PAGE,
};
#[cfg(feature = "std")]
use crate::hex_dump::HexDump;
use crate::scsi_transport::{
    DataPhase, Error, Request, ScsiTransport, SENSE_MAX_LENGTH,
};
use crate::sense::{self, Sense};

/// READ CAPACITY (16)
/// Seagate SCSI Commands Reference Manual s3.23.2
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "std", derive(Debug))]
#[derive(Copy, Clone)]
#[repr(C)]
struct ReadCapacity16 {
    operation_code: u8,
    service_action: u8,
    lba_be: [u8; 8],
    allocation_length_be: [u8; 4],
    reserved: u8,
    control: u8,
}

impl ReadCapacity16 {
    fn new() -> Self {
        assert!(core::mem::size_of::<Self>() == 16);
        Self {
            operation_code: 0x9E,
            service_action: 0x10,
            lba_be: [0u8; 8],
            allocation_length_be: 32u32.to_be_bytes(),
            reserved: 0,
            control: 0,
        }
    }
}

// SAFETY: all fields zeroable
unsafe impl bytemuck::Zeroable for ReadCapacity16 {}
// SAFETY: no padding, no disallowed bit patterns
unsafe impl bytemuck::Pod for ReadCapacity16 {}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "std", derive(Debug))]
#[derive(Copy, Clone, Default)]
#[repr(C)]
pub(crate) struct ReadCapacity16Reply {
    pub(crate) lba: [u8; 8],
    pub(crate) block_size: [u8; 4],
    /// Byte 13, bits 3:0: logical blocks per physical block exponent
    pub(crate) flags: [u8; 2],
    pub(crate) lowest_aligned_lba: [u8; 2],
    pub(crate) reserved: [u8; 16],
}

// SAFETY: all fields zeroable
unsafe impl bytemuck::Zeroable for ReadCapacity16Reply {}
// SAFETY: no padding, no disallowed bit patterns
unsafe impl bytemuck::Pod for ReadCapacity16Reply {}

/// INQUIRY
/// Seagate SCSI Commands Reference Manual s3.6
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "std", derive(Debug))]
#[derive(Copy, Clone)]
#[repr(C)]
struct Inquiry {
    operation_code: u8,
    evpd: u8,
    page_code: u8,
    allocation_length_be: [u8; 2],
    control: u8,
}

impl Inquiry {
    fn new(evpd: Option<u8>, len: u16) -> Self {
        assert!(core::mem::size_of::<Self>() == 6);
        Self {
            operation_code: 0x12,
            evpd: evpd.is_some() as u8,
            page_code: evpd.unwrap_or_default(),
            allocation_length_be: len.to_be_bytes(),
            control: 0,
        }
    }
}

// SAFETY: all fields zeroable
unsafe impl bytemuck::Zeroable for Inquiry {}
// SAFETY: no padding, no disallowed bit patterns
unsafe impl bytemuck::Pod for Inquiry {}

/// Standard INQUIRY data
/// Seagate SCSI Commands Reference Manual s3.6.2
///
/// This is the compulsory leading 36 bytes; the actual data might be
/// larger (but the device truncates it, and tells us that it's done
/// so via the residual count).
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "std", derive(Debug))]
#[derive(Copy, Clone, Default)]
#[repr(C)]
pub(crate) struct StandardInquiryData {
    pub(crate) peripheral_device_type: u8,
    pub(crate) removable: u8,
    pub(crate) version: u8,
    pub(crate) data_format: u8,
    pub(crate) additional_length: u8,
    pub(crate) flags: [u8; 3],
    pub(crate) vendor_id: [u8; 8],
    pub(crate) product_id: [u8; 16],
    pub(crate) product_revision: [u8; 4],
}

// SAFETY: all fields zeroable
unsafe impl bytemuck::Zeroable for StandardInquiryData {}
// SAFETY: no padding, no disallowed bit patterns
unsafe impl bytemuck::Pod for StandardInquiryData {}

/// Identity strings from standard INQUIRY data
#[cfg_attr(feature = "std", derive(Debug))]
#[derive(Clone, Default, PartialEq, Eq)]
pub struct InquiryData {
    pub vendor: alloc::string::String,
    pub product: alloc::string::String,
    pub revision: alloc::string::String,
}

/// Sizes from READ CAPACITY (16)
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "std", derive(Debug))]
#[derive(Copy, Clone, Default, PartialEq, Eq)]
pub struct Capacity {
    pub logical_block_size: u32,
    pub physical_block_size: u32,
    /// In 512-byte sectors
    pub sectors: u64,
}

/// The outcome of one successfully-executed command
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "std", derive(Debug))]
#[derive(Copy, Clone, Default, PartialEq, Eq)]
pub struct Executed {
    /// Bytes actually transferred: requested minus residual
    pub transferred: usize,
    /// Bytes requested but not transferred
    pub residual: usize,
    /// Non-error sense data, if any came back
    pub sense: Option<Sense>,
    /// For ATA commands, the command recognised
    pub ata_command: Option<&'static str>,
}

/// A SCSI device, reached through some [`ScsiTransport`]
///
/// Commands run one at a time, to completion, each with a fresh sense
/// buffer; nothing is retried.
pub struct ScsiDevice<T: ScsiTransport> {
    transport: T,
    config: Config,
}

impl<T: ScsiTransport> ScsiDevice<T> {
    pub fn new(transport: T, config: Config) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Execute one command
    ///
    /// A SCSI command block is issued as-is. An ATA command block is
    /// first recognised and translated into ATA PASSTHROUGH (16); this
    /// needs a device behind SCSI/ATA translation (`Config::ata`).
    /// Nothing reaches the transport unless the command block is valid.
    pub fn execute(
        &mut self,
        cdb: &[u8],
        cdb_type: CdbType,
        mut data: DataPhase<'_>,
        flags: CommandFlags,
    ) -> Result<Executed, Error<T::Error>> {
        if cdb.is_empty() {
            return Err(CdbError::Empty.into());
        }
        if cdb.len() > CDB_MAX_SIZE {
            return Err(CdbError::TooLong.into());
        }

        let requested = data.len();
        let mut ata_command = None;
        let passthrough;
        let cdb = match cdb_type {
            CdbType::Scsi => cdb,
            CdbType::Ata => {
                if !self.config.ata {
                    return Err(Error::NotAta);
                }
                let (cmd, pt) = ata::passthrough::prepare(
                    cdb,
                    data.direction(),
                    requested,
                    flags,
                )?;
                verbose!(self.config, "ATA command {}", cmd.name);
                ata_command = Some(cmd.name);
                passthrough = pt;
                passthrough.as_bytes()
            }
        };

        #[cfg(feature = "std")]
        verbose!(self.config, "CDB ({} bytes)\n{}", cdb.len(), HexDump(cdb));

        let mut sense_buf = [0u8; SENSE_MAX_LENGTH];
        let completion = self.transport.command(Request {
            cdb,
            data: data.reborrow(),
            sense: &mut sense_buf,
            timeout_ms: self.config.timeout_ms,
            queue: self.config.queue,
        })?;

        let residual = (completion.residual as usize).min(requested);
        let transferred = requested - residual;
        if residual != 0 {
            verbose!(
                self.config,
                "residual {residual} of {requested} bytes"
            );
        }

        #[cfg(feature = "std")]
        let sense_length =
            (completion.sense_length as usize).min(SENSE_MAX_LENGTH);
        #[cfg(feature = "std")]
        if let Some(s) = Sense::parse(&sense_buf[..sense_length]) {
            verbose!(
                self.config,
                "sense key 0x{:x}, asc/ascq 0x{:04x}",
                s.key,
                s.asc_ascq()
            );
        }
        let sense = sense::check(&completion, &sense_buf)?;

        #[cfg(feature = "std")]
        if let DataPhase::In(buf) = &data {
            verbose!(
                self.config,
                "{transferred} bytes in\n{}",
                HexDump(&buf[..transferred])
            );
        }

        Ok(Executed {
            transferred,
            residual,
            sense,
            ata_command,
        })
    }

    fn command_in(
        &mut self,
        cdb: &[u8],
        buf: &mut [u8],
    ) -> Result<usize, Error<T::Error>> {
        let executed = self.execute(
            cdb,
            CdbType::Scsi,
            DataPhase::In(buf),
            CommandFlags::empty(),
        )?;
        Ok(executed.transferred)
    }

    fn command_response<
        C: bytemuck::Pod,
        R: bytemuck::NoUninit + bytemuck::AnyBitPattern + Default,
    >(
        &mut self,
        cmd: C,
    ) -> Result<R, Error<T::Error>> {
        let mut r = R::default();
        let sz = self.command_in(
            bytemuck::bytes_of(&cmd),
            bytemuck::bytes_of_mut(&mut r),
        )?;
        if sz < core::mem::size_of::<R>() {
            return Err(Error::ProtocolError);
        }
        Ok(r)
    }

    /// Standard INQUIRY: vendor, product and revision strings
    pub fn inquiry(&mut self) -> Result<InquiryData, Error<T::Error>> {
        let reply: StandardInquiryData =
            self.command_response(Inquiry::new(None, 36))?;
        Ok(InquiryData {
            vendor: trimmed_ascii(&reply.vendor_id),
            product: trimmed_ascii(&reply.product_id),
            revision: trimmed_ascii(&reply.product_revision),
        })
    }

    /// Read capacity (64-bit LBA version)
    pub fn read_capacity_16(&mut self) -> Result<Capacity, Error<T::Error>> {
        let reply: ReadCapacity16Reply =
            self.command_response(ReadCapacity16::new())?;
        let last_lba = u64::from_be_bytes(reply.lba);
        let logical_block_size = u32::from_be_bytes(reply.block_size);
        let exponent = reply.flags[1] & 0xF;
        Ok(Capacity {
            logical_block_size,
            physical_block_size: logical_block_size << exponent,
            sectors: last_lba
                .saturating_add(1)
                .saturating_mul(logical_block_size as u64)
                >> 9,
        })
    }

    /// INQUIRY for a Vital Product Data page; returns the bytes received
    pub fn vpd_inquiry(
        &mut self,
        page: u8,
        buf: &mut [u8],
    ) -> Result<usize, Error<T::Error>> {
        let len = buf.len().min(u16::MAX as usize) as u16;
        let cmd = Inquiry::new(Some(page), len);
        self.command_in(bytemuck::bytes_of(&cmd), buf)
    }

    /// The SAT layer's own identity, from VPD page 0x89
    pub fn sat_identity(&mut self) -> Result<SatIdentity, Error<T::Error>> {
        let mut page = [0u8; ATA_INFORMATION_VPD_LENGTH as usize];
        let n = self.vpd_inquiry(ATA_INFORMATION_VPD_PAGE, &mut page)?;
        SatIdentity::parse(&page[..n]).ok_or(Error::ProtocolError)
    }

    /// Read whole pages of an ATA log into `buf`
    ///
    /// Goes through the SCSI path: the PASSTHROUGH command is built here,
    /// not translated from a taskfile.
    pub fn read_log(
        &mut self,
        log: u8,
        page: u16,
        initialize: bool,
        buf: &mut [u8],
    ) -> Result<usize, Error<T::Error>> {
        let cdb = log::read_log_dma_ext(log, page, initialize, buf.len())?;
        self.command_in(cdb.as_bytes(), buf)
    }

    /// Number of pages in an ATA log, zero if it's unsupported
    pub fn log_page_count(&mut self, log: u8) -> Result<u16, Error<T::Error>> {
        let mut dir = [0u8; log::LOG_PAGE_SIZE];
        self.read_log(log::GENERAL_PURPOSE_LOG_DIRECTORY, 0, false, &mut dir)?;
        log::log_page_count(&dir, log).ok_or(Error::ProtocolError)
    }

    /// Newest ATA command set the device claims to support
    pub fn acs_version(&mut self) -> Result<AcsVersion, Error<T::Error>> {
        let mut page = [0u8; log::LOG_PAGE_SIZE];
        let n = self.read_log(
            log::IDENTIFY_DEVICE_DATA,
            log::IDENTIFY_DEVICE_DATA_COPY,
            false,
            &mut page,
        )?;
        AcsVersion::parse(&page[..n])
    }

    /// Everything this module knows how to find out about the device
    ///
    /// The ATA part is only attempted for ATA devices.
    pub fn information(&mut self) -> Result<DeviceInfo, Error<T::Error>> {
        let id = self.inquiry()?;
        let capacity = self.read_capacity_16()?;
        let ata = if self.config.ata {
            let sat = self.sat_identity()?;
            let acs_version = self.acs_version()?;
            Some(AtaInfo { acs_version, sat })
        } else {
            None
        };
        Ok(DeviceInfo {
            vendor: id.vendor,
            product: id.product,
            revision: id.revision,
            logical_block_size: capacity.logical_block_size,
            physical_block_size: capacity.physical_block_size,
            capacity: capacity.sectors,
            ata,
        })
    }
}

#[cfg(all(test, feature = "std"))]
#[path = "tests/scsi_device.rs"]
pub(crate) mod tests;
