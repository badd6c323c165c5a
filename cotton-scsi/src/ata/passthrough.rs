use super::command_table::{self, AtaCommand, Protocol, LBA48_CDB_SIZE};
use crate::cdb::CdbError;
use crate::config::CommandFlags;
use crate::scsi_transport::{Direction, Error};

/// ATA PASSTHROUGH (16)
/// T10 SAT-4 s12.2.2.3
///
/// Byte 2 is `off_line:2 ck_cond:1 t_type:1 t_dir:1 byte_block:1
/// t_length:2`. The LBA is scattered so that the low 24 bits sit where
/// a 28-bit command expects them.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct AtaPassthrough16 {
    operation_code: u8,
    protocol_extend: u8,
    transfer: u8,
    features_be: [u8; 2],
    count_be: [u8; 2],
    /// LBA 31:24, 7:0, 39:32, 15:8, 47:40, 23:16
    lba_scattered: [u8; 6],
    device: u8,
    command: u8,
    control: u8,
}

// SAFETY: all fields zeroable
unsafe impl bytemuck::Zeroable for AtaPassthrough16 {}
// SAFETY: no padding, no disallowed bit patterns
unsafe impl bytemuck::Pod for AtaPassthrough16 {}

/// SCSI operation code of ATA PASSTHROUGH (16)
pub const OPERATION_CODE: u8 = 0x85;

/// Byte 2 bits
const T_TYPE: u8 = 1 << 4;
const T_DIR_FROM_DEVICE: u8 = 1 << 3;
const BYTE_BLOCK: u8 = 1 << 2;
/// Transfer length is in the feature field
const T_LENGTH_FEATURE: u8 = 1;
/// Transfer length is in the count field
const T_LENGTH_COUNT: u8 = 2;

/// Protocol field value for any NCQ command
const PROTOCOL_FPDMA: u8 = 0x0C;

/// Bit position of each LBA byte within `lba_scattered`
const LBA_SHIFTS: [u32; 6] = [24, 0, 32, 8, 40, 16];

impl Default for AtaPassthrough16 {
    fn default() -> Self {
        Self::new()
    }
}

impl AtaPassthrough16 {
    /// All-zero command with just the operation code set
    pub fn new() -> Self {
        assert!(core::mem::size_of::<Self>() == 16);
        Self {
            operation_code: OPERATION_CODE,
            protocol_extend: 0,
            transfer: 0,
            features_be: [0; 2],
            count_be: [0; 2],
            lba_scattered: [0; 6],
            device: 0,
            command: 0,
            control: 0,
        }
    }

    /// The 16-byte CDB as sent
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    /// The 4-bit SAT protocol code
    pub fn protocol(&self) -> u8 {
        (self.protocol_extend >> 1) & 0xF
    }

    /// True for 48-bit commands
    pub fn extend(&self) -> bool {
        self.protocol_extend & 1 != 0
    }

    /// Set the SAT protocol code and the 48-bit flag
    pub fn set_protocol(&mut self, protocol: u8, extend: bool) {
        self.protocol_extend = ((protocol & 0xF) << 1) | extend as u8;
    }

    /// Byte 2 as a whole
    pub fn transfer(&self) -> u8 {
        self.transfer
    }

    /// Feature field (high byte only used by 48-bit commands)
    pub fn features(&self) -> u16 {
        u16::from_be_bytes(self.features_be)
    }

    /// Set the feature field
    pub fn set_features(&mut self, features: u16) {
        self.features_be = features.to_be_bytes();
    }

    /// Count field
    pub fn count(&self) -> u16 {
        u16::from_be_bytes(self.count_be)
    }

    /// Set the count field
    pub fn set_count(&mut self, count: u16) {
        self.count_be = count.to_be_bytes();
    }

    /// 48-bit LBA, gathered from its scattered bytes
    pub fn lba(&self) -> u64 {
        self.lba_scattered
            .iter()
            .zip(LBA_SHIFTS)
            .fold(0, |lba, (&b, shift)| lba | ((b as u64) << shift))
    }

    /// Bits above 47 are ignored
    pub fn set_lba(&mut self, lba: u64) {
        for (b, shift) in self.lba_scattered.iter_mut().zip(LBA_SHIFTS) {
            *b = (lba >> shift) as u8;
        }
    }

    /// Device register
    pub fn device(&self) -> u8 {
        self.device
    }

    /// Set the device register
    pub fn set_device(&mut self, device: u8) {
        self.device = device;
    }

    /// ATA command opcode
    pub fn command(&self) -> u8 {
        self.command
    }

    /// Set the ATA command opcode
    pub fn set_command(&mut self, command: u8) {
        self.command = command;
    }
}

fn protocol_code(cmd: &AtaCommand) -> u8 {
    if cmd.ncq {
        return PROTOCOL_FPDMA;
    }
    match cmd.protocol {
        Protocol::NonData => 0x03,
        Protocol::PioIn => 0x04,
        Protocol::PioOut => 0x05,
        Protocol::Dma => 0x06,
        Protocol::ExecuteDiagnostic => 0x08,
    }
}

/// Wrap a recognised ATA command block in ATA PASSTHROUGH (16)
///
/// `ata_cdb` must already be the size `cmd` requires (see
/// [`prepare`]). `transfer_len` only matters insofar as it is zero or
/// not: the device takes the actual length from the feature (NCQ) or
/// count field of the ATA command itself.
pub fn translate(
    cmd: &AtaCommand,
    ata_cdb: &[u8],
    direction: Direction,
    transfer_len: usize,
    flags: CommandFlags,
) -> AtaPassthrough16 {
    let mut pt = AtaPassthrough16::new();
    pt.set_protocol(protocol_code(cmd), cmd.lba48);

    let mut transfer = match (transfer_len, cmd.ncq) {
        (0, _) => 0,
        (_, true) => T_LENGTH_FEATURE,
        (_, false) => T_LENGTH_COUNT,
    };
    if !flags.contains(CommandFlags::ATA_ZERO_BYTE_BLOCK) {
        transfer |= BYTE_BLOCK;
    }
    if flags.contains(CommandFlags::ATA_LOGICAL_BLOCK_LENGTH) {
        transfer |= T_TYPE;
    }
    if direction == Direction::FromDevice {
        transfer |= T_DIR_FROM_DEVICE;
    }
    pt.transfer = transfer;

    if cmd.lba48 {
        pt.set_features(u16::from_be_bytes([ata_cdb[0], ata_cdb[1]]));
        pt.set_count(u16::from_be_bytes([ata_cdb[2], ata_cdb[3]]));
        let lba = ata_cdb[4..10]
            .iter()
            .fold(0u64, |lba, &b| (lba << 8) | b as u64);
        pt.set_lba(lba);
        pt.set_device(ata_cdb[10]);
        pt.set_command(ata_cdb[11]);
    } else {
        pt.set_features(ata_cdb[0] as u16);
        pt.set_count(ata_cdb[1] as u16);
        let lba = u32::from_be_bytes([
            ata_cdb[2] & 0x0F,
            ata_cdb[3],
            ata_cdb[4],
            ata_cdb[5],
        ]);
        pt.set_lba(lba as u64);
        pt.set_device(ata_cdb[6]);
        pt.set_command(ata_cdb[7]);
    }

    pt
}

/// Validate and recognise an ATA command block, then translate it
pub fn prepare<T: PartialEq + Eq>(
    ata_cdb: &[u8],
    direction: Direction,
    transfer_len: usize,
    flags: CommandFlags,
) -> Result<(&'static AtaCommand, AtaPassthrough16), Error<T>> {
    let len = ata_cdb.len();
    if len != command_table::LBA28_CDB_SIZE && len != LBA48_CDB_SIZE {
        return Err(CdbError::InvalidAtaSize(len).into());
    }
    let cmd = command_table::find(ata_cdb).ok_or(Error::UnknownAtaCommand)?;
    if len != cmd.cdb_size() {
        return Err(CdbError::AddressingMismatch {
            name: cmd.name,
            expected: cmd.cdb_size(),
        }
        .into());
    }
    Ok((cmd, translate(cmd, ata_cdb, direction, transfer_len, flags)))
}
