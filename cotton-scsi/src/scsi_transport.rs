use crate::cdb::CdbError;
use crate::config::QueuePosition;
use crate::sense::Sense;

/// Maximum number of sense bytes a transport is asked to return
pub const SENSE_MAX_LENGTH: usize = 64;

/// The data phase of a SCSI transaction: in, out, or none
///
/// Owning the buffer in the variant means a "no data" command cannot
/// accidentally carry one.
#[cfg_attr(feature = "std", derive(Debug))]
#[derive(PartialEq, Eq)]
pub enum DataPhase<'a> {
    /// The command involves data transfer from device to host
    In(&'a mut [u8]),
    /// The command involves data transfer from host to device
    Out(&'a [u8]),
    /// The command does not involve data transfer (the status response
    /// includes everything the host needs)
    None,
}

impl DataPhase<'_> {
    /// The number of bytes the command asks to transfer
    pub fn len(&self) -> usize {
        match self {
            DataPhase::In(buf) => buf.len(),
            DataPhase::Out(buf) => buf.len(),
            DataPhase::None => 0,
        }
    }

    /// True if no bytes are to be transferred
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The transfer direction, without the buffer
    pub fn direction(&self) -> Direction {
        match self {
            DataPhase::In(_) => Direction::FromDevice,
            DataPhase::Out(_) => Direction::ToDevice,
            DataPhase::None => Direction::None,
        }
    }

    /// Borrow the same buffer again for a shorter lifetime
    pub fn reborrow(&mut self) -> DataPhase<'_> {
        match self {
            DataPhase::In(buf) => DataPhase::In(&mut **buf),
            DataPhase::Out(buf) => DataPhase::Out(*buf),
            DataPhase::None => DataPhase::None,
        }
    }
}

/// Which way data moves, if at all
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "std", derive(Debug))]
#[derive(Copy, Clone, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    None,
    /// Device-to-host
    FromDevice,
    /// Host-to-device
    ToDevice,
}

/// Everything a transport needs to submit one command
///
/// The command block is final: for ATA commands it is already the
/// translated ATA PASSTHROUGH(16) CDB.
#[cfg_attr(feature = "std", derive(Debug))]
pub struct Request<'a> {
    /// The raw command block
    pub cdb: &'a [u8],
    /// Data buffer and transfer direction
    pub data: DataPhase<'a>,
    /// Space for sense data; at most [`SENSE_MAX_LENGTH`] bytes
    pub sense: &'a mut [u8],
    /// Transport-level timeout in milliseconds
    pub timeout_ms: u32,
    /// Where the transport should queue the command
    pub queue: QueuePosition,
}

/// Status of a command which the transport did manage to submit
///
/// Field meanings follow the Linux SG_IO header: `status` is the SCSI
/// status byte, `host_status` and `driver_status` are reported by the
/// host adapter and its driver.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "std", derive(Debug))]
#[derive(Copy, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub status: u8,
    pub host_status: u16,
    pub driver_status: u16,
    /// Bytes requested but not transferred
    pub residual: u32,
    /// Bytes of sense data written to the sense buffer
    pub sense_length: u8,
}

/// An abstract SCSI communications channel to a single device
///
/// On Linux this is the SG_IO ioctl on a block or sg device node; in
/// tests it is a mock.
pub trait ScsiTransport {
    /// The type of errors which can arise from the transport itself: for
    /// instance, operating-system errors from the ioctl.
    type Error: PartialEq + Eq;

    /// Execute one command, synchronously
    ///
    /// Returns `Err(Error::Transport(_))` only if the command could not
    /// be submitted or completed at all. A command which the device
    /// itself failed still returns `Ok`, with the details in the
    /// `Completion` and the sense buffer; interpreting those is the
    /// caller's job (see [`crate::sense::check`]).
    fn command(
        &mut self,
        request: Request<'_>,
    ) -> Result<Completion, Error<Self::Error>>;
}

/// Errors which can arise during a SCSI command
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "std", derive(Debug))]
#[derive(Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error<T: PartialEq + Eq> {
    /// The device reported failure, and none of the more specific cases
    /// apply.
    CommandFailed,

    /// The device or transport seemed to deviate from the protocol spec:
    /// for instance, a reply page shorter than its fixed layout, or with
    /// the wrong page code.
    ProtocolError,

    /// The `ScsiTransport` itself (as opposed to the device) reported an
    /// error.
    Transport(T),

    /// The host adapter or its driver failed the command (this includes
    /// timeouts).
    HostStatus { host_status: u16, driver_status: u16 },

    /// The device experienced a well-known error, as reported in sense
    /// data.
    Scsi(ScsiError),

    /// The device reported sense data that does not correspond to any
    /// [`ScsiError`].
    CheckCondition(Sense),

    /// The command block given was not acceptable.
    InvalidCdb(CdbError),

    /// The ATA command block matches no known ATA command.
    UnknownAtaCommand,

    /// An ATA command was issued to a device not managed through SCSI/ATA
    /// translation.
    NotAta,

    /// The IDENTIFY DEVICE data reports no recognisable ACS version (the
    /// major version word is included).
    UnknownAcsVersion(u16),
}

impl<T: PartialEq + Eq> From<CdbError> for Error<T> {
    fn from(e: CdbError) -> Self {
        Error::InvalidCdb(e)
    }
}

impl<T: PartialEq + Eq + core::fmt::Debug> core::fmt::Display for Error<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::CommandFailed => f.write_str("command failed"),
            Self::ProtocolError => f.write_str("protocol error"),
            Self::Transport(e) => write!(f, "transport error: {e:?}"),
            Self::HostStatus {
                host_status,
                driver_status,
            } => write!(
                f,
                "host status 0x{host_status:02x}, driver status 0x{driver_status:02x}"
            ),
            Self::Scsi(e) => write!(f, "SCSI error {e:?}"),
            Self::CheckCondition(s) => write!(
                f,
                "sense key 0x{:x}, asc/ascq 0x{:04x}",
                s.key,
                s.asc_ascq()
            ),
            Self::InvalidCdb(e) => write!(f, "invalid CDB: {e}"),
            Self::UnknownAtaCommand => f.write_str("unknown ATA command"),
            Self::NotAta => f.write_str("not an ATA device"),
            Self::UnknownAcsVersion(v) => {
                write!(f, "unrecognised ACS major version 0x{v:04x}")
            }
        }
    }
}

#[cfg(feature = "std")]
impl<T: PartialEq + Eq + core::fmt::Debug> std::error::Error for Error<T> {}

/// Errors which can be returned over SCSI protocol from the SCSI device
///
/// As opposed to errors detected on the host such as transport errors.
///
/// See Seagate SCSI commands reference s2.4.1.5, 2.4.1.6
///
/// Many of these errors are obscure and/or catastrophic -- hopefully you
/// will never see `ScsiError::Overheat` -- but some are reasonable and
/// common.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
#[non_exhaustive]
pub enum ScsiError {
    BecomingReady,
    StartUnitRequired,
    ManualInterventionRequired,
    FormatInProgress,
    SelfTestInProgress,
    PowerCycleRequired,
    Overheat,
    EnclosureDegraded,
    WriteError,
    WriteReallocationFailed,
    UnrecoveredReadError,
    ReadRetriesExhausted,
    ReadErrorTooLong,
    ReadReallocationFailed,
    LogicalBlockNotFound,
    RecordNotFound,
    InvalidFieldInParameterList,
    ParameterNotSupported,
    ParameterValueInvalid,
    LogicalUnitSelfTestFailed,
    SelfTestFailed,

    PositioningError,
    ParameterListLengthError,
    MiscompareDuringVerify,
    /// The device does not implement this command
    InvalidCommandOperationCode,
    LogicalBlockAddressOutOfRange,
    /// Something is incorrect in the command block itself
    InvalidFieldInCDB,
    LogicalUnitNotSupported,

    NotReady,
    MediumError,
    HardwareError,
    IllegalRequest,
    /// Something has happened to this device that means it should be
    /// re-evaluted (e.g. CD-ROM insertion or ejection)
    UnitAttention,
    /// A write was attempted to a read-only device (or similar)
    DataProtect,
    BlankCheck,
    VendorSpecific,
    CopyAborted,
    Aborted,
    VolumeOverflow,
    Miscompare,
}
