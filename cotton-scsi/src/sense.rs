//! Sense data decoding and completion classification
//!
//! See Seagate SCSI Commands Reference Manual s2.4.

use crate::scsi_transport::{Completion, Error, ScsiError};

/// The interesting part of a sense buffer
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Sense {
    pub key: u8,
    /// Additional sense code
    pub asc: u8,
    /// Additional sense code qualifier
    pub ascq: u8,
}

/// Sense key NO SENSE
pub const NO_SENSE: u8 = 0;
/// Sense key RECOVERED ERROR
pub const RECOVERED_ERROR: u8 = 1;

/// SCSI status GOOD
const STATUS_GOOD: u8 = 0x00;
/// SCSI status CONDITION MET
const STATUS_CONDITION_MET: u8 = 0x04;

/// Linux DRIVER_SENSE: not an error, just "the sense buffer is valid"
const DRIVER_SENSE: u16 = 0x08;
const DRIVER_STATUS_MASK: u16 = 0x0F;

impl Sense {
    /// Decode fixed-format (0x70/0x71) or descriptor-format (0x72/0x73)
    /// sense data
    ///
    /// Returns `None` if the buffer is too short for its format, or is
    /// not sense data at all.
    pub fn parse(buf: &[u8]) -> Option<Self> {
        match buf.first()? & 0x7F {
            0x70 | 0x71 if buf.len() >= 14 => Some(Self {
                key: buf[2] & 0xF,
                asc: buf[12],
                ascq: buf[13],
            }),
            0x72 | 0x73 if buf.len() >= 4 => Some(Self {
                key: buf[1] & 0xF,
                asc: buf[2],
                ascq: buf[3],
            }),
            _ => None,
        }
    }

    /// ASC and ASCQ as one value, ASC in the high byte
    pub fn asc_ascq(&self) -> u16 {
        u16::from_be_bytes([self.asc, self.ascq])
    }

    /// True for sense keys which do not indicate failure
    pub fn is_success(&self) -> bool {
        self.key == NO_SENSE || self.key == RECOVERED_ERROR
    }

    /// Map well-known sense combinations onto [`ScsiError`]
    ///
    /// The most specific match wins: key/ASC/ASCQ, then key/ASC, then
    /// key alone.
    pub fn to_error(&self) -> Option<ScsiError> {
        const ERRORS3: &[(u8, u8, u8, ScsiError)] = &[
            (2, 4, 1, ScsiError::BecomingReady),
            (2, 4, 2, ScsiError::StartUnitRequired),
            (2, 4, 3, ScsiError::ManualInterventionRequired),
            (2, 4, 4, ScsiError::FormatInProgress),
            (2, 4, 9, ScsiError::SelfTestInProgress),
            (2, 4, 0x22, ScsiError::PowerCycleRequired),
            (1, 0x0B, 0x01, ScsiError::Overheat),
            (1, 0x0B, 0x02, ScsiError::EnclosureDegraded),
            (3, 0x0C, 0x00, ScsiError::WriteError),
            (3, 0x0C, 0x02, ScsiError::WriteReallocationFailed),
            (1, 0x11, 0x00, ScsiError::UnrecoveredReadError),
            (1, 0x11, 0x01, ScsiError::ReadRetriesExhausted),
            (1, 0x11, 0x02, ScsiError::ReadErrorTooLong),
            (3, 0x11, 0x04, ScsiError::ReadReallocationFailed),
            (3, 0x14, 0x00, ScsiError::LogicalBlockNotFound),
            (3, 0x14, 0x01, ScsiError::RecordNotFound),
            (5, 0x26, 0x00, ScsiError::InvalidFieldInParameterList),
            (5, 0x26, 0x01, ScsiError::ParameterNotSupported),
            (5, 0x26, 0x02, ScsiError::ParameterValueInvalid),
            (4, 0x3E, 0x03, ScsiError::LogicalUnitSelfTestFailed),
            (4, 0x42, 0x00, ScsiError::SelfTestFailed),
        ];
        const ERRORS2: &[(u8, u8, ScsiError)] = &[
            (3, 0x14, ScsiError::PositioningError),
            (5, 0x1A, ScsiError::ParameterListLengthError),
            (0xE, 0x1D, ScsiError::MiscompareDuringVerify),
            (5, 0x20, ScsiError::InvalidCommandOperationCode),
            (0xD, 0x21, ScsiError::LogicalBlockAddressOutOfRange),
            (5, 0x24, ScsiError::InvalidFieldInCDB),
            (5, 0x25, ScsiError::LogicalUnitNotSupported),
        ];
        const ERRORS1: &[(u8, ScsiError)] = &[
            (2, ScsiError::NotReady),
            (3, ScsiError::MediumError),
            (4, ScsiError::HardwareError),
            (5, ScsiError::IllegalRequest),
            (6, ScsiError::UnitAttention),
            (7, ScsiError::DataProtect),
            (8, ScsiError::BlankCheck),
            (9, ScsiError::VendorSpecific),
            (10, ScsiError::CopyAborted),
            (11, ScsiError::Aborted),
            (13, ScsiError::VolumeOverflow),
            (14, ScsiError::Miscompare),
        ];

        ERRORS3
            .iter()
            .find(|e| e.0 == self.key && e.1 == self.asc && e.2 == self.ascq)
            .map(|e| e.3)
            .or_else(|| {
                ERRORS2
                    .iter()
                    .find(|e| e.0 == self.key && e.1 == self.asc)
                    .map(|e| e.2)
            })
            .or_else(|| {
                ERRORS1.iter().find(|e| e.0 == self.key).map(|e| e.1)
            })
    }
}

/// Classify a completed command
///
/// `sense` is the whole sense buffer; only the first
/// `completion.sense_length` bytes of it are looked at. On success,
/// returns any (non-error) sense that came back: ATA PASSTHROUGH
/// commands with CK_COND use this to return ATA registers.
pub fn check<T: PartialEq + Eq>(
    completion: &Completion,
    sense: &[u8],
) -> Result<Option<Sense>, Error<T>> {
    let driver_status = completion.driver_status & DRIVER_STATUS_MASK;
    if completion.host_status != 0
        || (driver_status != 0 && driver_status != DRIVER_SENSE)
    {
        return Err(Error::HostStatus {
            host_status: completion.host_status,
            driver_status: completion.driver_status,
        });
    }

    let len = (completion.sense_length as usize).min(sense.len());
    if let Some(s) = Sense::parse(&sense[..len]) {
        if s.is_success() {
            return Ok(Some(s));
        }
        return Err(s.to_error().map_or(Error::CheckCondition(s), Error::Scsi));
    }

    match completion.status {
        STATUS_GOOD | STATUS_CONDITION_MET => Ok(None),
        _ => Err(Error::CommandFailed),
    }
}
