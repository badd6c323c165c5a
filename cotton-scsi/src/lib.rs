//! SCSI and ATA (via SCSI/ATA Translation) commands for storage devices
//!
//! The transport is abstract: see [`ScsiTransport`]. On Linux, the
//! `cotton-sgio` crate supplies one using the SG_IO ioctl.
#![cfg_attr(not(feature = "std"), no_std)]
extern crate alloc;

mod debug;
pub mod ata;
pub use ata::AcsVersion;
pub mod byte_field;
pub mod cdb;
pub use cdb::{Cdb, CdbError, CdbType};
pub mod config;
pub use config::{CommandFlags, Config, QueuePosition};
pub mod device_info;
pub use device_info::{AtaInfo, DeviceInfo, SatIdentity};
pub mod hex_dump;
pub use hex_dump::HexDump;
pub mod scsi_device;
pub use scsi_device::{Capacity, Executed, InquiryData, ScsiDevice};
pub mod scsi_transport;
pub use scsi_transport::{
    Completion, DataPhase, Direction, Error, Request, ScsiError,
    ScsiTransport,
};
pub mod sense;
pub use sense::Sense;
