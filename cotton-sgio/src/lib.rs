//! Linux SG_IO transport and device sessions for `cotton-scsi`
//!
//! This crate opens block (or sg) device nodes, issues SCSI and
//! translated ATA commands to them with the SG_IO ioctl, and pokes sysfs
//! to rescan them. It also holds the logic behind the `sgio` command.

pub mod cli;
pub mod device;
pub use device::{Device, Options};
mod error;
pub use error::{Cause, Error, Stage};
pub mod sg_io;
pub use sg_io::SgIo;
pub mod sysfs;
pub use sysfs::{Attribute, Sysfs};
