//! ATA commands carried over SCSI/ATA Translation (SAT)

pub mod command_table;
pub mod log;
pub mod passthrough;

pub use command_table::{AtaCommand, Match, Protocol, ATA_COMMANDS};
pub use log::AcsVersion;
pub use passthrough::AtaPassthrough16;
