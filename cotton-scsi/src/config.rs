use alloc::string::String;

/// Default transport timeout, milliseconds
pub const DEFAULT_TIMEOUT_MS: u32 = 30_000;

/// Where a transport should insert a command into the device queue
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum QueuePosition {
    #[default]
    Head,
    Tail,
}

/// Per-session settings, fixed when the session starts
#[cfg_attr(feature = "std", derive(Debug))]
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    /// Short device name, used to prefix verbose output
    pub name: String,
    /// The device is an ATA device behind SCSI/ATA translation
    pub ata: bool,
    /// Dump each command block and its results
    pub verbose: bool,
    pub timeout_ms: u32,
    pub queue: QueuePosition,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: String::new(),
            ata: false,
            verbose: false,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            queue: QueuePosition::Head,
        }
    }
}

bitflags::bitflags! {
    /// Per-command adjustments to ATA PASSTHROUGH translation
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct CommandFlags: u8 {
        /// Transfer length counts bytes rather than blocks (BYTE_BLOCK = 0)
        const ATA_ZERO_BYTE_BLOCK = 1 << 0;
        /// Blocks are logical blocks, not 512-byte units (T_TYPE = 1)
        const ATA_LOGICAL_BLOCK_LENGTH = 1 << 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = Config::default();
        assert_eq!(c.timeout_ms, 30_000);
        assert_eq!(c.queue, QueuePosition::Head);
        assert!(!c.ata);
        assert!(!c.verbose);
        assert!(CommandFlags::default().is_empty());
    }
}
