use nix::errno::Errno;

/// What was being done to the device when something went wrong
#[non_exhaustive]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Stage {
    /// Checking and opening the device node
    Open,
    /// Gathering identity, capacity and ATA details
    Information,
    /// Asking the kernel to rescan the device
    Revalidate,
    /// Running a user-supplied command
    Execute,
}

impl ::core::fmt::Display for Stage {
    fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
        f.write_str(match self {
            Self::Open => "open",
            Self::Information => "get device information",
            Self::Revalidate => "revalidate",
            Self::Execute => "command",
        })
    }
}

/// The underlying failure
#[non_exhaustive]
#[derive(Debug)]
pub enum Cause {
    /// A file or sysfs operation failed
    Io(::std::io::Error),
    /// A SCSI command failed, or was never issued
    Scsi(cotton_scsi::Error<Errno>),
}

impl ::core::fmt::Display for Cause {
    fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "{e}"),
            Self::Scsi(e) => write!(f, "{e}"),
        }
    }
}

/// An error, with the device and stage it happened at
#[derive(Debug)]
pub struct Error {
    /// Device name, or the path if the name isn't known yet
    pub device: String,
    pub stage: Stage,
    pub cause: Cause,
}

impl Error {
    pub fn io(device: &str, stage: Stage, e: ::std::io::Error) -> Self {
        Self {
            device: device.to_string(),
            stage,
            cause: Cause::Io(e),
        }
    }

    pub fn scsi(
        device: &str,
        stage: Stage,
        e: cotton_scsi::Error<Errno>,
    ) -> Self {
        Self {
            device: device.to_string(),
            stage,
            cause: Cause::Scsi(e),
        }
    }
}

impl ::core::fmt::Display for Error {
    fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
        write!(f, "{}: {} failed: {}", self.device, self.stage, self.cause)
    }
}

impl ::std::error::Error for Error {
    fn source(&self) -> Option<&(dyn ::std::error::Error + 'static)> {
        match &self.cause {
            Cause::Io(e) => Some(e),
            Cause::Scsi(e) => Some(e),
        }
    }
}
