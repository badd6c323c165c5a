use crate::error::{Error, Stage};
use crate::sg_io::SgIo;
use crate::sysfs::{Attribute, Sysfs};
use cotton_scsi::{
    Cdb, CdbType, CommandFlags, Config, DataPhase, DeviceInfo, Direction,
    Executed, QueuePosition, ScsiDevice,
};
use std::fs::File;
use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};
use std::path::{Path, PathBuf};

/// How to open a device
#[derive(Debug, Clone)]
pub struct Options {
    pub verbose: bool,
    pub timeout_ms: u32,
    pub queue: QueuePosition,
    pub sysfs: Sysfs,
}

impl Default for Options {
    fn default() -> Self {
        let config = Config::default();
        Self {
            verbose: config.verbose,
            timeout_ms: config.timeout_ms,
            queue: config.queue,
            sysfs: Sysfs::default(),
        }
    }
}

/// An open block (or sg) device, and what's been found out about it
///
/// The device node is opened exclusively, and closed on drop.
pub struct Device {
    path: PathBuf,
    scsi: ScsiDevice<SgIo<File>>,
    sysfs: Sysfs,
    info: Option<DeviceInfo>,
}

impl Device {
    /// Open a device node for commands transferring data `direction`
    ///
    /// Only host-to-device transfers need the node opened for writing.
    pub fn open(
        path: impl AsRef<Path>,
        direction: Direction,
        options: Options,
    ) -> Result<Self, Error> {
        let given = path.as_ref().display().to_string();
        let open_err = |e| Error::io(&given, Stage::Open, e);

        let path = std::fs::canonicalize(path.as_ref()).map_err(open_err)?;
        let file_type =
            std::fs::metadata(&path).map_err(open_err)?.file_type();
        if !file_type.is_block_device() && !file_type.is_char_device() {
            return Err(open_err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "not a block or character device",
            )));
        }

        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(direction == Direction::ToDevice)
            .custom_flags(libc::O_EXCL)
            .open(&path)
            .map_err(open_err)?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| given.clone());
        let ata = options
            .sysfs
            .exists(Attribute::AtaInformation { device: &name })
            .map_err(|e| Error::io(&name, Stage::Open, e))?;

        let config = Config {
            name,
            ata,
            verbose: options.verbose,
            timeout_ms: options.timeout_ms,
            queue: options.queue,
        };
        Ok(Self {
            path,
            scsi: ScsiDevice::new(SgIo::new(file), config),
            sysfs: options.sysfs,
            info: None,
        })
    }

    /// Device name, e.g. "sda"
    pub fn name(&self) -> &str {
        &self.scsi.config().name
    }

    /// Canonical path of the device node
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the device sits behind SCSI/ATA translation
    pub fn is_ata(&self) -> bool {
        self.scsi.config().ata
    }

    /// Identity, capacity and (for ATA devices) ACS and SAT details
    ///
    /// Queried from the device the first time only.
    pub fn information(&mut self) -> Result<&DeviceInfo, Error> {
        let info = match self.info.take() {
            Some(info) => info,
            None => self.scsi.information().map_err(|e| {
                Error::scsi(self.name(), Stage::Information, e)
            })?,
        };
        Ok(self.info.insert(info))
    }

    /// Ask the kernel to rescan the device
    pub fn revalidate(&self) -> Result<(), Error> {
        self.sysfs
            .revalidate(self.name(), self.is_ata())
            .map_err(|e| Error::io(self.name(), Stage::Revalidate, e))
    }

    /// Run one SCSI or ATA command
    pub fn execute(
        &mut self,
        cdb: &Cdb,
        cdb_type: CdbType,
        data: DataPhase<'_>,
        flags: CommandFlags,
    ) -> Result<Executed, Error> {
        self.scsi
            .execute(cdb.as_bytes(), cdb_type, data, flags)
            .map_err(|e| Error::scsi(self.name(), Stage::Execute, e))
    }
}
