//! The few sysfs attributes needed for ATA detection and rescans

use std::io::Write;
use std::path::{Path, PathBuf};

/// Where sysfs is normally mounted
pub const SYSFS_ROOT: &str = "/sys";

/// A sysfs attribute file
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Attribute<'a> {
    /// VPD page 0x89; present only for devices behind SCSI/ATA
    /// translation (libata)
    AtaInformation { device: &'a str },
    /// Write "1" to rescan one SCSI device
    DeviceRescan { device: &'a str },
    /// Write "- - -" to rescan everything on a SCSI host adapter
    HostScan { host: &'a str },
}

impl Attribute<'_> {
    pub fn path(&self, root: &Path) -> PathBuf {
        match self {
            Self::AtaInformation { device } => {
                root.join("block").join(device).join("device/vpd_pg89")
            }
            Self::DeviceRescan { device } => {
                root.join("block").join(device).join("device/rescan")
            }
            Self::HostScan { host } => root
                .join("class/scsi_host")
                .join(format!("host{host}"))
                .join("scan"),
        }
    }
}

/// Access to sysfs, which can be rooted elsewhere for testing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sysfs {
    root: PathBuf,
}

impl Default for Sysfs {
    fn default() -> Self {
        Self::new(SYSFS_ROOT)
    }
}

impl Sysfs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the attribute file exists
    ///
    /// Only "not found" counts as absent; any other failure is an error.
    pub fn exists(&self, attribute: Attribute<'_>) -> std::io::Result<bool> {
        match std::fs::metadata(attribute.path(&self.root)) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Write `value` to an existing attribute file
    pub fn write(
        &self,
        attribute: Attribute<'_>,
        value: &str,
    ) -> std::io::Result<()> {
        let mut f = std::fs::OpenOptions::new()
            .write(true)
            .open(attribute.path(&self.root))?;
        f.write_all(value.as_bytes())
    }

    /// The index of the SCSI host adapter a block device hangs off
    ///
    /// The device's `scsi_device` directory holds one entry named
    /// `H:C:T:L`; the host is the part before the first colon.
    pub fn host_index(&self, device: &str) -> std::io::Result<String> {
        let dir = self
            .root
            .join("block")
            .join(device)
            .join("device/scsi_device");
        let mut names = std::fs::read_dir(&dir)?
            .map(|entry| entry.map(|e| e.file_name()))
            .collect::<std::io::Result<Vec<_>>>()?;
        names.sort();
        let name = names
            .iter()
            .filter_map(|n| n.to_str())
            .find(|n| !n.starts_with('.'))
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{} is empty", dir.display()),
                )
            })?;
        match name.split_once(':') {
            Some((host, _)) if !host.is_empty() => Ok(host.to_string()),
            _ => Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("can't parse {name} in {}", dir.display()),
            )),
        }
    }

    /// Make the kernel look at the device again
    ///
    /// A SCSI rescan doesn't make libata revalidate, so an ATA device
    /// gets a rescan of its whole host adapter instead.
    pub fn revalidate(&self, device: &str, ata: bool) -> std::io::Result<()> {
        if ata {
            let host = self.host_index(device)?;
            self.write(Attribute::HostScan { host: &host }, "- - -")
        } else {
            self.write(Attribute::DeviceRescan { device }, "1")
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A scratch sysfs tree, removed on drop
    pub(crate) struct FakeSysfs {
        pub sysfs: Sysfs,
    }

    impl FakeSysfs {
        pub fn new() -> Self {
            static COUNTER: AtomicUsize = AtomicUsize::new(0);
            let root = std::env::temp_dir().join(format!(
                "cotton-sgio-{}-{}",
                std::process::id(),
                COUNTER.fetch_add(1, Ordering::Relaxed)
            ));
            std::fs::create_dir_all(&root).unwrap();
            Self {
                sysfs: Sysfs::new(root),
            }
        }

        pub fn create(&self, path: &str, contents: &str) {
            let path = self.sysfs.root().join(path);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, contents).unwrap();
        }

        pub fn mkdir(&self, path: &str) {
            std::fs::create_dir_all(self.sysfs.root().join(path)).unwrap();
        }

        pub fn read(&self, path: &str) -> String {
            std::fs::read_to_string(self.sysfs.root().join(path)).unwrap()
        }
    }

    impl Drop for FakeSysfs {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(self.sysfs.root());
        }
    }

    #[test]
    fn attribute_paths() {
        let root = Path::new("/sys");
        assert_eq!(
            Attribute::AtaInformation { device: "sda" }.path(root),
            Path::new("/sys/block/sda/device/vpd_pg89")
        );
        assert_eq!(
            Attribute::DeviceRescan { device: "sdb" }.path(root),
            Path::new("/sys/block/sdb/device/rescan")
        );
        assert_eq!(
            Attribute::HostScan { host: "3" }.path(root),
            Path::new("/sys/class/scsi_host/host3/scan")
        );
    }

    #[test]
    fn default_root() {
        assert_eq!(Sysfs::default().root(), Path::new("/sys"));
    }

    #[test]
    fn exists() {
        let fake = FakeSysfs::new();
        fake.create("block/sda/device/vpd_pg89", "");
        let sda = Attribute::AtaInformation { device: "sda" };
        let sdb = Attribute::AtaInformation { device: "sdb" };
        assert!(fake.sysfs.exists(sda).unwrap());
        assert!(!fake.sysfs.exists(sdb).unwrap());
    }

    #[test]
    fn write_needs_existing_file() {
        let fake = FakeSysfs::new();
        let rescan = Attribute::DeviceRescan { device: "sda" };
        assert!(fake.sysfs.write(rescan, "1").is_err());
        fake.create("block/sda/device/rescan", "");
        fake.sysfs.write(rescan, "1").unwrap();
        assert_eq!(fake.read("block/sda/device/rescan"), "1");
    }

    #[test]
    fn host_index() {
        let fake = FakeSysfs::new();
        fake.mkdir("block/sda/device/scsi_device/.hidden");
        fake.mkdir("block/sda/device/scsi_device/12:0:0:0");
        assert_eq!(fake.sysfs.host_index("sda").unwrap(), "12");
    }

    #[test]
    fn host_index_missing() {
        let fake = FakeSysfs::new();
        assert!(fake.sysfs.host_index("sda").is_err());
        fake.mkdir("block/sda/device/scsi_device");
        let e = fake.sysfs.host_index("sda").unwrap_err();
        assert_eq!(e.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn host_index_unparseable() {
        let fake = FakeSysfs::new();
        fake.mkdir("block/sda/device/scsi_device/bogus");
        let e = fake.sysfs.host_index("sda").unwrap_err();
        assert_eq!(e.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn revalidate_scsi() {
        let fake = FakeSysfs::new();
        fake.create("block/sdc/device/rescan", "");
        fake.sysfs.revalidate("sdc", false).unwrap();
        assert_eq!(fake.read("block/sdc/device/rescan"), "1");
    }

    #[test]
    fn revalidate_ata_scans_host() {
        let fake = FakeSysfs::new();
        fake.mkdir("block/sdc/device/scsi_device/4:0:0:0");
        fake.create("class/scsi_host/host4/scan", "");
        fake.create("block/sdc/device/rescan", "");
        fake.sysfs.revalidate("sdc", true).unwrap();
        assert_eq!(fake.read("class/scsi_host/host4/scan"), "- - -");
        assert_eq!(fake.read("block/sdc/device/rescan"), "");
    }
}
