//! The `sgio` command line: parsing it, and carrying it out

use crate::device::{Device, Options};
use clap::Parser;
use cotton_scsi::config::DEFAULT_TIMEOUT_MS;
use cotton_scsi::{
    Cdb, CdbType, CommandFlags, DataPhase, DeviceInfo, Direction, HexDump,
    QueuePosition,
};
use std::io::Write;
use std::path::PathBuf;

/// Issue SCSI and ATA commands to a block device.
///
/// With no mode option, the command given by --scsi-cdb or --ata-cdb is
/// executed.
#[derive(Debug, Parser)]
#[clap(name = "sgio", version)]
pub struct Args {
    /// verbose output
    #[clap(short = 'v', long)]
    pub verbose: bool,

    /// display device information and return
    #[clap(long)]
    pub info: bool,

    /// revalidate the device and return
    #[clap(long)]
    pub revalidate: bool,

    /// space separated hexadecimal string defining a SCSI CDB
    #[clap(long, value_name = "STR", conflicts_with("ata_cdb"))]
    pub scsi_cdb: Option<Cdb>,

    /// space separated hexadecimal string defining a 28-bit or 48-bit
    /// ATA CDB
    #[clap(long, value_name = "STR")]
    pub ata_cdb: Option<Cdb>,

    /// use the file PATH as the command input buffer; the file size is
    /// the buffer size
    #[clap(long, value_name = "PATH")]
    pub in_buf: Option<PathBuf>,

    /// save the command output buffer to the file PATH
    #[clap(long, value_name = "PATH")]
    pub out_buf: Option<PathBuf>,

    /// size of the command buffer (ignored with --in-buf)
    #[clap(long, value_name = "SIZE", value_parser = parse_nonzero::<usize>)]
    pub bufsz: Option<usize>,

    /// data transfer from host to device
    #[clap(long, conflicts_with("from_dev"))]
    pub to_dev: bool,

    /// data transfer from device to host
    #[clap(long)]
    pub from_dev: bool,

    /// command timeout in milliseconds
    #[clap(
        long,
        value_name = "MS",
        default_value_t = DEFAULT_TIMEOUT_MS,
        value_parser = parse_nonzero::<u32>
    )]
    pub timeout: u32,

    /// queue commands at the tail, not the head
    #[clap(long)]
    pub queue_at_tail: bool,

    /// the device node, e.g. /dev/sda
    pub device: PathBuf,
}

fn parse_nonzero<T>(s: &str) -> Result<T, String>
where
    T: std::str::FromStr + Default + PartialEq,
{
    match s.parse::<T>() {
        Ok(n) if n != T::default() => Ok(n),
        _ => Err(format!("'{s}' is not a positive number")),
    }
}

/// What to do with the device
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Mode {
    Info,
    Revalidate,
    Execute,
}

impl Args {
    /// --info wins over --revalidate; otherwise a command is executed
    pub fn mode(&self) -> Mode {
        if self.info {
            Mode::Info
        } else if self.revalidate {
            Mode::Revalidate
        } else {
            Mode::Execute
        }
    }

    pub fn cdb(&self) -> Option<(Cdb, CdbType)> {
        self.scsi_cdb
            .map(|c| (c, CdbType::Scsi))
            .or(self.ata_cdb.map(|c| (c, CdbType::Ata)))
    }

    pub fn direction(&self) -> Direction {
        if self.to_dev {
            Direction::ToDevice
        } else if self.from_dev {
            Direction::FromDevice
        } else {
            Direction::None
        }
    }

    pub fn queue(&self) -> QueuePosition {
        if self.queue_at_tail {
            QueuePosition::Tail
        } else {
            QueuePosition::Head
        }
    }
}

/// Print the `--info` report
pub fn write_report(
    out: &mut impl Write,
    name: &str,
    info: &DeviceInfo,
) -> std::io::Result<()> {
    const TB: u64 = 1_000_000_000_000;
    let bytes = info.capacity_bytes();

    writeln!(out, "Device: /dev/{name}")?;
    writeln!(out, "    Vendor: {}", info.vendor)?;
    writeln!(out, "    Product: {}", info.product)?;
    writeln!(out, "    Revision: {}", info.revision)?;
    writeln!(
        out,
        "    {} 512-byte sectors ({}.{:03} TB)",
        info.capacity,
        bytes / TB,
        (bytes % TB) / 1_000_000_000
    )?;
    writeln!(
        out,
        "    Logical block size: {} B, physical block size: {} B",
        info.logical_block_size, info.physical_block_size
    )?;
    match &info.ata {
        Some(ata) => {
            writeln!(out, "    Device interface: ATA")?;
            writeln!(out, "      ACS version: {}", ata.acs_version)?;
            writeln!(out, "      SAT Vendor: {}", ata.sat.vendor)?;
            writeln!(out, "      SAT Product: {}", ata.sat.product)?;
            writeln!(out, "      SAT revision: {}", ata.sat.revision)?;
        }
        None => writeln!(out, "    Device interface: SAS")?,
    }
    Ok(())
}

fn invalid_input(message: &'static str) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidInput, message)
}

/// Carry out an invocation, writing results to `out`
pub fn run(
    args: &Args,
    out: &mut impl Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = Options {
        verbose: args.verbose,
        timeout_ms: args.timeout,
        queue: args.queue(),
        ..Default::default()
    };

    match args.mode() {
        Mode::Info => {
            let mut device =
                Device::open(&args.device, Direction::None, options)?;
            let name = device.name().to_string();
            let info = device.information()?;
            write_report(out, &name, info)?;
        }
        Mode::Revalidate => {
            Device::open(&args.device, Direction::None, options)?
                .revalidate()?;
        }
        Mode::Execute => {
            let (cdb, cdb_type) =
                args.cdb().ok_or_else(|| invalid_input("no CDB specified"))?;
            let direction = args.direction();
            let mut buf = match (&args.in_buf, direction) {
                (_, Direction::None) => Vec::new(),
                (Some(path), Direction::ToDevice) => std::fs::read(path)?,
                _ => vec![0u8; args.bufsz.unwrap_or(0)],
            };

            let mut device = Device::open(&args.device, direction, options)?;
            let data = match direction {
                Direction::None => DataPhase::None,
                Direction::FromDevice => DataPhase::In(&mut buf),
                Direction::ToDevice => DataPhase::Out(&buf),
            };
            let executed =
                device.execute(&cdb, cdb_type, data, CommandFlags::empty())?;

            if direction == Direction::FromDevice {
                let result = &buf[..executed.transferred];
                match &args.out_buf {
                    Some(path) => {
                        std::fs::write(path, result)?;
                        writeln!(
                            out,
                            "Command result {} Bytes written to {}",
                            result.len(),
                            path.display()
                        )?;
                    }
                    None => {
                        let n = result.len();
                        writeln!(out, "Command result {n} Bytes:")?;
                        writeln!(out, "{}", HexDump(result))?;
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use cotton_scsi::{AcsVersion, AtaInfo, SatIdentity};

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        let argv = std::iter::once("sgio").chain(args.iter().copied());
        Args::try_parse_from(argv)
    }

    fn error_kind(args: &[&str]) -> ErrorKind {
        parse(args).unwrap_err().kind()
    }

    #[test]
    fn help_and_version() {
        assert_eq!(error_kind(&["-h"]), ErrorKind::DisplayHelp);
        assert_eq!(error_kind(&["--version"]), ErrorKind::DisplayVersion);
    }

    #[test]
    fn info_mode() {
        let args = parse(&["--info", "/dev/sda"]).unwrap();
        assert_eq!(args.mode(), Mode::Info);
        assert_eq!(args.device, PathBuf::from("/dev/sda"));
        assert!(!args.verbose);
        assert_eq!(args.direction(), Direction::None);
    }

    #[test]
    fn info_beats_revalidate() {
        let args =
            parse(&["--revalidate", "-v", "--info", "/dev/sdb"]).unwrap();
        assert_eq!(args.mode(), Mode::Info);
        assert!(args.verbose);
        let args = parse(&["--revalidate", "/dev/sdb"]).unwrap();
        assert_eq!(args.mode(), Mode::Revalidate);
    }

    #[test]
    fn scsi_command() {
        let args = parse(&[
            "--scsi-cdb",
            "12 00 00 00 24 00",
            "--from-dev",
            "--bufsz",
            "36",
            "--out-buf",
            "/tmp/inquiry",
            "/dev/sda",
        ])
        .unwrap();
        assert_eq!(args.mode(), Mode::Execute);
        let (cdb, cdb_type) = args.cdb().unwrap();
        assert_eq!(cdb.as_bytes(), &[0x12, 0, 0, 0, 0x24, 0]);
        assert_eq!(cdb_type, CdbType::Scsi);
        assert_eq!(args.direction(), Direction::FromDevice);
        assert_eq!(args.bufsz, Some(36));
        assert_eq!(args.out_buf, Some(PathBuf::from("/tmp/inquiry")));
        assert_eq!(args.timeout, 30_000);
        assert_eq!(args.queue(), QueuePosition::Head);
    }

    #[test]
    fn ata_command() {
        let args = parse(&[
            "--ata-cdb",
            "00 00 00 00 00 00 00 ec",
            "--to-dev",
            "--in-buf",
            "data.bin",
            "--timeout",
            "5000",
            "--queue-at-tail",
            "/dev/sdc",
        ])
        .unwrap();
        assert_eq!(args.cdb().map(|c| c.1), Some(CdbType::Ata));
        assert_eq!(args.direction(), Direction::ToDevice);
        assert_eq!(args.in_buf, Some(PathBuf::from("data.bin")));
        assert_eq!(args.timeout, 5000);
        assert_eq!(args.queue(), QueuePosition::Tail);
    }

    #[test]
    fn cdb_given_twice() {
        assert_eq!(
            error_kind(&["--scsi-cdb", "00", "--ata-cdb", "ec", "/dev/sda"]),
            ErrorKind::ArgumentConflict
        );
        assert_eq!(
            error_kind(&["--scsi-cdb", "00", "--scsi-cdb", "00", "/dev/sda"]),
            ErrorKind::ArgumentConflict
        );
    }

    #[test]
    fn bad_cdb() {
        assert_eq!(
            error_kind(&["--scsi-cdb", "12 zz", "/dev/sda"]),
            ErrorKind::ValueValidation
        );
    }

    #[test]
    fn missing_argument() {
        assert_eq!(
            error_kind(&["--info", "--bufsz"]),
            ErrorKind::InvalidValue
        );
    }

    #[test]
    fn bad_numbers() {
        assert_eq!(
            error_kind(&["--bufsz", "0", "/dev/sda"]),
            ErrorKind::ValueValidation
        );
        assert_eq!(
            error_kind(&["--timeout", "soon", "/dev/sda"]),
            ErrorKind::ValueValidation
        );
    }

    #[test]
    fn both_directions() {
        assert_eq!(
            error_kind(&["--to-dev", "--from-dev", "/dev/sda"]),
            ErrorKind::ArgumentConflict
        );
    }

    #[test]
    fn unknown_option() {
        assert_eq!(
            error_kind(&["--frobnicate", "/dev/sda"]),
            ErrorKind::UnknownArgument
        );
    }

    #[test]
    fn one_device_only() {
        assert_eq!(
            error_kind(&["--info"]),
            ErrorKind::MissingRequiredArgument
        );
        assert_eq!(
            error_kind(&["/dev/sda", "/dev/sdb"]),
            ErrorKind::UnknownArgument
        );
    }

    fn info() -> DeviceInfo {
        DeviceInfo {
            vendor: "ATA".to_string(),
            product: "WDC WD40EFRX-68N".to_string(),
            revision: "0A82".to_string(),
            logical_block_size: 512,
            physical_block_size: 4096,
            capacity: 7_814_037_168,
            ata: None,
        }
    }

    #[test]
    fn report_sas() {
        let mut out = Vec::new();
        write_report(&mut out, "sdb", &info()).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert_eq!(
            out,
            "Device: /dev/sdb
    Vendor: ATA
    Product: WDC WD40EFRX-68N
    Revision: 0A82
    7814037168 512-byte sectors (4.000 TB)
    Logical block size: 512 B, physical block size: 4096 B
    Device interface: SAS
"
        );
    }

    #[test]
    fn report_ata() {
        let mut i = info();
        i.ata = Some(AtaInfo {
            acs_version: AcsVersion::Acs3,
            sat: SatIdentity {
                vendor: "linux".to_string(),
                product: "libata".to_string(),
                revision: "3.00".to_string(),
            },
        });
        let mut out = Vec::new();
        write_report(&mut out, "sda", &i).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.ends_with(
            "    Device interface: ATA
      ACS version: ACS-3
      SAT Vendor: linux
      SAT Product: libata
      SAT revision: 3.00
"
        ));
    }

    #[test]
    fn run_without_cdb() {
        let args = parse(&["/nonexistent/device"]).unwrap();
        let e = run(&args, &mut Vec::new()).unwrap_err();
        assert_eq!(e.to_string(), "no CDB specified");
    }

    #[test]
    fn run_rejects_regular_file() {
        let args = parse(&["--info", "Cargo.toml"]).unwrap();
        let e = run(&args, &mut Vec::new()).unwrap_err();
        assert!(e.to_string().ends_with("not a block or character device"));
    }
}
