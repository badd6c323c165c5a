//! The Linux SG_IO ioctl, as a [`ScsiTransport`]
//!
//! SG_IO works on sd block devices as well as on sg character devices;
//! see the Linux SCSI Generic HOWTO for the header layout.

use cotton_scsi::scsi_transport::SENSE_MAX_LENGTH;
use cotton_scsi::{
    CdbError, Completion, DataPhase, Error, QueuePosition, Request,
    ScsiTransport,
};
use nix::errno::Errno;
use std::os::fd::AsRawFd;

/// `interface_id` of the version 3 header
pub const SG_INTERFACE_ID_ORIG: libc::c_int = b'S' as libc::c_int;

pub const SG_DXFER_NONE: libc::c_int = -1;
pub const SG_DXFER_TO_DEV: libc::c_int = -2;
pub const SG_DXFER_FROM_DEV: libc::c_int = -3;

pub const SG_FLAG_Q_AT_TAIL: libc::c_uint = 0x10;
pub const SG_FLAG_Q_AT_HEAD: libc::c_uint = 0x20;

const SG_IO: libc::c_ulong = 0x2285;

/// `struct sg_io_hdr` from `<scsi/sg.h>`
#[derive(Debug)]
#[repr(C)]
pub struct SgIoHdr {
    pub interface_id: libc::c_int,
    pub dxfer_direction: libc::c_int,
    pub cmd_len: libc::c_uchar,
    pub mx_sb_len: libc::c_uchar,
    pub iovec_count: libc::c_ushort,
    pub dxfer_len: libc::c_uint,
    pub dxferp: *mut libc::c_void,
    pub cmdp: *const libc::c_uchar,
    pub sbp: *mut libc::c_uchar,
    pub timeout: libc::c_uint,
    pub flags: libc::c_uint,
    pub pack_id: libc::c_int,
    pub usr_ptr: *mut libc::c_void,
    pub status: libc::c_uchar,
    pub masked_status: libc::c_uchar,
    pub msg_status: libc::c_uchar,
    pub sb_len_wr: libc::c_uchar,
    pub host_status: libc::c_ushort,
    pub driver_status: libc::c_ushort,
    pub resid: libc::c_int,
    pub duration: libc::c_uint,
    pub info: libc::c_uint,
}

impl Default for SgIoHdr {
    fn default() -> Self {
        Self {
            interface_id: SG_INTERFACE_ID_ORIG,
            dxfer_direction: SG_DXFER_NONE,
            cmd_len: 0,
            mx_sb_len: 0,
            iovec_count: 0,
            dxfer_len: 0,
            dxferp: core::ptr::null_mut(),
            cmdp: core::ptr::null(),
            sbp: core::ptr::null_mut(),
            timeout: 0,
            flags: 0,
            pack_id: 0,
            usr_ptr: core::ptr::null_mut(),
            status: 0,
            masked_status: 0,
            msg_status: 0,
            sb_len_wr: 0,
            host_status: 0,
            driver_status: 0,
            resid: 0,
            duration: 0,
            info: 0,
        }
    }
}

nix::ioctl_readwrite_bad!(
    /// `SG_IO` ioctl defined by Linux.
    sg_io,
    SG_IO,
    SgIoHdr
);

impl SgIoHdr {
    /// Fill in a header for `request`
    ///
    /// The pointers in the result borrow from `request`, which must
    /// therefore outlive any ioctl using the header.
    pub fn new(request: &mut Request<'_>) -> Result<Self, Error<Errno>> {
        let cmd_len = u8::try_from(request.cdb.len())
            .map_err(|_| Error::InvalidCdb(CdbError::TooLong))?;
        let (dxfer_direction, dxferp, len) = match &mut request.data {
            DataPhase::In(buf) => (
                SG_DXFER_FROM_DEV,
                buf.as_mut_ptr().cast::<libc::c_void>(),
                buf.len(),
            ),
            DataPhase::Out(buf) => (
                SG_DXFER_TO_DEV,
                buf.as_ptr().cast_mut().cast::<libc::c_void>(),
                buf.len(),
            ),
            DataPhase::None => (SG_DXFER_NONE, core::ptr::null_mut(), 0),
        };
        let dxfer_len = libc::c_uint::try_from(len)
            .map_err(|_| Error::Transport(Errno::EINVAL))?;
        let mx_sb_len = request.sense.len().min(SENSE_MAX_LENGTH) as u8;

        Ok(Self {
            dxfer_direction,
            cmd_len,
            mx_sb_len,
            dxfer_len,
            dxferp,
            cmdp: request.cdb.as_ptr(),
            sbp: request.sense.as_mut_ptr(),
            timeout: request.timeout_ms,
            flags: match request.queue {
                QueuePosition::Head => SG_FLAG_Q_AT_HEAD,
                QueuePosition::Tail => SG_FLAG_Q_AT_TAIL,
            },
            ..Default::default()
        })
    }

    /// The status fields, once the ioctl has returned
    pub fn completion(&self) -> Completion {
        Completion {
            status: self.status,
            host_status: self.host_status,
            driver_status: self.driver_status,
            residual: self.resid.max(0) as u32,
            sense_length: self.sb_len_wr.min(self.mx_sb_len),
        }
    }
}

/// A [`ScsiTransport`] issuing SG_IO on an open device node
pub struct SgIo<F: AsRawFd> {
    fd: F,
}

impl<F: AsRawFd> SgIo<F> {
    pub fn new(fd: F) -> Self {
        Self { fd }
    }

    pub fn get_ref(&self) -> &F {
        &self.fd
    }
}

impl<F: AsRawFd> ScsiTransport for SgIo<F> {
    type Error = Errno;

    fn command(
        &mut self,
        mut request: Request<'_>,
    ) -> Result<Completion, Error<Errno>> {
        let mut hdr = SgIoHdr::new(&mut request)?;
        // SAFETY: every pointer in the header refers to a buffer borrowed
        // by `request`, which lives until after the ioctl returns, and
        // each length matches its buffer.
        unsafe { sg_io(self.fd.as_raw_fd(), &mut hdr) }
            .map_err(Error::Transport)?;
        Ok(hdr.completion())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request<'a>(
        cdb: &'a [u8],
        data: DataPhase<'a>,
        sense: &'a mut [u8],
    ) -> Request<'a> {
        Request {
            cdb,
            data,
            sense,
            timeout_ms: 30_000,
            queue: QueuePosition::Head,
        }
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn header_layout() {
        assert_eq!(core::mem::size_of::<SgIoHdr>(), 88);
    }

    #[test]
    fn header_no_data() {
        let cdb = [0u8; 6];
        let mut sense = [0u8; SENSE_MAX_LENGTH];
        let mut rq = request(&cdb, DataPhase::None, &mut sense);
        let hdr = SgIoHdr::new(&mut rq).unwrap();
        assert_eq!(hdr.interface_id, 'S' as i32);
        assert_eq!(hdr.dxfer_direction, SG_DXFER_NONE);
        assert_eq!(hdr.dxfer_len, 0);
        assert!(hdr.dxferp.is_null());
        assert_eq!(hdr.cmd_len, 6);
        assert_eq!(hdr.cmdp, cdb.as_ptr());
        assert_eq!(hdr.mx_sb_len, 64);
        assert_eq!(hdr.timeout, 30_000);
        assert_eq!(hdr.flags, SG_FLAG_Q_AT_HEAD);
    }

    #[test]
    fn header_data_in() {
        let cdb = [0x12, 0, 0, 0, 36, 0];
        let mut buf = [0u8; 36];
        let ptr = buf.as_mut_ptr();
        let mut sense = [0u8; SENSE_MAX_LENGTH];
        let mut rq = request(&cdb, DataPhase::In(&mut buf), &mut sense);
        rq.queue = QueuePosition::Tail;
        let hdr = SgIoHdr::new(&mut rq).unwrap();
        assert_eq!(hdr.dxfer_direction, SG_DXFER_FROM_DEV);
        assert_eq!(hdr.dxfer_len, 36);
        assert_eq!(hdr.dxferp, ptr.cast());
        assert_eq!(hdr.flags, SG_FLAG_Q_AT_TAIL);
    }

    #[test]
    fn header_data_out() {
        let cdb = [0x2A; 10];
        let buf = [0u8; 512];
        let mut sense = [0u8; 18];
        let mut rq = request(&cdb, DataPhase::Out(&buf), &mut sense);
        let hdr = SgIoHdr::new(&mut rq).unwrap();
        assert_eq!(hdr.dxfer_direction, SG_DXFER_TO_DEV);
        assert_eq!(hdr.dxfer_len, 512);
        assert_eq!(hdr.mx_sb_len, 18);
    }

    #[test]
    fn oversized_cdb_refused() {
        let cdb = [0u8; 300];
        let mut sense = [0u8; SENSE_MAX_LENGTH];
        let mut rq = request(&cdb, DataPhase::None, &mut sense);
        assert_eq!(
            SgIoHdr::new(&mut rq).unwrap_err(),
            Error::InvalidCdb(CdbError::TooLong)
        );
    }

    #[test]
    fn completion_fields() {
        let hdr = SgIoHdr {
            status: 2,
            host_status: 0,
            driver_status: 8,
            resid: 12,
            mx_sb_len: 64,
            sb_len_wr: 18,
            ..Default::default()
        };
        assert_eq!(
            hdr.completion(),
            Completion {
                status: 2,
                host_status: 0,
                driver_status: 8,
                residual: 12,
                sense_length: 18,
            }
        );
    }

    #[test]
    fn negative_residual_is_zero() {
        let hdr = SgIoHdr {
            resid: -4,
            ..Default::default()
        };
        assert_eq!(hdr.completion().residual, 0);
    }

    #[test]
    fn bad_fd_is_transport_error() {
        struct BadFd;
        impl AsRawFd for BadFd {
            fn as_raw_fd(&self) -> std::os::fd::RawFd {
                -1
            }
        }
        let mut t = SgIo::new(BadFd);
        let cdb = [0u8; 6];
        let mut sense = [0u8; SENSE_MAX_LENGTH];
        let r = t.command(request(&cdb, DataPhase::None, &mut sense));
        assert_eq!(r, Err(Error::Transport(Errno::EBADF)));
    }
}
