//! Linux SCSI generic pass-through.
//!
//! Commands go through the `SG_IO` ioctl, which both `sr` and `sg` device nodes
//! accept. See `include/scsi/sg.h`.

use std::ffi::{c_int, c_uchar, c_uint, c_ushort, c_void};
use std::os::fd::AsRawFd;
use std::path::Path;
use std::ptr;

use nix::ioctl_readwrite_bad;

use super::{COMMAND_TIMEOUT_MS, DeviceHandle, Transport};
use crate::error::{CommandOutcome, ErrorKind, Result};
use crate::scsi::command::{CommandBlock, Direction};
use crate::scsi::sense::{self, SENSE_DATA_SIZE};

const SG_IO: u32 = 0x2285;

const SG_DXFER_NONE: c_int = -1;
const SG_DXFER_TO_DEV: c_int = -2;
const SG_DXFER_FROM_DEV: c_int = -3;

const SG_INFO_OK_MASK: c_uint = 0x1;
const SG_INFO_OK: c_uint = 0x0;

const SAM_STAT_CHECK_CONDITION: c_uchar = 0x02;
const DRIVER_SENSE: c_ushort = 0x08;
const DID_TIME_OUT: c_ushort = 0x03;

/// `struct sg_io_hdr`
#[repr(C)]
pub struct SgIoHdr {
    interface_id: c_int,
    dxfer_direction: c_int,
    cmd_len: c_uchar,
    mx_sb_len: c_uchar,
    iovec_count: c_ushort,
    dxfer_len: c_uint,
    dxferp: *mut c_void,
    cmdp: *const c_uchar,
    sbp: *mut c_uchar,
    timeout: c_uint,
    flags: c_uint,
    pack_id: c_int,
    usr_ptr: *mut c_void,
    status: c_uchar,
    masked_status: c_uchar,
    msg_status: c_uchar,
    sb_len_wr: c_uchar,
    host_status: c_ushort,
    driver_status: c_ushort,
    resid: c_int,
    duration: c_uint,
    info: c_uint,
}

ioctl_readwrite_bad!(sg_io, SG_IO, SgIoHdr);

/// A device opened for `SG_IO`.
#[derive(Debug)]
pub struct SgTransport {
    handle: DeviceHandle,
}

impl Transport for SgTransport {
    fn open(path: &Path, exclusive: bool) -> Result<Self> {
        Ok(Self {
            handle: DeviceHandle::open(path, exclusive)?,
        })
    }

    fn execute(&mut self, command: &CommandBlock, buffer: &mut [u8]) -> CommandOutcome {
        let Ok(dxfer_len) = c_uint::try_from(buffer.len()) else {
            return CommandOutcome::Failure(ErrorKind::BadArgument);
        };
        let mut sense = [0u8; SENSE_DATA_SIZE];
        let cdb = command.as_bytes();

        let dxfer_direction = match command.direction {
            _ if buffer.is_empty() => SG_DXFER_NONE,
            Direction::Read => SG_DXFER_FROM_DEV,
            Direction::Write => SG_DXFER_TO_DEV,
        };

        let mut hdr = SgIoHdr {
            interface_id: c_int::from(b'S'),
            dxfer_direction,
            cmd_len: cdb.len() as c_uchar,
            mx_sb_len: SENSE_DATA_SIZE as c_uchar,
            iovec_count: 0,
            dxfer_len,
            dxferp: if buffer.is_empty() {
                ptr::null_mut()
            } else {
                buffer.as_mut_ptr().cast()
            },
            cmdp: cdb.as_ptr(),
            sbp: sense.as_mut_ptr(),
            timeout: COMMAND_TIMEOUT_MS,
            flags: 0,
            pack_id: 0,
            usr_ptr: ptr::null_mut(),
            status: 0,
            masked_status: 0,
            msg_status: 0,
            sb_len_wr: 0,
            host_status: 0,
            driver_status: 0,
            resid: 0,
            duration: 0,
            info: 0,
        };

        // SAFETY: every pointer in `hdr` refers to a live buffer of the length
        // given next to it, and they all outlive the call.
        if let Err(errno) = unsafe { sg_io(self.handle.as_raw_fd(), &mut hdr) } {
            return CommandOutcome::Failure(ErrorKind::Errno(errno));
        }

        classify_status(
            &SgStatus {
                info: hdr.info,
                status: hdr.status,
                host_status: hdr.host_status,
                driver_status: hdr.driver_status,
                sb_len_wr: hdr.sb_len_wr,
            },
            &sense,
        )
    }
}

/// The fields of `sg_io_hdr` the kernel fills in on return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct SgStatus {
    info: c_uint,
    status: c_uchar,
    host_status: c_ushort,
    driver_status: c_ushort,
    sb_len_wr: c_uchar,
}

/// Outcome of a completed `SG_IO`. `sense` is the whole sense buffer; only
/// the `sb_len_wr` bytes the kernel wrote are decoded.
fn classify_status(hdr: &SgStatus, sense: &[u8]) -> CommandOutcome {
    if hdr.info & SG_INFO_OK_MASK == SG_INFO_OK {
        return CommandOutcome::Ok;
    }

    if hdr.status == SAM_STAT_CHECK_CONDITION || hdr.driver_status & DRIVER_SENSE != 0 {
        let written = usize::from(hdr.sb_len_wr).min(sense.len());
        return sense::classify((written > 0).then(|| &sense[..written]));
    }

    if hdr.host_status == DID_TIME_OUT {
        return CommandOutcome::Failure(ErrorKind::Timeout);
    }

    tracing::warn!(
        "transport failure: status {:#04x}, host {:#06x}, driver {:#06x}",
        hdr.status,
        hdr.host_status,
        hdr.driver_status
    );
    CommandOutcome::Failure(ErrorKind::Unknown)
}
