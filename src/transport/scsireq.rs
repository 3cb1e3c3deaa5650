//! NetBSD/OpenBSD pass-through with `SCIOCCOMMAND`.
//!
//! The request structure is `scsireq_t` from `sys/scsiio.h`. Commands must be
//! issued on the raw (`/dev/r...`) node of the drive.

use std::ffi::{c_int, c_uchar, c_ulong, c_void};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};
use std::ptr;

use nix::ioctl_readwrite;

use super::{COMMAND_TIMEOUT_MS, DeviceHandle, Transport, substitute_prefix};
use crate::error::{CommandOutcome, ErrorKind, Result};
use crate::scsi::command::{CommandBlock, Direction};
use crate::scsi::sense;

const SENSEBUFLEN: usize = 48;

const SCCMD_READ: c_ulong = 0x0000_0001;
const SCCMD_WRITE: c_ulong = 0x0000_0002;

const SCCMD_OK: c_uchar = 0x00;
const SCCMD_TIMEOUT: c_uchar = 0x01;
const SCCMD_BUSY: c_uchar = 0x02;
const SCCMD_SENSE: c_uchar = 0x03;

/// `scsireq_t`
#[repr(C)]
pub struct ScsiReq {
    flags: c_ulong,
    timeout: c_ulong,
    cmd: [c_uchar; 16],
    cmdlen: c_uchar,
    databuf: *mut c_void,
    datalen: c_ulong,
    datalen_used: c_ulong,
    sense: [c_uchar; SENSEBUFLEN],
    senselen: c_uchar,
    senselen_used: c_uchar,
    status: c_uchar,
    retsts: c_uchar,
    error: c_int,
}

ioctl_readwrite!(scioccommand, b'Q', 1, ScsiReq);

/// The raw character node matching a block device path, `/dev/cd0a` -> `/dev/rcd0a`.
pub fn raw_device_path(path: &Path) -> PathBuf {
    let already_raw = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('r'));
    if already_raw {
        path.to_owned()
    } else {
        substitute_prefix(path, "/dev/", "/dev/r")
    }
}

/// A device opened for `SCIOCCOMMAND`.
#[derive(Debug)]
pub struct ScsiReqTransport {
    handle: DeviceHandle,
}

impl Transport for ScsiReqTransport {
    fn open(path: &Path, exclusive: bool) -> Result<Self> {
        Ok(Self {
            handle: DeviceHandle::open(&raw_device_path(path), exclusive)?,
        })
    }

    fn execute(&mut self, command: &CommandBlock, buffer: &mut [u8]) -> CommandOutcome {
        let cdb = command.as_bytes();
        let mut cmd = [0; 16];
        cmd[..cdb.len()].copy_from_slice(cdb);

        let flags = match command.direction {
            _ if buffer.is_empty() => 0,
            Direction::Read => SCCMD_READ,
            Direction::Write => SCCMD_WRITE,
        };

        let mut req = ScsiReq {
            flags,
            timeout: c_ulong::from(COMMAND_TIMEOUT_MS),
            cmd,
            cmdlen: cdb.len() as c_uchar,
            databuf: if buffer.is_empty() {
                ptr::null_mut()
            } else {
                buffer.as_mut_ptr().cast()
            },
            datalen: buffer.len() as c_ulong,
            datalen_used: 0,
            sense: [0; SENSEBUFLEN],
            senselen: sense::SENSE_DATA_SIZE as c_uchar,
            senselen_used: 0,
            status: 0,
            retsts: 0,
            error: 0,
        };

        // SAFETY: `databuf` points at `buffer` which is `datalen` bytes long
        // and outlives the call; everything else is inline in `req`.
        if let Err(errno) = unsafe { scioccommand(self.handle.as_raw_fd(), &mut req) } {
            return CommandOutcome::Failure(ErrorKind::Errno(errno));
        }

        classify_status(req.retsts, req.status, &req.sense, req.senselen_used)
    }
}

/// Outcome of a completed `SCIOCCOMMAND`, from the `retsts` the kernel set.
fn classify_status(
    retsts: c_uchar,
    status: c_uchar,
    sense: &[u8],
    senselen_used: c_uchar,
) -> CommandOutcome {
    match retsts {
        SCCMD_OK => CommandOutcome::Ok,
        SCCMD_SENSE => {
            let used = usize::from(senselen_used).min(sense.len());
            sense::classify((used > 0).then(|| &sense[..used]))
        }
        SCCMD_TIMEOUT => CommandOutcome::Failure(ErrorKind::Timeout),
        SCCMD_BUSY => CommandOutcome::Failure(ErrorKind::NotReady),
        other => {
            tracing::warn!("transport failure: retsts {other:#04x}, status {status:#04x}");
            CommandOutcome::Failure(ErrorKind::Unknown)
        }
    }
}
