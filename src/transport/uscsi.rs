//! Solaris/illumos pass-through with the `USCSICMD` ioctl.
//!
//! Commands must be issued on the raw slice (`/dev/rdsk/...`); the block node
//! (`/dev/dsk/...`) is only good for regular I/O.

use std::ffi::{c_char, c_int, c_short, c_uchar, c_ulong};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};
use std::ptr;

use nix::errno::Errno;

use super::{COMMAND_TIMEOUT_MS, DeviceHandle, Transport, substitute_prefix};
use crate::error::{CommandOutcome, ErrorKind, Result};
use crate::scsi::command::{CommandBlock, Direction};
use crate::scsi::sense::{self, SENSE_DATA_SIZE};

const USCSIIOC: c_int = (b'u' as c_int) << 8;
const USCSICMD: c_int = USCSIIOC | 201;

const USCSI_WRITE: c_int = 0x00000;
const USCSI_SILENT: c_int = 0x00001;
const USCSI_READ: c_int = 0x00008;
const USCSI_RQENABLE: c_int = 0x00010;

const STATUS_CHECK: c_short = 0x02;

/// `struct uscsi_cmd`
#[repr(C)]
struct UscsiCmd {
    uscsi_flags: c_int,
    uscsi_status: c_short,
    uscsi_timeout: c_short,
    uscsi_cdb: *mut c_char,
    uscsi_bufaddr: *mut c_char,
    uscsi_buflen: usize,
    uscsi_resid: usize,
    uscsi_cdblen: c_uchar,
    uscsi_rqlen: c_uchar,
    uscsi_rqstatus: c_uchar,
    uscsi_rqresid: c_uchar,
    uscsi_rqbuf: *mut c_char,
    uscsi_path_instance: c_ulong,
}

/// The raw node matching a block device path.
pub fn raw_device_path(path: &Path) -> PathBuf {
    substitute_prefix(path, "/dev/dsk/", "/dev/rdsk/")
}

/// A device opened for `USCSICMD`.
#[derive(Debug)]
pub struct UscsiTransport {
    handle: DeviceHandle,
}

impl Transport for UscsiTransport {
    fn open(path: &Path, exclusive: bool) -> Result<Self> {
        Ok(Self {
            handle: DeviceHandle::open(&raw_device_path(path), exclusive)?,
        })
    }

    fn execute(&mut self, command: &CommandBlock, buffer: &mut [u8]) -> CommandOutcome {
        let mut cdb = command.get();
        let mut sense = [0u8; SENSE_DATA_SIZE];

        let direction = match command.direction {
            _ if buffer.is_empty() => 0,
            Direction::Read => USCSI_READ,
            Direction::Write => USCSI_WRITE,
        };

        let mut cmd = UscsiCmd {
            uscsi_flags: direction | USCSI_SILENT | USCSI_RQENABLE,
            uscsi_status: 0,
            uscsi_timeout: (COMMAND_TIMEOUT_MS / 1000) as c_short,
            uscsi_cdb: cdb.as_mut_ptr().cast(),
            uscsi_bufaddr: if buffer.is_empty() {
                ptr::null_mut()
            } else {
                buffer.as_mut_ptr().cast()
            },
            uscsi_buflen: buffer.len(),
            uscsi_resid: 0,
            uscsi_cdblen: command.len() as c_uchar,
            uscsi_rqlen: SENSE_DATA_SIZE as c_uchar,
            uscsi_rqstatus: 0,
            uscsi_rqresid: 0,
            uscsi_rqbuf: sense.as_mut_ptr().cast(),
            uscsi_path_instance: 0,
        };

        // SAFETY: the cdb, data and sense pointers all refer to live buffers of
        // the lengths recorded next to them, and they outlive the call.
        let res = unsafe { libc::ioctl(self.handle.as_raw_fd(), USCSICMD as _, &mut cmd) };
        if res == 0 {
            return CommandOutcome::Ok;
        }
        let errno = Errno::last();
        classify_status(cmd.uscsi_status, cmd.uscsi_rqresid, &sense, errno)
    }
}

/// Outcome of a failed `USCSICMD`. `rqresid` is how much of the `sense`
/// buffer the drive left unfilled.
fn classify_status(
    status: c_short,
    rqresid: c_uchar,
    sense: &[u8; SENSE_DATA_SIZE],
    errno: Errno,
) -> CommandOutcome {
    if status == STATUS_CHECK {
        let received = SENSE_DATA_SIZE.saturating_sub(usize::from(rqresid));
        return sense::classify((received > 0).then(|| &sense[..received]));
    }

    match errno {
        Errno::ETIMEDOUT => CommandOutcome::Failure(ErrorKind::Timeout),
        _ => CommandOutcome::Failure(ErrorKind::Errno(errno)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn no_medium_sense() -> [u8; SENSE_DATA_SIZE] {
        let mut sense = [0; SENSE_DATA_SIZE];
        sense[0] = 0x70;
        sense[2] = 0x02;
        sense[12] = 0x3A;
        sense
    }

    #[test]
    fn check_condition_uses_what_the_drive_filled_in() {
        let sense = no_medium_sense();
        assert_matches!(
            classify_status(STATUS_CHECK, 0, &sense, Errno::EIO),
            CommandOutcome::Failure(ErrorKind::NoMedium)
        );
        // 19 - 5 leaves bytes 0..14, enough for the ASC.
        assert_matches!(
            classify_status(STATUS_CHECK, 5, &sense, Errno::EIO),
            CommandOutcome::Failure(ErrorKind::NoMedium)
        );
        assert_matches!(
            classify_status(STATUS_CHECK, SENSE_DATA_SIZE as c_uchar, &sense, Errno::EIO),
            CommandOutcome::Failure(ErrorKind::Unknown)
        );
        assert_matches!(
            classify_status(STATUS_CHECK, 0xFF, &sense, Errno::EIO),
            CommandOutcome::Failure(ErrorKind::Unknown)
        );
    }

    #[test]
    fn errno_without_check_condition() {
        let sense = [0; SENSE_DATA_SIZE];
        assert_matches!(
            classify_status(0, 0, &sense, Errno::ETIMEDOUT),
            CommandOutcome::Failure(ErrorKind::Timeout)
        );
        assert_matches!(
            classify_status(0, 0, &sense, Errno::EIO),
            CommandOutcome::Failure(ErrorKind::Errno(Errno::EIO))
        );
    }

    #[test]
    fn raw_node_names() {
        assert_eq!(
            raw_device_path(Path::new("/dev/dsk/c0t0d0s2")),
            Path::new("/dev/rdsk/c0t0d0s2")
        );
    }
}
