//! Raw-device transports.
//!
//! Exactly one backend is compiled per target OS, chosen with `cfg`:
//! - Linux: the SCSI generic `SG_IO` ioctl ([`sg`]).
//! - NetBSD and OpenBSD: `SCIOCCOMMAND` with a `scsireq` ([`scsireq`]).
//! - Solaris and illumos: `USCSICMD` with a `uscsi_cmd` ([`uscsi`]).
//!
//! All of them implement [`Transport`], so everything above this module is
//! backend agnostic. Retries and buffering are not done here.

use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::fcntl::{OFlag, open};
use nix::sys::stat::Mode;
use tracing::{debug, trace};

use crate::error::{CommandOutcome, ErrorKind, Result};
use crate::scsi::command::CommandBlock;

#[cfg(test)]
pub(crate) mod mock;

#[cfg(target_os = "linux")]
pub mod sg;
#[cfg(target_os = "linux")]
pub type PlatformTransport = sg::SgTransport;

#[cfg(any(target_os = "netbsd", target_os = "openbsd"))]
pub mod scsireq;
#[cfg(any(target_os = "netbsd", target_os = "openbsd"))]
pub type PlatformTransport = scsireq::ScsiReqTransport;

#[cfg(any(target_os = "solaris", target_os = "illumos"))]
pub mod uscsi;
#[cfg(any(target_os = "solaris", target_os = "illumos"))]
pub type PlatformTransport = uscsi::UscsiTransport;

#[cfg(not(any(
    target_os = "linux",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "solaris",
    target_os = "illumos"
)))]
compile_error!("no SCSI pass-through transport for this target OS");

/// How long a single command may take before the kernel gives up on it.
pub const COMMAND_TIMEOUT_MS: u32 = 30_000;

/// A synchronous SCSI pass-through to one opened device.
///
/// The value owns its device handle; dropping it closes the handle.
pub trait Transport: Sized {
    /// Opens `path`. Transient busy conditions are reported as
    /// [`ErrorKind::NotReady`], every other failure as [`ErrorKind::Errno`].
    fn open(path: &Path, exclusive: bool) -> Result<Self>;

    /// Submits `command` and blocks until the device answers. For
    /// [`crate::scsi::command::Direction::Read`] the data lands in `buffer`.
    fn execute(&mut self, command: &CommandBlock, buffer: &mut [u8]) -> CommandOutcome;

    /// [`Self::execute`] folded into a `Result`.
    fn submit(&mut self, command: &CommandBlock, buffer: &mut [u8]) -> Result<()> {
        trace!(cdb = ?command.as_bytes(), len = buffer.len(), "submitting command");
        let outcome = self.execute(command, buffer);
        if outcome != CommandOutcome::Ok {
            debug!("command {:#04x} finished with {:?}", command.opcode(), outcome);
        }
        outcome.into_result()
    }
}

/// Maps a failed `open(2)` onto the taxonomy. Busy is retried by the probe,
/// everything else is fatal.
pub fn classify_open_error(errno: Errno) -> ErrorKind {
    if errno == Errno::EAGAIN || errno == Errno::EWOULDBLOCK || errno == Errno::EBUSY {
        ErrorKind::NotReady
    } else {
        ErrorKind::Errno(errno)
    }
}

/// An open raw device node. Closed exactly once, when dropped.
#[derive(Debug)]
pub struct DeviceHandle {
    fd: OwnedFd,
    path: PathBuf,
}

impl DeviceHandle {
    #[tracing::instrument]
    pub fn open(path: &Path, exclusive: bool) -> Result<Self> {
        let mut flags = OFlag::O_RDWR | OFlag::O_NONBLOCK;
        if exclusive {
            flags |= OFlag::O_EXCL;
        }

        let fd = open(path, flags, Mode::empty()).map_err(|errno| {
            let kind = classify_open_error(errno);
            if kind == ErrorKind::NotReady {
                if exclusive {
                    debug!("device is held by someone else, exclusive open refused: {errno}");
                } else {
                    debug!("device is busy: {errno}");
                }
            } else {
                debug!("failed to open device: {errno}");
            }
            kind
        })?;
        debug!("device opened");

        // SAFETY: `open` just handed us this descriptor and nothing else owns it
        let fd = unsafe { OwnedFd::from_raw_fd(fd) };
        Ok(Self {
            fd,
            path: path.to_owned(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AsRawFd for DeviceHandle {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        debug!(path = %self.path.display(), "closing device");
    }
}

/// Replaces `from` with `to` at the start of `path`, if it is there.
///
/// Some systems only accept SCSI pass-through on the character ("raw") twin of
/// a block device, whose node name differs by a prefix.
pub fn substitute_prefix(path: &Path, from: &str, to: &str) -> PathBuf {
    match path.to_str().and_then(|p| p.strip_prefix(from)) {
        Some(rest) => PathBuf::from(format!("{to}{rest}")),
        None => path.to_owned(),
    }
}
