//! The background probe of one drive.
//!
//! A probe runs on its own thread: it opens the device, waits for the unit to
//! become ready, asks for the drive name and its writable media, then closes
//! the device and publishes one terminal [`ProbeState`]. The thread owns the
//! device handle for its whole lifetime.

use std::path::Path;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::capabilities::DriveCapabilities;
use crate::config::ProbeConfig;
use crate::error::{ErrorKind, Result};
use crate::scsi::SCSIDevice;
use crate::scsi::response::Profile;
use crate::transport::Transport;

/// Whether a medium was found, and which one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediumPresence {
    Absent,
    /// `profile` is [`Profile::NONE`] when the drive cannot tell.
    Present { profile: Profile },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeState {
    Idle,
    Probing,
    Cancelling,
    Done {
        /// "VENDOR PRODUCT" from INQUIRY, unknown when no medium stopped the probe early.
        name: Option<String>,
        capabilities: DriveCapabilities,
        medium: MediumPresence,
    },
    Cancelled,
    Failed(ErrorKind),
}

impl ProbeState {
    /// A state no worker will move away from.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Cancelled | Self::Failed(_))
    }
}

/// Fields shared between a drive and its probe worker.
#[derive(Debug, Default)]
pub(super) struct Control {
    pub cancel: bool,
    pub has_medium: bool,
}

/// The lock guarding [`Control`], and the condition variable that wakes a
/// sleeping worker when `cancel` is raised.
#[derive(Debug, Default)]
pub(super) struct Shared {
    control: Mutex<Control>,
    wake: Condvar,
}

impl Shared {
    pub fn lock(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_cancelled(&self) -> bool {
        self.lock().cancel
    }

    pub fn cancel(&self) {
        self.lock().cancel = true;
        self.wake.notify_all();
    }

    /// Sleeps for `timeout` unless cancelled first. Returns whether the probe
    /// was cancelled.
    pub fn pause(&self, timeout: Duration) -> bool {
        let (control, _) = self
            .wake
            .wait_timeout_while(self.lock(), timeout, |control| !control.cancel)
            .unwrap_or_else(PoisonError::into_inner);
        control.cancel
    }
}

/// Body of the probe thread.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub(super) fn run<T: Transport>(
    path: &Path,
    config: &ProbeConfig,
    shared: &Shared,
    state: &watch::Sender<ProbeState>,
) {
    let terminal = match probe::<T>(path, config, shared) {
        Ok(Some(state)) => state,
        Ok(None) => ProbeState::Cancelled,
        Err(err) => {
            warn!("probe failed: {err}");
            ProbeState::Failed(err)
        }
    };
    shared.lock().has_medium = matches!(
        terminal,
        ProbeState::Done {
            medium: MediumPresence::Present { .. },
            ..
        }
    );
    info!("probe finished: {terminal:?}");
    state.send_replace(terminal);
}

/// `Ok(None)` when cancelled. The device is closed when this returns.
fn probe<T: Transport>(
    path: &Path,
    config: &ProbeConfig,
    shared: &Shared,
) -> Result<Option<ProbeState>> {
    let Some(mut device) = open_device::<T>(path, config, shared)? else {
        return Ok(None);
    };

    loop {
        if shared.is_cancelled() {
            return Ok(None);
        }
        match device.test_unit_ready() {
            Ok(()) => break,
            Err(ErrorKind::NoMedium) => {
                info!("no medium");
                return Ok(Some(ProbeState::Done {
                    name: None,
                    capabilities: DriveCapabilities::empty(),
                    medium: MediumPresence::Absent,
                }));
            }
            Err(err) if err.is_transient() => {
                debug!("unit not ready, waiting {:?}", config.unit_ready_poll);
                if shared.pause(config.unit_ready_poll) {
                    return Ok(None);
                }
            }
            Err(err) => return Err(err),
        }
    }

    if shared.is_cancelled() {
        return Ok(None);
    }
    let name = device.inquiry()?.display_name();
    debug!("drive is {name}");

    let (capabilities, profile) = match device.profiles() {
        Ok(list) => (DriveCapabilities::from_profiles(&list.profiles), list.current),
        Err(err) => {
            debug!("GET CONFIGURATION failed ({err}), reading the capabilities page");
            let page = device.capabilities_page()?;
            (DriveCapabilities::from_capabilities_page(&page), Profile::NONE)
        }
    };

    Ok(Some(ProbeState::Done {
        name: Some(name),
        capabilities,
        medium: MediumPresence::Present { profile },
    }))
}

/// Opens the device, retrying while it is busy. `Ok(None)` when cancelled
/// between two attempts.
fn open_device<T: Transport>(
    path: &Path,
    config: &ProbeConfig,
    shared: &Shared,
) -> Result<Option<SCSIDevice<T>>> {
    let mut attempt = 1;
    loop {
        if shared.is_cancelled() {
            return Ok(None);
        }
        match SCSIDevice::open(path, config.exclusive) {
            Ok(device) => return Ok(Some(device)),
            Err(err) if err.is_transient() && attempt < config.open_attempts => {
                debug!(attempt, "device busy, retrying in {:?}", config.open_retry_delay);
                if shared.pause(config.open_retry_delay) {
                    return Ok(None);
                }
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
