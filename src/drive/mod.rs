//! One optical drive and its probe life cycle.
//!
//! A [`Drive`] is owned by a single control context. Probing happens on a
//! worker thread that is always cancelled and joined before another probe or
//! a manual operation (lock, unlock, eject, inquiry) opens the device, so two
//! handles to the same drive are never open at once.
//!
//! Results are handed over through a [`tokio::sync::watch`] channel: callers
//! either `await` [`Drive::wait_probe`] or keep a receiver from
//! [`Drive::subscribe`].

mod capabilities;
mod probe;

pub use capabilities::DriveCapabilities;
pub use probe::{MediumPresence, ProbeState};

use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use nix::errno::Errno;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::ProbeConfig;
use crate::error::{ErrorKind, Result};
use crate::scsi::SCSIDevice;
use crate::scsi::response::Inquiry;
use crate::transport::{PlatformTransport, Transport};
use probe::Shared;

#[derive(Debug)]
pub struct Drive<T: Transport + 'static = PlatformTransport> {
    path: PathBuf,
    config: ProbeConfig,
    shared: Arc<Shared>,
    state: Arc<watch::Sender<ProbeState>>,
    worker: Option<JoinHandle<()>>,
    locked: bool,
    transport: PhantomData<fn() -> T>,
}

impl<T: Transport + 'static> Drive<T> {
    /// A drive in the [`ProbeState::Idle`] state; nothing is opened until
    /// [`Self::reprobe`].
    pub fn new(path: impl Into<PathBuf>, config: ProbeConfig) -> Self {
        let (state, _) = watch::channel(ProbeState::Idle);
        Self {
            path: path.into(),
            config,
            shared: Arc::default(),
            state: Arc::new(state),
            worker: None,
            locked: false,
            transport: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> ProbeState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ProbeState> {
        self.state.subscribe()
    }

    /// Whether the last finished probe found a medium. False while a probe
    /// runs and after one that failed or was cancelled.
    pub fn has_medium(&self) -> bool {
        self.shared.lock().has_medium
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Starts a new probe, cancelling the one in flight first. Refused with
    /// [`ErrorKind::NotReady`] while the drive is locked.
    pub fn reprobe(&mut self) -> Result<()> {
        if self.locked {
            debug!("drive locked, not probing");
            return Err(ErrorKind::NotReady);
        }
        self.cancel_probe();

        {
            let mut control = self.shared.lock();
            control.cancel = false;
            control.has_medium = false;
        }
        self.state.send_replace(ProbeState::Probing);
        info!(path = %self.path.display(), "probing");

        let path = self.path.clone();
        let config = self.config.clone();
        let shared = Arc::clone(&self.shared);
        let state = Arc::clone(&self.state);
        let worker = thread::Builder::new()
            .name("drive-probe".into())
            .spawn(move || probe::run::<T>(&path, &config, &shared, &state))
            .map_err(|err| {
                let errno = Errno::from_raw(err.raw_os_error().unwrap_or(libc::EAGAIN));
                self.state.send_replace(ProbeState::Failed(ErrorKind::Errno(errno)));
                ErrorKind::Errno(errno)
            })?;
        self.worker = Some(worker);
        Ok(())
    }

    /// Cancels the probe in flight, if any, and blocks until its thread is
    /// gone. The device handle it held is closed on return.
    pub fn cancel_probe(&mut self) {
        if self.worker.is_none() {
            return;
        }
        self.shared.cancel();
        self.state.send_if_modified(|state| {
            let running = *state == ProbeState::Probing;
            if running {
                *state = ProbeState::Cancelling;
            }
            running
        });
        self.join_probe();
    }

    /// Blocks until the probe in flight finishes on its own, and returns the
    /// state it ended in.
    pub fn join_probe(&mut self) -> ProbeState {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("probe thread panicked");
                self.state.send_replace(ProbeState::Failed(ErrorKind::Unknown));
            }
        }
        self.state()
    }

    /// Waits for the probe in flight to reach a terminal state without
    /// blocking the runtime. Returns the current state right away when no
    /// probe was started.
    pub async fn wait_probe(&self) -> ProbeState {
        let mut receiver = self.state.subscribe();
        let result = receiver
            .wait_for(|state| state.is_terminal() || *state == ProbeState::Idle)
            .await
            .map(|state| (*state).clone());
        result.unwrap_or_else(|_| self.state())
    }

    /// Runs `operation` on a freshly opened device once any probe is over.
    fn with_device<R>(&mut self, operation: impl FnOnce(&mut SCSIDevice<T>) -> Result<R>) -> Result<R> {
        self.cancel_probe();
        let mut device = SCSIDevice::<T>::open(&self.path, self.config.exclusive)?;
        operation(&mut device)
    }

    pub fn inquiry(&mut self) -> Result<Inquiry> {
        self.with_device(|device| device.inquiry())
    }

    /// Prevents medium removal. Probing is refused until [`Self::unlock`].
    pub fn lock(&mut self) -> Result<()> {
        self.with_device(|device| device.set_medium_removal(true))?;
        info!(path = %self.path.display(), "locked");
        self.locked = true;
        Ok(())
    }

    pub fn unlock(&mut self) -> Result<()> {
        self.with_device(|device| device.set_medium_removal(false))?;
        info!(path = %self.path.display(), "unlocked");
        self.locked = false;
        Ok(())
    }

    /// Unlocks the tray and ejects the medium.
    pub fn eject(&mut self) -> Result<()> {
        self.cancel_probe();
        let mut device = SCSIDevice::<T>::open(&self.path, self.config.exclusive)?;
        device.set_medium_removal(false)?;
        self.locked = false;
        device.eject()?;
        drop(device);

        info!(path = %self.path.display(), "ejected");
        self.shared.lock().has_medium = false;
        self.state.send_if_modified(|state| {
            if let ProbeState::Done { medium, .. } = state {
                *medium = MediumPresence::Absent;
                true
            } else {
                false
            }
        });
        Ok(())
    }
}

impl<T: Transport + 'static> Drop for Drive<T> {
    fn drop(&mut self) {
        self.cancel_probe();
    }
}
