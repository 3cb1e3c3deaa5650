//! A scripted in-memory device for tests.
//!
//! Devices are registered by path in a process-wide table, so a probe worker
//! thread can open them through [`Transport::open`] like a real node. Each test
//! uses its own path.

use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::Transport;
use crate::error::{CommandOutcome, ErrorKind, Result};
use crate::scsi::command::CommandBlock;

static DEVICES: Mutex<BTreeMap<PathBuf, MockDevice>> = Mutex::new(BTreeMap::new());

fn devices() -> MutexGuard<'static, BTreeMap<PathBuf, MockDevice>> {
    DEVICES.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One scripted answer.
#[derive(Debug, Clone)]
pub struct Reply {
    pub outcome: CommandOutcome,
    pub data: Vec<u8>,
}

impl Reply {
    pub fn ok(data: impl Into<Vec<u8>>) -> Self {
        Self {
            outcome: CommandOutcome::Ok,
            data: data.into(),
        }
    }

    pub fn fail(kind: ErrorKind) -> Self {
        Self {
            outcome: CommandOutcome::Failure(kind),
            data: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct MockDevice {
    /// Consumed one per open attempt; an empty queue opens fine.
    pub open_results: VecDeque<Result<()>>,
    /// Answers per opcode. The last answer of a queue repeats forever; an
    /// opcode without a queue fails with `InvalidCommand`.
    pub replies: BTreeMap<u8, VecDeque<Reply>>,
    /// Every CDB executed, in order.
    pub issued: Vec<Vec<u8>>,
    /// Buffer length handed in with each executed CDB.
    pub buffer_lens: Vec<usize>,
    pub opens: usize,
    pub open_handles: usize,
    /// Whether one of the live handles was opened exclusively.
    pub held_exclusively: bool,
}

impl MockDevice {
    pub fn reply(mut self, opcode: u8, reply: Reply) -> Self {
        self.replies.entry(opcode).or_default().push_back(reply);
        self
    }

    pub fn open_result(mut self, result: Result<()>) -> Self {
        self.open_results.push_back(result);
        self
    }

    pub fn issued_with(&self, opcode: u8) -> usize {
        self.issued.iter().filter(|cdb| cdb[0] == opcode).count()
    }

    fn next_reply(&mut self, opcode: u8) -> Reply {
        match self.replies.get_mut(&opcode) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => Reply::fail(ErrorKind::InvalidCommand),
        }
    }
}

pub fn install(path: impl Into<PathBuf>, device: MockDevice) {
    devices().insert(path.into(), device);
}

/// Runs `f` against the registered device at `path`.
pub fn with_device<R>(path: impl AsRef<Path>, f: impl FnOnce(&mut MockDevice) -> R) -> R {
    let mut devices = devices();
    let device = devices
        .get_mut(path.as_ref())
        .expect("mock device not installed");
    f(device)
}

/// A handle on a registered device. An exclusive open fails with
/// [`ErrorKind::NotReady`] while any other handle is live, and nothing opens
/// while an exclusive handle is.
#[derive(Debug)]
pub struct MockTransport {
    path: PathBuf,
    exclusive: bool,
}

impl Transport for MockTransport {
    fn open(path: &Path, exclusive: bool) -> Result<Self> {
        let mut devices = devices();
        let device = devices
            .get_mut(path)
            .ok_or(ErrorKind::Errno(nix::errno::Errno::ENOENT))?;
        device.opens += 1;
        device.open_results.pop_front().unwrap_or(Ok(()))?;
        if device.held_exclusively || (exclusive && device.open_handles > 0) {
            return Err(ErrorKind::NotReady);
        }
        device.open_handles += 1;
        device.held_exclusively = exclusive;
        Ok(Self {
            path: path.to_owned(),
            exclusive,
        })
    }

    fn execute(&mut self, command: &CommandBlock, buffer: &mut [u8]) -> CommandOutcome {
        with_device(&self.path, |device| {
            device.issued.push(command.as_bytes().to_vec());
            device.buffer_lens.push(buffer.len());
            let reply = device.next_reply(command.opcode());
            let len = reply.data.len().min(buffer.len());
            buffer[..len].copy_from_slice(&reply.data[..len]);
            reply.outcome
        })
    }
}

impl Drop for MockTransport {
    fn drop(&mut self) {
        with_device(&self.path, |device| {
            device.open_handles -= 1;
            if self.exclusive {
                device.held_exclusively = false;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn shared_opens_coexist() {
        let path = "/mock/transport/shared";
        install(path, MockDevice::default());
        let first = MockTransport::open(Path::new(path), false).unwrap();
        let second = MockTransport::open(Path::new(path), false).unwrap();
        assert_eq!(with_device(path, |device| device.open_handles), 2);
        drop((first, second));
        assert_eq!(with_device(path, |device| device.open_handles), 0);
    }

    #[test]
    fn exclusive_open_of_a_held_device_is_busy() {
        let path = "/mock/transport/held";
        install(path, MockDevice::default());
        let holder = MockTransport::open(Path::new(path), false).unwrap();
        assert_matches!(
            MockTransport::open(Path::new(path), true),
            Err(ErrorKind::NotReady)
        );
        drop(holder);
        let exclusive = MockTransport::open(Path::new(path), true).unwrap();
        assert_matches!(
            MockTransport::open(Path::new(path), false),
            Err(ErrorKind::NotReady)
        );
        drop(exclusive);
        MockTransport::open(Path::new(path), false).unwrap();
        assert_eq!(with_device(path, |device| device.opens), 5);
    }
}
