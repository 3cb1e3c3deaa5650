//! Error taxonomy shared by the transports, the command catalog and the drive probe.
//!
//! There are three families of failures, all folded into [`ErrorKind`]:
//! - OS level: the syscall itself failed ([`ErrorKind::Errno`]).
//! - Device level: the drive answered with CHECK CONDITION and the sense data
//!   was translated (see [`crate::scsi::sense`]).
//! - Protocol level: [`ErrorKind::SizeMismatch`], [`ErrorKind::TypeMismatch`] and
//!   [`ErrorKind::BadArgument`], raised on our side before or after a round-trip.

use nix::errno::Errno;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ErrorKind>;

/// The closed set of ways a command can fail.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    #[error("unknown error")]
    Unknown,
    #[error("response size does not match its declared size")]
    SizeMismatch,
    #[error("response does not describe the requested type")]
    TypeMismatch,
    #[error("bad argument")]
    BadArgument,
    #[error("device is not ready")]
    NotReady,
    #[error("logical block address out of range")]
    OutOfRangeAddress,
    #[error("invalid address")]
    InvalidAddress,
    #[error("invalid command operation code")]
    InvalidCommand,
    #[error("invalid parameter")]
    InvalidParameter,
    #[error("invalid field in command")]
    InvalidField,
    #[error("command timed out")]
    Timeout,
    #[error("key not established")]
    KeyNotEstablished,
    #[error("invalid track mode")]
    InvalidTrackMode,
    #[error("no medium present")]
    NoMedium,
    #[error("system error: {0}")]
    Errno(#[from] Errno),
}

impl ErrorKind {
    /// Busy and not-ready conditions go away on their own; callers may retry them.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::NotReady)
    }
}

/// What a transport reports for a single submitted command.
///
/// Payload data never travels here; it is written into the caller's buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Ok,
    /// The device recovered from an error on its own. The data is usable.
    Recoverable,
    Failure(ErrorKind),
}

impl CommandOutcome {
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Ok | Self::Recoverable => Ok(()),
            Self::Failure(kind) => Err(kind),
        }
    }
}

impl From<ErrorKind> for CommandOutcome {
    fn from(kind: ErrorKind) -> Self {
        Self::Failure(kind)
    }
}
