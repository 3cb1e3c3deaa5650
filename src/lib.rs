//! Talking to CD, DVD and BD drives through the raw SCSI pass-through of the
//! host OS.
//!
//! Layers, from the device up:
//! - [`transport`]: one backend per OS, submitting a CDB and a data buffer.
//! - [`scsi`]: CDB encoding, the command catalog, sense translation, the
//!   two-phase size negotiation and parsed views of the answers.
//! - [`drive`]: a background probe that finds out what a drive can write and
//!   whether a medium is loaded.

pub mod config;
pub mod drive;
pub mod error;
pub mod scsi;
pub mod transport;

pub use config::ProbeConfig;
pub use drive::{Drive, DriveCapabilities, MediumPresence, ProbeState};
pub use error::{CommandOutcome, ErrorKind, Result};
