//! Tunables of the drive probe.

use std::time::Duration;

/// Retry and polling bounds of one probe cycle.
///
/// The defaults are the figures drives have been tested with; nothing is
/// derived from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Attempts at opening a busy device before giving up.
    pub open_attempts: u32,
    /// Pause between two open attempts.
    pub open_retry_delay: Duration,
    /// Pause between two TEST UNIT READY while the drive is not ready.
    pub unit_ready_poll: Duration,
    /// Open the device with `O_EXCL`.
    pub exclusive: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            open_attempts: 5,
            open_retry_delay: Duration::from_secs(1),
            unit_ready_poll: Duration::from_secs(2),
            exclusive: false,
        }
    }
}
