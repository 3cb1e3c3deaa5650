//! Two-phase retrieval of variable-length answers.
//!
//! MMC commands that return structured data of varying size announce the total
//! size in the first bytes of their answer, but the host must pick the buffer
//! size before it asks. So every such command goes through [`negotiate`]:
//!
//! 1. issue the command with room for just the fixed header,
//! 2. read the declared size and check it against the header size, the
//!    descriptor size and a hard ceiling,
//! 3. re-issue the identical command with a buffer of that size,
//! 4. if the device now declares more than it did before, issue it a third
//!    and last time with the larger size,
//! 5. keep the smaller of declared and allocated size.

use tracing::debug;

use super::command::CommandBlock;
use super::command_descriptor::{get_be16, get_be32};
use crate::error::Result;
use crate::transport::Transport;

/// Ceiling for commands with a 16-bit allocation length.
pub const LARGE_CEILING: usize = 65530;
/// Ceiling for commands whose answers are known to be small.
pub const SMALL_CEILING: usize = 2048;

/// Width of the field holding the declared size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    U8,
    U16,
    U32,
}

/// How one command's answer declares its own size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Negotiation {
    pub name: &'static str,
    /// Size of the fixed part asked for in the first phase.
    pub header_len: usize,
    pub length_offset: usize,
    pub length_width: Width,
    /// Added to the length field to get the total size; length fields do not
    /// count themselves (and for READ FORMAT CAPACITIES, not the header).
    pub length_adjust: usize,
    /// When the payload is an array, the size of one element.
    pub descriptor_len: Option<usize>,
    pub ceiling: usize,
}

impl Negotiation {
    /// GET CONFIGURATION for a single feature: 8 bytes of feature header
    /// followed by one 4-byte feature descriptor header.
    pub const GET_CONFIGURATION: Self = Self {
        name: "GET CONFIGURATION",
        header_len: 12,
        length_offset: 0,
        length_width: Width::U32,
        length_adjust: 4,
        descriptor_len: None,
        ceiling: LARGE_CEILING,
    };

    /// GET CONFIGURATION for the profile list feature, an array of 4-byte
    /// profile descriptors.
    pub const GET_CONFIGURATION_PROFILES: Self = Self {
        descriptor_len: Some(4),
        ..Self::GET_CONFIGURATION
    };

    /// GET PERFORMANCE, write speed descriptors.
    pub const GET_PERFORMANCE: Self = Self {
        name: "GET PERFORMANCE",
        header_len: 8,
        length_offset: 0,
        length_width: Width::U32,
        length_adjust: 4,
        descriptor_len: Some(16),
        ceiling: SMALL_CEILING,
    };

    /// MODE SENSE (10) for one page.
    pub const MODE_SENSE: Self = Self {
        name: "MODE SENSE",
        header_len: 8,
        length_offset: 0,
        length_width: Width::U16,
        length_adjust: 2,
        descriptor_len: None,
        ceiling: LARGE_CEILING,
    };

    /// READ TOC/PMA/ATIP formats whose entries are 8-byte descriptors (TOC,
    /// session info).
    pub const READ_TOC: Self = Self {
        name: "READ TOC/PMA/ATIP",
        header_len: 4,
        length_offset: 0,
        length_width: Width::U16,
        length_adjust: 2,
        descriptor_len: Some(8),
        ceiling: LARGE_CEILING,
    };

    /// READ TOC/PMA/ATIP formats made of 11-byte descriptors (full TOC, PMA).
    pub const READ_FULL_TOC: Self = Self {
        descriptor_len: Some(11),
        ..Self::READ_TOC
    };

    /// READ TOC/PMA/ATIP formats without a fixed descriptor size (ATIP, CD-TEXT).
    pub const READ_ATIP: Self = Self {
        descriptor_len: None,
        ..Self::READ_TOC
    };

    pub const READ_DISC_STRUCTURE: Self = Self {
        name: "READ DISC STRUCTURE",
        header_len: 4,
        length_offset: 0,
        length_width: Width::U16,
        length_adjust: 2,
        descriptor_len: None,
        ceiling: SMALL_CEILING,
    };

    /// The capacity list header has its length in the last byte and it only
    /// counts the descriptors.
    pub const READ_FORMAT_CAPACITIES: Self = Self {
        name: "READ FORMAT CAPACITIES",
        header_len: 4,
        length_offset: 3,
        length_width: Width::U8,
        length_adjust: 4,
        descriptor_len: Some(8),
        ceiling: LARGE_CEILING,
    };

    pub const READ_TRACK_INFORMATION: Self = Self {
        name: "READ TRACK INFORMATION",
        header_len: 4,
        length_offset: 0,
        length_width: Width::U16,
        length_adjust: 2,
        descriptor_len: None,
        ceiling: SMALL_CEILING,
    };

    pub const READ_DISC_INFORMATION: Self = Self {
        name: "READ DISC INFORMATION",
        ..Self::READ_TRACK_INFORMATION
    };

    /// The size an answer declares for itself.
    pub fn declared_len(&self, buf: &[u8]) -> usize {
        let field = match self.length_width {
            Width::U8 => usize::from(buf[self.length_offset]),
            Width::U16 => usize::from(get_be16(buf, self.length_offset)),
            Width::U32 => get_be32(buf, self.length_offset) as usize,
        };
        field.saturating_add(self.length_adjust)
    }

    /// Turns a declared size into a size we are willing to allocate.
    ///
    /// Sizes that cannot be right are replaced by the ceiling rather than
    /// trusted; sizes above the ceiling are cut to it.
    pub fn validate(&self, declared: usize) -> usize {
        if declared < self.header_len {
            debug!(
                "{}: undersized answer ({declared} < {}), using {}",
                self.name, self.header_len, self.ceiling
            );
            return self.ceiling;
        }
        if let Some(descriptor_len) = self.descriptor_len.filter(|&len| len > 0) {
            if (declared - self.header_len) % descriptor_len != 0 {
                debug!(
                    "{}: unaligned answer ({declared}), using {}",
                    self.name, self.ceiling
                );
                return self.ceiling;
            }
        }
        declared.min(self.ceiling)
    }
}

/// Runs the two-phase protocol for one command.
///
/// `build` produces the command for a given buffer size; it is called once per
/// phase and must encode the same request each time.
pub fn negotiate<T, F>(transport: &mut T, negotiation: &Negotiation, build: F) -> Result<Vec<u8>>
where
    T: Transport,
    F: Fn(usize) -> Result<CommandBlock>,
{
    let mut buffer = vec![0; negotiation.header_len];
    transport.submit(&build(buffer.len())?, &mut buffer)?;

    let requested = negotiation.validate(negotiation.declared_len(&buffer));
    buffer = vec![0; requested];
    transport.submit(&build(requested)?, &mut buffer)?;
    let mut reported = negotiation.declared_len(&buffer);

    // some drives only tell the real size once asked with a large enough buffer
    if reported > requested && requested < negotiation.ceiling {
        let corrected = reported.min(negotiation.ceiling);
        debug!(
            "{}: size grew from {requested} to {reported}, re-issuing with {corrected}",
            negotiation.name
        );
        buffer = vec![0; corrected];
        transport.submit(&build(corrected)?, &mut buffer)?;
        reported = negotiation.declared_len(&buffer);
    }

    if reported != buffer.len() {
        debug!(
            "{}: size mismatch, {reported} declared, {} allocated",
            negotiation.name,
            buffer.len()
        );
    }
    buffer.truncate(reported);
    Ok(buffer)
}
