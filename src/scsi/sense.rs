//! Decoding of sense data returned alongside CHECK CONDITION.
//!
//! Dispatch is by sense key first, then by the (ASC, ASCQ) pair inside the key.
//! Any combination that is not listed resolves to [`ErrorKind::Unknown`].

use tracing::warn;

use super::command_descriptor::BitField;
use crate::error::{CommandOutcome, ErrorKind};

/// How many bytes of sense data every backend asks the kernel for.
pub const SENSE_DATA_SIZE: usize = 19;

const NO_SENSE: u8 = 0x0;
const RECOVERED_ERROR: u8 = 0x1;
const NOT_READY: u8 = 0x2;
const ILLEGAL_REQUEST: u8 = 0x5;
const UNIT_ATTENTION: u8 = 0x6;

const RESPONSE_CODE: BitField = BitField::new(0, 0, 7);
const FIXED_SENSE_KEY: BitField = BitField::new(2, 0, 4);
const DESCRIPTOR_SENSE_KEY: BitField = BitField::new(1, 0, 4);

/// An (ASC, ASCQ) entry. `None` for the qualifier matches any value.
type AdditionalSense = (u8, Option<u8>, ErrorKind);

const NOT_READY_TABLE: &[AdditionalSense] = &[
    // logical unit not ready, all causes (becoming ready, init required, ...)
    (0x04, None, ErrorKind::NotReady),
    // medium not present, tray open or closed
    (0x3A, None, ErrorKind::NoMedium),
];

const ILLEGAL_REQUEST_TABLE: &[AdditionalSense] = &[
    (0x20, Some(0x00), ErrorKind::InvalidCommand),
    (0x21, Some(0x00), ErrorKind::OutOfRangeAddress),
    (0x21, Some(0x01), ErrorKind::InvalidAddress),
    // invalid address for write
    (0x21, Some(0x02), ErrorKind::InvalidAddress),
    (0x24, Some(0x00), ErrorKind::InvalidField),
    (0x26, None, ErrorKind::InvalidParameter),
    (0x64, Some(0x00), ErrorKind::InvalidTrackMode),
    // copy protection key exchange failure, key not established
    (0x6F, Some(0x02), ErrorKind::KeyNotEstablished),
];

const UNIT_ATTENTION_TABLE: &[AdditionalSense] = &[
    // not ready to ready change, medium may have changed
    (0x28, None, ErrorKind::NotReady),
    // power on, reset or bus device reset occurred
    (0x29, None, ErrorKind::NotReady),
    (0x3A, None, ErrorKind::NoMedium),
];

/// The three values that identify a device error.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub struct SenseTriple {
    pub key: u8,
    pub asc: u8,
    pub ascq: u8,
}

impl SenseTriple {
    pub const fn new(key: u8, asc: u8, ascq: u8) -> Self {
        Self { key, asc, ascq }
    }

    /// Extracts key/ASC/ASCQ from fixed (70h/71h) or descriptor (72h/73h) format sense.
    ///
    /// Returns `None` when there is nothing recognizable to decode.
    pub fn parse(sense: &[u8]) -> Option<Self> {
        let first = *sense.first()?;
        match RESPONSE_CODE.get(&[first]) {
            0x70 | 0x71 => Some(Self {
                key: FIXED_SENSE_KEY.get(sense.get(..3)?),
                asc: sense.get(12).copied().unwrap_or(0),
                ascq: sense.get(13).copied().unwrap_or(0),
            }),
            0x72 | 0x73 => Some(Self {
                key: DESCRIPTOR_SENSE_KEY.get(sense.get(..2)?),
                asc: sense.get(2).copied().unwrap_or(0),
                ascq: sense.get(3).copied().unwrap_or(0),
            }),
            _ => None,
        }
    }

    /// Maps this triple onto the error taxonomy.
    pub fn error_kind(self) -> ErrorKind {
        let table = match self.key {
            NOT_READY => NOT_READY_TABLE,
            ILLEGAL_REQUEST => ILLEGAL_REQUEST_TABLE,
            UNIT_ATTENTION => UNIT_ATTENTION_TABLE,
            _ => return self.unknown(),
        };
        table
            .iter()
            .find(|(asc, ascq, _)| *asc == self.asc && ascq.is_none_or(|q| q == self.ascq))
            .map(|&(_, _, kind)| kind)
            .unwrap_or_else(|| self.unknown())
    }

    fn unknown(self) -> ErrorKind {
        warn!(
            "unknown sense data: key {:#04x}, asc {:#04x}, ascq {:#04x}",
            self.key, self.asc, self.ascq
        );
        ErrorKind::Unknown
    }

    fn is_recovered(self) -> bool {
        self.key == RECOVERED_ERROR
            || (self.key == ILLEGAL_REQUEST && self.asc == 0x21 && self.ascq == 0x02)
    }
}

/// Translates raw sense bytes (or their absence) into an error kind.
pub fn translate(sense: Option<&[u8]>) -> ErrorKind {
    match sense.and_then(SenseTriple::parse) {
        Some(triple) => triple.error_kind(),
        None => {
            warn!("check condition without usable sense data");
            ErrorKind::Unknown
        }
    }
}

/// The outcome of a command that ended in CHECK CONDITION.
pub fn classify(sense: Option<&[u8]>) -> CommandOutcome {
    match sense.and_then(SenseTriple::parse) {
        Some(triple) if triple.is_recovered() => CommandOutcome::Recoverable,
        Some(triple) if triple.key == NO_SENSE && triple.asc == 0 && triple.ascq == 0 => {
            // some bridges flag check condition with an empty sense block
            warn!("check condition with NO SENSE");
            CommandOutcome::Failure(ErrorKind::Unknown)
        }
        Some(triple) => CommandOutcome::Failure(triple.error_kind()),
        None => CommandOutcome::Failure(translate(None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn fixed(key: u8, asc: u8, ascq: u8) -> [u8; SENSE_DATA_SIZE] {
        let mut sense = [0; SENSE_DATA_SIZE];
        sense[0] = 0x70;
        sense[2] = key;
        sense[7] = 0x0a;
        sense[12] = asc;
        sense[13] = ascq;
        sense
    }

    #[test]
    fn documented_table() {
        let cases = [
            ((NOT_READY, 0x04, 0x01), ErrorKind::NotReady),
            ((NOT_READY, 0x04, 0x00), ErrorKind::NotReady),
            ((NOT_READY, 0x3A, 0x00), ErrorKind::NoMedium),
            ((NOT_READY, 0x3A, 0x02), ErrorKind::NoMedium),
            ((ILLEGAL_REQUEST, 0x20, 0x00), ErrorKind::InvalidCommand),
            ((ILLEGAL_REQUEST, 0x21, 0x00), ErrorKind::OutOfRangeAddress),
            ((ILLEGAL_REQUEST, 0x21, 0x01), ErrorKind::InvalidAddress),
            ((ILLEGAL_REQUEST, 0x21, 0x02), ErrorKind::InvalidAddress),
            ((ILLEGAL_REQUEST, 0x24, 0x00), ErrorKind::InvalidField),
            ((ILLEGAL_REQUEST, 0x26, 0x00), ErrorKind::InvalidParameter),
            ((ILLEGAL_REQUEST, 0x26, 0x02), ErrorKind::InvalidParameter),
            ((ILLEGAL_REQUEST, 0x64, 0x00), ErrorKind::InvalidTrackMode),
            ((ILLEGAL_REQUEST, 0x6F, 0x02), ErrorKind::KeyNotEstablished),
            ((UNIT_ATTENTION, 0x28, 0x00), ErrorKind::NotReady),
            ((UNIT_ATTENTION, 0x29, 0x03), ErrorKind::NotReady),
            ((UNIT_ATTENTION, 0x3A, 0x01), ErrorKind::NoMedium),
        ];
        for ((key, asc, ascq), expected) in cases {
            assert_eq!(
                translate(Some(&fixed(key, asc, ascq))),
                expected,
                "key {key:#x} asc {asc:#x} ascq {ascq:#x}"
            );
        }
    }

    #[test]
    fn unlisted_combinations_are_unknown() {
        let cases = [
            (NOT_READY, 0x30, 0x00),
            (ILLEGAL_REQUEST, 0x20, 0x01),
            (ILLEGAL_REQUEST, 0x21, 0x03),
            (ILLEGAL_REQUEST, 0x6F, 0x00),
            (UNIT_ATTENTION, 0x04, 0x00),
            // medium error and hardware error keys are never refined
            (0x3, 0x11, 0x00),
            (0x4, 0x3A, 0x00),
            (0xF, 0xFF, 0xFF),
        ];
        for (key, asc, ascq) in cases {
            assert_eq!(translate(Some(&fixed(key, asc, ascq))), ErrorKind::Unknown);
        }
    }

    #[test]
    fn missing_or_garbled_sense_is_unknown() {
        assert_eq!(translate(None), ErrorKind::Unknown);
        assert_eq!(translate(Some(&[])), ErrorKind::Unknown);
        assert_eq!(translate(Some(&[0x00; SENSE_DATA_SIZE])), ErrorKind::Unknown);
        // fixed format but cut off before the sense key
        assert_eq!(translate(Some(&[0x70, 0x00])), ErrorKind::Unknown);
    }

    #[test]
    fn descriptor_format_is_understood() {
        let sense = [0x72, NOT_READY, 0x3A, 0x01, 0, 0, 0, 0];
        assert_eq!(translate(Some(&sense)), ErrorKind::NoMedium);
    }

    #[test]
    fn valid_bit_is_ignored() {
        let mut sense = fixed(ILLEGAL_REQUEST, 0x24, 0x00);
        sense[0] |= 0x80;
        assert_eq!(translate(Some(&sense)), ErrorKind::InvalidField);
    }

    #[test]
    fn recovered_errors_are_not_failures() {
        assert_matches!(
            classify(Some(&fixed(RECOVERED_ERROR, 0x17, 0x01))),
            CommandOutcome::Recoverable
        );
        assert_matches!(
            classify(Some(&fixed(ILLEGAL_REQUEST, 0x21, 0x02))),
            CommandOutcome::Recoverable
        );
        assert_matches!(
            classify(Some(&fixed(NOT_READY, 0x3A, 0x00))),
            CommandOutcome::Failure(ErrorKind::NoMedium)
        );
        assert_matches!(classify(None), CommandOutcome::Failure(ErrorKind::Unknown));
    }
}
