//! Underlying byte layout that commands are issued in.
//!
//! Every multi-byte field on the wire is big endian (MSB first) regardless of the
//! host. Fields are never read or written through host struct layouts; the
//! `get_be*`/`set_be*` primitives and [`BitField`] are the only way in or out.

/// The largest CDB any command in the catalog uses.
pub const MAX_CDB_SIZE: usize = 16;

/// Operation codes for a Command Descriptor Block, specifying what operation you want
/// to do, as listed in SPC-3 and MMC-5.
///
/// This enum is not complete, and is intended to grow
/// as needed
#[repr(u8)]
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    /// SPC-3 6.33
    TestUnitReady = 0x00,
    /// SPC-3 6.4
    Inquiry = 0x12,
    /// SBC-2 5.17
    StartStopUnit = 0x1B,
    /// SPC-3 6.13
    PreventAllowMediumRemoval = 0x1E,
    /// MMC-5 6.24
    ReadFormatCapacities = 0x23,
    /// MMC-5 6.20
    ReadCapacity = 0x25,
    /// MMC-5 6.26
    ReadTocPmaAtip = 0x43,
    /// MMC-5 6.6
    GetConfiguration = 0x46,
    /// MMC-5 6.22
    ReadDiscInformation = 0x51,
    /// MMC-5 6.27
    ReadTrackInformation = 0x52,
    /// SPC-3 6.10
    ModeSense10 = 0x5A,
    /// MMC-5 6.8
    GetPerformance = 0xAC,
    /// MMC-5 6.23
    ReadDiscStructure = 0xAD,
    /// MMC-5 6.19
    ReadCd = 0xBE,
}

impl OpCode {
    /// CDB length implied by the operation code's group (SPC-3 4.3.4.1).
    pub const fn cdb_len(self) -> usize {
        match (self as u8) >> 5 {
            0 => 6,
            1 | 2 => 10,
            4 => 16,
            5 => 12,
            // groups 3, 6 and 7 are reserved or vendor specific; nothing in the
            // catalog lives there
            _ => MAX_CDB_SIZE,
        }
    }
}

/// A sub-byte field: `width` bits starting at bit `shift` of byte `byte`.
///
/// Each packed field is declared once as a constant and read through this, so
/// there is no per-endianness struct mirror to keep in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitField {
    pub byte: usize,
    pub shift: u8,
    pub width: u8,
}

impl BitField {
    pub const fn new(byte: usize, shift: u8, width: u8) -> Self {
        assert!(width >= 1 && shift + width <= 8, "bit field must fit in a byte");
        Self { byte, shift, width }
    }

    /// A single-bit flag.
    pub const fn flag(byte: usize, bit: u8) -> Self {
        Self::new(byte, bit, 1)
    }

    const fn mask(self) -> u8 {
        (((1u16 << self.width) - 1) as u8) << self.shift
    }

    pub fn get(self, buf: &[u8]) -> u8 {
        (buf[self.byte] & self.mask()) >> self.shift
    }

    pub fn is_set(self, buf: &[u8]) -> bool {
        self.get(buf) != 0
    }

    /// Writes `value` into the field, leaving the neighbouring bits untouched.
    /// Bits of `value` that do not fit are discarded.
    pub fn set(self, buf: &mut [u8], value: u8) {
        let mask = self.mask();
        buf[self.byte] = (buf[self.byte] & !mask) | ((value << self.shift) & mask);
    }
}

// The accessors below panic if the field lies outside `buf`, like slice indexing.
// Callers check response lengths before decoding.

pub fn get_be16(buf: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([buf[offset], buf[offset + 1]])
}

pub fn set_be16(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
}

/// 24-bit fields (READ CD transfer length, format capacity parameters).
pub fn get_be24(buf: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([0, buf[offset], buf[offset + 1], buf[offset + 2]])
}

/// Only the low 24 bits of `value` are written.
pub fn set_be24(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 3].copy_from_slice(&value.to_be_bytes()[1..]);
}

pub fn get_be32(buf: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}

pub fn set_be32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
}

/// A CDB under construction.
///
/// The operation code sits at byte 0 and the CONTROL byte at the last byte of
/// the CDB. "The contents of the `CONTROL` field are defined in SAM-2"; nothing
/// here uses linked commands or NACA, so it stays zero.
#[derive(Debug, Clone)]
pub struct CommandDescriptor {
    bytes: [u8; MAX_CDB_SIZE],
    len: usize,
}

impl CommandDescriptor {
    pub fn new(operation_code: OpCode) -> Self {
        let mut bytes = [0; MAX_CDB_SIZE];
        bytes[0] = operation_code as u8;
        Self {
            bytes,
            len: operation_code.cdb_len(),
        }
    }

    pub fn byte(mut self, offset: usize, value: u8) -> Self {
        self.bytes[..self.len][offset] = value;
        self
    }

    pub fn bits(mut self, field: BitField, value: u8) -> Self {
        field.set(&mut self.bytes[..self.len], value);
        self
    }

    pub fn be16(mut self, offset: usize, value: u16) -> Self {
        set_be16(&mut self.bytes[..self.len], offset, value);
        self
    }

    pub fn be24(mut self, offset: usize, value: u32) -> Self {
        set_be24(&mut self.bytes[..self.len], offset, value);
        self
    }

    pub fn be32(mut self, offset: usize, value: u32) -> Self {
        set_be32(&mut self.bytes[..self.len], offset, value);
        self
    }

    pub(crate) fn into_parts(self) -> ([u8; MAX_CDB_SIZE], usize) {
        (self.bytes, self.len)
    }
}
