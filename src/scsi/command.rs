//! Representations for SCSI/MMC commands.
//!
//! This module uses the term "command descriptor" to describe the byte layout under
//! construction, and uses the term "command block" to describe a "black box" containing
//! a valid CDB.
//!
//! Commands are exposed as a function that returns a [`CommandBlock`]. These functions wrap
//! the more granular [`CommandDescriptor`] builder. Every function is pure: the same
//! arguments always give the same bytes, and nothing is sent until a transport executes
//! the block.

use super::command_descriptor::*;
use crate::error::{ErrorKind, Result};

/// Which way data moves during the command's data phase.
///
/// A command with an empty buffer transfers nothing, whatever its direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// From the device to the host.
    Read,
    /// From the host to the device.
    Write,
}

/// A serialized command block ready to be submitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBlock {
    command: [u8; MAX_CDB_SIZE],
    len: usize,
    pub direction: Direction,
}

impl CommandBlock {
    fn new(descriptor: CommandDescriptor, direction: Direction) -> Self {
        let (command, len) = descriptor.into_parts();
        Self {
            command,
            len,
            direction,
        }
    }

    /// Returns the length of the underlying command block.
    ///
    /// Will never be more than 16 bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The encoded CDB, exactly [`Self::len`] bytes long.
    pub fn as_bytes(&self) -> &[u8] {
        &self.command[..self.len]
    }

    /// Returns the command block zero padded to the largest CDB size.
    pub fn get(&self) -> [u8; MAX_CDB_SIZE] {
        self.command
    }

    pub fn opcode(&self) -> u8 {
        self.command[0]
    }
}

fn allocation_length(len: usize) -> Result<u16> {
    u16::try_from(len).map_err(|_| ErrorKind::BadArgument)
}

/// "The TEST UNIT READY command provides a means to check if the logical unit is ready.
///
/// If the logical unit is able to accept an appropriate medium access command without
/// returning CHECK CONDITION status, this command shall return a GOOD status. If the logical
/// unit is unable to become operational or is in a state such that an applicaton client action
/// (e.g START UNIT command) is required to make the unit ready, the device server shall return
/// CHECK CONDITION status with a sense key of NOT READY."
///
/// Defined in SPC-3 6.33
pub fn test_unit_ready() -> CommandBlock {
    CommandBlock::new(CommandDescriptor::new(OpCode::TestUnitReady), Direction::Read)
}

/// The number of bytes of standard INQUIRY data we ask for.
///
/// "The standard INQUIRY data shall contain at least 36 bytes"
pub const INQUIRY_LEN: u16 = 36;

/// "The INQUIRY command requests that information regarding parameters
/// of the target and a component logical unit be sent to the application client."
///
/// SPC-3 6.4.1. The allocation length is 16 bits wide since SPC-3; older
/// drives only look at byte 4, which is why requests stay under 256 bytes.
pub fn inquiry(allocation: u16) -> CommandBlock {
    CommandBlock::new(
        CommandDescriptor::new(OpCode::Inquiry).be16(3, allocation),
        Direction::Read,
    )
}

/// "The PREVENT ALLOW MEDIUM REMOVAL command requests that the logical unit
/// enable or disable the removal of the medium."
///
/// SPC-3 6.13
pub fn prevent_allow_medium_removal(prevent: bool) -> CommandBlock {
    const PREVENT: BitField = BitField::new(4, 0, 2);
    CommandBlock::new(
        CommandDescriptor::new(OpCode::PreventAllowMediumRemoval).bits(PREVENT, prevent.into()),
        Direction::Read,
    )
}

/// START STOP UNIT, used to load and eject the tray.
///
/// With `load_eject` set, `start` chooses between loading (true) and ejecting (false).
/// SBC-2 5.17
pub fn start_stop_unit(load_eject: bool, start: bool) -> CommandBlock {
    const START: BitField = BitField::flag(4, 0);
    const LOEJ: BitField = BitField::flag(4, 1);
    CommandBlock::new(
        CommandDescriptor::new(OpCode::StartStopUnit)
            .bits(LOEJ, load_eject.into())
            .bits(START, start.into()),
        Direction::Read,
    )
}

/// "The `READ CAPACITY` command provides a means for the application client
/// to request information regarding the capacity of the block device."
///
/// The answer is always 8 bytes. MMC-5 6.20
pub fn read_capacity() -> CommandBlock {
    CommandBlock::new(CommandDescriptor::new(OpCode::ReadCapacity), Direction::Read)
}

/// MMC-5 6.24
pub fn read_format_capacities(allocation: usize) -> Result<CommandBlock> {
    Ok(CommandBlock::new(
        CommandDescriptor::new(OpCode::ReadFormatCapacities).be16(7, allocation_length(allocation)?),
        Direction::Read,
    ))
}

/// The FORMAT field of READ TOC/PMA/ATIP.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TocFormat {
    Toc = 0x0,
    SessionInfo = 0x1,
    FullToc = 0x2,
    Pma = 0x3,
    Atip = 0x4,
    CdText = 0x5,
}

/// MMC-5 6.26
pub fn read_toc_pma_atip(
    format: TocFormat,
    msf: bool,
    track_session: u8,
    allocation: usize,
) -> Result<CommandBlock> {
    const MSF: BitField = BitField::flag(1, 1);
    const FORMAT: BitField = BitField::new(2, 0, 4);
    Ok(CommandBlock::new(
        CommandDescriptor::new(OpCode::ReadTocPmaAtip)
            .bits(MSF, msf.into())
            .bits(FORMAT, format as u8)
            .byte(6, track_session)
            .be16(7, allocation_length(allocation)?),
        Direction::Read,
    ))
}

/// The RT field of GET CONFIGURATION.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigurationRequest {
    /// Every feature from the starting one on.
    All = 0b00,
    /// Only features with the current bit set.
    Current = 0b01,
    /// Exactly the starting feature, if the drive has it.
    Single = 0b10,
}

/// MMC-5 6.6
pub fn get_configuration(
    request: ConfigurationRequest,
    starting_feature: u16,
    allocation: usize,
) -> Result<CommandBlock> {
    const RT: BitField = BitField::new(1, 0, 2);
    Ok(CommandBlock::new(
        CommandDescriptor::new(OpCode::GetConfiguration)
            .bits(RT, request as u8)
            .be16(2, starting_feature)
            .be16(7, allocation_length(allocation)?),
        Direction::Read,
    ))
}

/// MMC-5 6.22, standard disc information (data type 000b).
pub fn read_disc_information(allocation: usize) -> Result<CommandBlock> {
    Ok(CommandBlock::new(
        CommandDescriptor::new(OpCode::ReadDiscInformation).be16(7, allocation_length(allocation)?),
        Direction::Read,
    ))
}

/// How READ TRACK INFORMATION interprets its address/number field.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackAddress {
    Lba = 0b00,
    Track = 0b01,
    Session = 0b10,
}

/// MMC-5 6.27
pub fn read_track_information(
    address_type: TrackAddress,
    number: u32,
    allocation: usize,
) -> Result<CommandBlock> {
    const ADDRESS_TYPE: BitField = BitField::new(1, 0, 2);
    Ok(CommandBlock::new(
        CommandDescriptor::new(OpCode::ReadTrackInformation)
            .bits(ADDRESS_TYPE, address_type as u8)
            .be32(2, number)
            .be16(7, allocation_length(allocation)?),
        Direction::Read,
    ))
}

/// The capabilities and mechanical status mode page.
pub const CAPABILITIES_PAGE: u8 = 0x2A;

/// MODE SENSE (10) for the current values of one page, without block descriptors.
///
/// SPC-3 6.10
pub fn mode_sense(page: u8, allocation: usize) -> Result<CommandBlock> {
    const DBD: BitField = BitField::flag(1, 3);
    const PAGE_CODE: BitField = BitField::new(2, 0, 6);
    Ok(CommandBlock::new(
        CommandDescriptor::new(OpCode::ModeSense10)
            .bits(DBD, 1)
            .bits(PAGE_CODE, page)
            .be16(7, allocation_length(allocation)?),
        Direction::Read,
    ))
}

/// The TYPE field of GET PERFORMANCE.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformanceType {
    Performance = 0x00,
    WriteSpeed = 0x03,
}

/// GET PERFORMANCE. Unlike the other variable-length commands the size is
/// given as a number of descriptors, not bytes.
///
/// MMC-5 6.8
pub fn get_performance(
    kind: PerformanceType,
    data_type: u8,
    start_lba: u32,
    max_descriptors: u16,
) -> CommandBlock {
    const DATA_TYPE: BitField = BitField::new(1, 0, 5);
    CommandBlock::new(
        CommandDescriptor::new(OpCode::GetPerformance)
            .bits(DATA_TYPE, data_type)
            .be32(2, start_lba)
            .be16(8, max_descriptors)
            .byte(10, kind as u8),
        Direction::Read,
    )
}

/// The MEDIA TYPE field of READ DISC STRUCTURE.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureMedia {
    Dvd = 0b0000,
    BluRay = 0b0001,
}

/// MMC-5 6.23
pub fn read_disc_structure(
    media: StructureMedia,
    address: u32,
    layer: u8,
    format: u8,
    agid: u8,
    allocation: usize,
) -> Result<CommandBlock> {
    const MEDIA_TYPE: BitField = BitField::new(1, 0, 4);
    const AGID: BitField = BitField::new(10, 6, 2);
    Ok(CommandBlock::new(
        CommandDescriptor::new(OpCode::ReadDiscStructure)
            .bits(MEDIA_TYPE, media as u8)
            .be32(2, address)
            .byte(6, layer)
            .byte(7, format)
            .be16(8, allocation_length(allocation)?)
            .bits(AGID, agid),
        Direction::Read,
    ))
}

/// The EXPECTED SECTOR TYPE field of READ CD.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorType {
    Any = 0b000,
    CdDa = 0b001,
    Mode1 = 0b010,
    Mode2Formless = 0b011,
    Mode2Form1 = 0b100,
    Mode2Form2 = 0b101,
}

/// Byte 9 of READ CD: user data only.
pub const READ_CD_USER_DATA: u8 = 0x10;
/// Byte 9 of READ CD: the whole 2352-byte raw sector.
pub const READ_CD_RAW: u8 = 0xF8;

/// MMC-5 6.19. The transfer length is a 24-bit count of sectors, so anything
/// larger is rejected before it reaches a device.
pub fn read_cd(
    sector_type: SectorType,
    start_lba: u32,
    sectors: u32,
    selection: u8,
    subchannel: u8,
) -> Result<CommandBlock> {
    const SECTOR_TYPE: BitField = BitField::new(1, 2, 3);
    const SUBCHANNEL: BitField = BitField::new(10, 0, 3);
    if sectors == 0 || sectors > 0x00FF_FFFF {
        return Err(ErrorKind::BadArgument);
    }
    Ok(CommandBlock::new(
        CommandDescriptor::new(OpCode::ReadCd)
            .bits(SECTOR_TYPE, sector_type as u8)
            .be32(2, start_lba)
            .be24(6, sectors)
            .byte(9, selection)
            .bits(SUBCHANNEL, subchannel),
        Direction::Read,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn validate_command_block() {
        let cb = test_unit_ready();
        assert_eq!(cb.len(), 6);
        let mut serialized_cb = cb.get().into_iter();
        assert!(serialized_cb.next() == Some(0));
        assert!(serialized_cb.all(|b| b == 0));
    }

    #[test]
    fn inquiry_asks_for_standard_data() {
        assert_eq!(inquiry(INQUIRY_LEN).as_bytes(), [0x12, 0, 0, 0, 36, 0]);
    }

    #[test]
    fn medium_removal_and_eject() {
        assert_eq!(prevent_allow_medium_removal(true).as_bytes(), [0x1E, 0, 0, 0, 1, 0]);
        assert_eq!(prevent_allow_medium_removal(false).as_bytes(), [0x1E, 0, 0, 0, 0, 0]);
        assert_eq!(start_stop_unit(true, false).as_bytes(), [0x1B, 0, 0, 0, 0b10, 0]);
        assert_eq!(start_stop_unit(true, true).as_bytes(), [0x1B, 0, 0, 0, 0b11, 0]);
    }

    #[test]
    fn get_configuration_layout() {
        let cb = get_configuration(ConfigurationRequest::Single, 0x0000, 0x1234).unwrap();
        assert_eq!(cb.as_bytes(), [0x46, 0b10, 0, 0, 0, 0, 0, 0x12, 0x34, 0]);

        let cb = get_configuration(ConfigurationRequest::All, 0x0107, 8).unwrap();
        assert_eq!(cb.as_bytes(), [0x46, 0, 0x01, 0x07, 0, 0, 0, 0, 8, 0]);
    }

    #[test]
    fn allocation_wider_than_sixteen_bits_is_rejected() {
        assert_matches!(
            get_configuration(ConfigurationRequest::All, 0, 0x1_0000),
            Err(ErrorKind::BadArgument)
        );
        assert_matches!(read_disc_information(70_000), Err(ErrorKind::BadArgument));
    }

    #[test]
    fn read_toc_layout() {
        let cb = read_toc_pma_atip(TocFormat::FullToc, true, 1, 4).unwrap();
        assert_eq!(cb.as_bytes(), [0x43, 0b10, 0x2, 0, 0, 0, 1, 0, 4, 0]);
    }

    #[test]
    fn track_information_layout() {
        let cb = read_track_information(TrackAddress::Track, 0xFF, 48).unwrap();
        assert_eq!(cb.as_bytes(), [0x52, 0b01, 0, 0, 0, 0xFF, 0, 0, 48, 0]);
    }

    #[test]
    fn mode_sense_disables_block_descriptors() {
        let cb = mode_sense(CAPABILITIES_PAGE, 8).unwrap();
        assert_eq!(cb.as_bytes(), [0x5A, 0b1000, 0x2A, 0, 0, 0, 0, 0, 8, 0]);
    }

    #[test]
    fn get_performance_counts_descriptors() {
        let cb = get_performance(PerformanceType::WriteSpeed, 0, 0, 3);
        assert_eq!(cb.as_bytes(), [0xAC, 0, 0, 0, 0, 0, 0, 0, 0, 3, 0x03, 0]);
    }

    #[test]
    fn read_disc_structure_layout() {
        let cb = read_disc_structure(StructureMedia::BluRay, 0, 1, 0x00, 2, 2052).unwrap();
        assert_eq!(
            cb.as_bytes(),
            [0xAD, 1, 0, 0, 0, 0, 1, 0, 0x08, 0x04, 0b1000_0000, 0]
        );
    }

    #[test]
    fn read_cd_uses_a_24_bit_length() {
        let cb = read_cd(SectorType::Mode1, 0x0001_0203, 0x0A_0B0C, READ_CD_USER_DATA, 0).unwrap();
        assert_eq!(
            cb.as_bytes(),
            [0xBE, 0b1000, 0x00, 0x01, 0x02, 0x03, 0x0A, 0x0B, 0x0C, 0x10, 0, 0]
        );
        assert_matches!(
            read_cd(SectorType::Any, 0, 0x0100_0000, READ_CD_RAW, 0),
            Err(ErrorKind::BadArgument)
        );
        assert_matches!(read_cd(SectorType::Any, 0, 0, READ_CD_RAW, 0), Err(ErrorKind::BadArgument));
    }
}
