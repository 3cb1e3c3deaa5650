//! Representations for responses to SCSI/MMC commands.
//!
//! Each view is parsed out of a response buffer into plain values; nothing here
//! keeps a reference to the buffer or casts it to a struct.

use super::command_descriptor::{BitField, get_be16, get_be24, get_be32};
use crate::error::{ErrorKind, Result};

fn ensure_len(buf: &[u8], len: usize) -> Result<()> {
    if buf.len() < len {
        Err(ErrorKind::SizeMismatch)
    } else {
        Ok(())
    }
}

fn ascii_field(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).trim().to_string()
}

/// Peripheral device type of CD/DVD/BD drives.
pub const MMC_DEVICE_TYPE: u8 = 0x05;

/// Standard INQUIRY data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inquiry {
    /// PERIPHERAL QUALIFIER (bits 7:5). Zero when a device is connected.
    pub qualifier: u8,
    /// PERIPHERAL DEVICE TYPE (bits 4:0). Optical drives report 05h.
    pub device_type: u8,
    pub vendor: String,
    pub product: String,
    pub revision: String,
}

impl Inquiry {
    const QUALIFIER: BitField = BitField::new(0, 5, 3);
    const DEVICE_TYPE: BitField = BitField::new(0, 0, 5);

    pub fn parse(buf: &[u8]) -> Result<Self> {
        ensure_len(buf, 36)?;
        Ok(Self {
            qualifier: Self::QUALIFIER.get(buf),
            device_type: Self::DEVICE_TYPE.get(buf),
            vendor: ascii_field(&buf[8..16]),
            product: ascii_field(&buf[16..32]),
            revision: ascii_field(&buf[32..36]),
        })
    }

    /// "VENDOR PRODUCT", the name shown for a drive.
    pub fn display_name(&self) -> String {
        match (self.vendor.is_empty(), self.product.is_empty()) {
            (false, false) => format!("{} {}", self.vendor, self.product),
            (true, _) => self.product.clone(),
            (false, true) => self.vendor.clone(),
        }
    }
}

/// An MMC profile number (MMC-5 table 89).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Profile(pub u16);

impl Profile {
    pub const NONE: Self = Self(0x0000);
    pub const CD_ROM: Self = Self(0x0008);
    pub const CD_R: Self = Self(0x0009);
    pub const CD_RW: Self = Self(0x000A);
    pub const DVD_ROM: Self = Self(0x0010);
    pub const DVD_R: Self = Self(0x0011);
    pub const DVD_RAM: Self = Self(0x0012);
    pub const DVD_RW_RESTRICTED: Self = Self(0x0013);
    pub const DVD_RW_SEQUENTIAL: Self = Self(0x0014);
    pub const DVD_R_DL_SEQUENTIAL: Self = Self(0x0015);
    pub const DVD_R_DL_JUMP: Self = Self(0x0016);
    pub const DVD_PLUS_RW: Self = Self(0x001A);
    pub const DVD_PLUS_R: Self = Self(0x001B);
    pub const DVD_PLUS_RW_DL: Self = Self(0x002A);
    pub const DVD_PLUS_R_DL: Self = Self(0x002B);
    pub const BD_ROM: Self = Self(0x0040);
    pub const BD_R_SRM: Self = Self(0x0041);
    pub const BD_R_RRM: Self = Self(0x0042);
    pub const BD_RE: Self = Self(0x0043);

    pub fn name(self) -> Option<&'static str> {
        Some(match self {
            Self::CD_ROM => "CD-ROM",
            Self::CD_R => "CD-R",
            Self::CD_RW => "CD-RW",
            Self::DVD_ROM => "DVD-ROM",
            Self::DVD_R => "DVD-R",
            Self::DVD_RAM => "DVD-RAM",
            Self::DVD_RW_RESTRICTED => "DVD-RW (restricted overwrite)",
            Self::DVD_RW_SEQUENTIAL => "DVD-RW (sequential)",
            Self::DVD_R_DL_SEQUENTIAL => "DVD-R DL (sequential)",
            Self::DVD_R_DL_JUMP => "DVD-R DL (layer jump)",
            Self::DVD_PLUS_RW => "DVD+RW",
            Self::DVD_PLUS_R => "DVD+R",
            Self::DVD_PLUS_RW_DL => "DVD+RW DL",
            Self::DVD_PLUS_R_DL => "DVD+R DL",
            Self::BD_ROM => "BD-ROM",
            Self::BD_R_SRM => "BD-R (SRM)",
            Self::BD_R_RRM => "BD-R (RRM)",
            Self::BD_RE => "BD-RE",
            _ => return None,
        })
    }
}

/// Returns the body of the feature descriptor at the start of a GET
/// CONFIGURATION answer, checking that it is the feature that was asked for.
pub fn feature_descriptor(buf: &[u8], feature: u16) -> Result<&[u8]> {
    ensure_len(buf, 12)?;
    if get_be16(buf, 8) != feature {
        return Err(ErrorKind::TypeMismatch);
    }
    let additional = usize::from(buf[11]);
    let end = (12 + additional).min(buf.len());
    Ok(&buf[12..end])
}

/// The feature number of the profile list.
pub const PROFILE_LIST_FEATURE: u16 = 0x0000;

/// GET CONFIGURATION answer for the profile list feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileList {
    /// The profile of the loaded medium, [`Profile::NONE`] without one.
    pub current: Profile,
    pub profiles: Vec<Profile>,
}

impl ProfileList {
    pub fn parse(buf: &[u8]) -> Result<Self> {
        let body = feature_descriptor(buf, PROFILE_LIST_FEATURE)?;
        Ok(Self {
            current: Profile(get_be16(buf, 6)),
            profiles: body
                .chunks_exact(4)
                .map(|descriptor| Profile(get_be16(descriptor, 0)))
                .collect(),
        })
    }
}

/// MODE SENSE page 2Ah, "CD/DVD capabilities and mechanical status".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitiesPage {
    pub reads_cd_r: bool,
    pub reads_cd_rw: bool,
    pub reads_dvd_rom: bool,
    pub reads_dvd_r: bool,
    pub reads_dvd_ram: bool,
    pub writes_cd_r: bool,
    pub writes_cd_rw: bool,
    pub test_write: bool,
    pub writes_dvd_r: bool,
    pub writes_dvd_ram: bool,
    pub can_lock: bool,
    pub locked: bool,
    pub can_eject: bool,
    /// kB/s, zero when the page is too short to say.
    pub max_read_speed: u16,
    pub max_write_speed: u16,
}

impl CapabilitiesPage {
    pub const PAGE_CODE: u8 = 0x2A;

    const CODE: BitField = BitField::new(0, 0, 6);
    const READ_CD_R: BitField = BitField::flag(2, 0);
    const READ_CD_RW: BitField = BitField::flag(2, 1);
    const READ_DVD_ROM: BitField = BitField::flag(2, 3);
    const READ_DVD_R: BitField = BitField::flag(2, 4);
    const READ_DVD_RAM: BitField = BitField::flag(2, 5);
    const WRITE_CD_R: BitField = BitField::flag(3, 0);
    const WRITE_CD_RW: BitField = BitField::flag(3, 1);
    const TEST_WRITE: BitField = BitField::flag(3, 2);
    const WRITE_DVD_R: BitField = BitField::flag(3, 4);
    const WRITE_DVD_RAM: BitField = BitField::flag(3, 5);
    const LOCK: BitField = BitField::flag(6, 0);
    const LOCK_STATE: BitField = BitField::flag(6, 1);
    const EJECT: BitField = BitField::flag(6, 3);

    /// Parses a MODE SENSE (10) answer: an 8-byte header, optional block
    /// descriptors, then the page.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        ensure_len(buf, 8)?;
        let page_start = 8 + usize::from(get_be16(buf, 6));
        let page = buf.get(page_start..).ok_or(ErrorKind::SizeMismatch)?;
        ensure_len(page, 8)?;
        if Self::CODE.get(page) != Self::PAGE_CODE {
            return Err(ErrorKind::TypeMismatch);
        }

        let field = |offset: usize| {
            page.get(offset..offset + 2)
                .map_or(0, |bytes| get_be16(bytes, 0))
        };
        Ok(Self {
            reads_cd_r: Self::READ_CD_R.is_set(page),
            reads_cd_rw: Self::READ_CD_RW.is_set(page),
            reads_dvd_rom: Self::READ_DVD_ROM.is_set(page),
            reads_dvd_r: Self::READ_DVD_R.is_set(page),
            reads_dvd_ram: Self::READ_DVD_RAM.is_set(page),
            writes_cd_r: Self::WRITE_CD_R.is_set(page),
            writes_cd_rw: Self::WRITE_CD_RW.is_set(page),
            test_write: Self::TEST_WRITE.is_set(page),
            writes_dvd_r: Self::WRITE_DVD_R.is_set(page),
            writes_dvd_ram: Self::WRITE_DVD_RAM.is_set(page),
            can_lock: Self::LOCK.is_set(page),
            locked: Self::LOCK_STATE.is_set(page),
            can_eject: Self::EJECT.is_set(page),
            max_read_speed: field(8),
            max_write_speed: field(18),
        })
    }
}

/// READ CAPACITY data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacity {
    pub last_lba: u32,
    pub block_len: u32,
}

impl Capacity {
    pub fn parse(buf: &[u8]) -> Result<Self> {
        ensure_len(buf, 8)?;
        Ok(Self {
            last_lba: get_be32(buf, 0),
            block_len: get_be32(buf, 4),
        })
    }

    pub fn blocks(&self) -> u64 {
        u64::from(self.last_lba) + 1
    }
}

/// One track descriptor of a format 0 TOC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TocTrack {
    pub number: u8,
    pub adr: u8,
    pub control: u8,
    /// LBA, or the MSF address packed as 00MMSSFF when asked in MSF form.
    pub start: u32,
}

impl TocTrack {
    /// Track number of the lead-out entry.
    pub const LEAD_OUT: u8 = 0xAA;

    const ADR: BitField = BitField::new(1, 4, 4);
    const CONTROL: BitField = BitField::new(1, 0, 4);
    const DATA_TRACK: u8 = 0b0100;

    pub fn is_data(&self) -> bool {
        self.control & Self::DATA_TRACK != 0
    }
}

/// READ TOC/PMA/ATIP format 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toc {
    pub first_track: u8,
    pub last_track: u8,
    pub tracks: Vec<TocTrack>,
}

impl Toc {
    pub fn parse(buf: &[u8]) -> Result<Self> {
        ensure_len(buf, 4)?;
        Ok(Self {
            first_track: buf[2],
            last_track: buf[3],
            tracks: buf[4..]
                .chunks_exact(8)
                .map(|descriptor| TocTrack {
                    number: descriptor[2],
                    adr: TocTrack::ADR.get(descriptor),
                    control: TocTrack::CONTROL.get(descriptor),
                    start: get_be32(descriptor, 4),
                })
                .collect(),
        })
    }
}

/// DISC STATUS of READ DISC INFORMATION.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscStatus {
    Empty,
    Incomplete,
    Finalized,
    Other,
}

/// Standard disc information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscInfo {
    pub status: DiscStatus,
    /// State of the last session: 0 empty, 1 incomplete, 2 damaged, 3 complete.
    pub last_session_state: u8,
    pub erasable: bool,
    pub first_track: u8,
    pub sessions: u16,
    pub first_track_last_session: u16,
    pub last_track_last_session: u16,
}

impl DiscInfo {
    const STATUS: BitField = BitField::new(2, 0, 2);
    const LAST_SESSION: BitField = BitField::new(2, 2, 2);
    const ERASABLE: BitField = BitField::flag(2, 4);

    pub fn parse(buf: &[u8]) -> Result<Self> {
        ensure_len(buf, 12)?;
        let wide = |lsb: usize, msb: usize| u16::from_be_bytes([buf[msb], buf[lsb]]);
        Ok(Self {
            status: match Self::STATUS.get(buf) {
                0 => DiscStatus::Empty,
                1 => DiscStatus::Incomplete,
                2 => DiscStatus::Finalized,
                _ => DiscStatus::Other,
            },
            last_session_state: Self::LAST_SESSION.get(buf),
            erasable: Self::ERASABLE.is_set(buf),
            first_track: buf[3],
            sessions: wide(4, 9),
            first_track_last_session: wide(5, 10),
            last_track_last_session: wide(6, 11),
        })
    }
}

/// READ TRACK INFORMATION data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackInfo {
    pub number: u16,
    pub session: u16,
    pub track_mode: u8,
    pub data_mode: u8,
    pub blank: bool,
    pub packet: bool,
    pub start: u32,
    /// Only present when the drive flags it valid.
    pub next_writable: Option<u32>,
    pub free_blocks: u32,
    pub size: u32,
}

impl TrackInfo {
    const TRACK_MODE: BitField = BitField::new(5, 0, 4);
    const DATA_MODE: BitField = BitField::new(6, 0, 4);
    const PACKET: BitField = BitField::flag(6, 5);
    const BLANK: BitField = BitField::flag(6, 6);
    const NWA_VALID: BitField = BitField::flag(7, 0);

    pub fn parse(buf: &[u8]) -> Result<Self> {
        ensure_len(buf, 28)?;
        let msb = |offset: usize| buf.get(offset).copied().unwrap_or(0);
        Ok(Self {
            number: u16::from_be_bytes([msb(32), buf[2]]),
            session: u16::from_be_bytes([msb(33), buf[3]]),
            track_mode: Self::TRACK_MODE.get(buf),
            data_mode: Self::DATA_MODE.get(buf),
            blank: Self::BLANK.is_set(buf),
            packet: Self::PACKET.is_set(buf),
            start: get_be32(buf, 8),
            next_writable: Self::NWA_VALID.is_set(buf).then(|| get_be32(buf, 12)),
            free_blocks: get_be32(buf, 16),
            size: get_be32(buf, 24),
        })
    }
}

/// One entry of READ FORMAT CAPACITIES.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatCapacity {
    pub blocks: u32,
    /// For the first (current/maximum) descriptor: 1 unformatted, 2 formatted,
    /// 3 no medium. For the others, the format type.
    pub kind: u8,
    pub parameter: u32,
}

impl FormatCapacity {
    const DESCRIPTOR_TYPE: BitField = BitField::new(4, 0, 2);
    const FORMAT_TYPE: BitField = BitField::new(4, 2, 6);
}

/// READ FORMAT CAPACITIES data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatCapacities {
    pub current: FormatCapacity,
    pub formattable: Vec<FormatCapacity>,
}

impl FormatCapacities {
    pub fn parse(buf: &[u8]) -> Result<Self> {
        ensure_len(buf, 12)?;
        let list_end = (4 + usize::from(buf[3])).min(buf.len());
        let mut descriptors = buf[4..list_end].chunks_exact(8);
        let current = descriptors.next().ok_or(ErrorKind::SizeMismatch)?;
        Ok(Self {
            current: FormatCapacity {
                blocks: get_be32(current, 0),
                kind: FormatCapacity::DESCRIPTOR_TYPE.get(current),
                parameter: get_be24(current, 5),
            },
            formattable: descriptors
                .map(|descriptor| FormatCapacity {
                    blocks: get_be32(descriptor, 0),
                    kind: FormatCapacity::FORMAT_TYPE.get(descriptor),
                    parameter: get_be24(descriptor, 5),
                })
                .collect(),
        })
    }
}

/// A GET PERFORMANCE write speed descriptor. Speeds are in kB/s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteSpeed {
    pub end_lba: u32,
    pub read_speed: u32,
    pub write_speed: u32,
}

impl WriteSpeed {
    pub fn parse_all(buf: &[u8]) -> Result<Vec<Self>> {
        ensure_len(buf, 8)?;
        Ok(buf[8..]
            .chunks_exact(16)
            .map(|descriptor| Self {
                end_lba: get_be32(descriptor, 4),
                read_speed: get_be32(descriptor, 8),
                write_speed: get_be32(descriptor, 12),
            })
            .collect())
    }
}

/// READ DISC STRUCTURE format 00h for DVD media, the physical format information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalFormat {
    /// 0 DVD-ROM, 1 DVD-RAM, 2 DVD-R, 3 DVD-RW, 9 DVD+RW, 10 DVD+R,
    /// 13 DVD+RW DL, 14 DVD+R DL.
    pub book_type: u8,
    pub part_version: u8,
    pub layers: u8,
}

impl PhysicalFormat {
    pub const FORMAT: u8 = 0x00;

    const BOOK_TYPE: BitField = BitField::new(4, 4, 4);
    const PART_VERSION: BitField = BitField::new(4, 0, 4);
    const LAYERS: BitField = BitField::new(6, 5, 2);

    pub fn parse(buf: &[u8]) -> Result<Self> {
        ensure_len(buf, 8)?;
        Ok(Self {
            book_type: Self::BOOK_TYPE.get(buf),
            part_version: Self::PART_VERSION.get(buf),
            layers: Self::LAYERS.get(buf) + 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn inquiry_data() -> Vec<u8> {
        let mut buf = vec![0u8; 36];
        buf[0] = 0x05;
        buf[8..16].copy_from_slice(b"HL-DT-ST");
        buf[16..32].copy_from_slice(b"DVDRAM GH24NSD1 ");
        buf[32..36].copy_from_slice(b"LG00");
        buf
    }

    #[test]
    fn inquiry_strings_are_trimmed() {
        let inquiry = Inquiry::parse(&inquiry_data()).unwrap();
        assert_eq!(inquiry.device_type, MMC_DEVICE_TYPE);
        assert_eq!(inquiry.qualifier, 0);
        assert_eq!(inquiry.display_name(), "HL-DT-ST DVDRAM GH24NSD1");
        assert_eq!(inquiry.revision, "LG00");
    }

    #[test]
    fn short_inquiry_is_rejected() {
        assert_matches!(Inquiry::parse(&[0x05; 20]), Err(ErrorKind::SizeMismatch));
    }

    fn profile_answer(feature: u16, current: u16, profiles: &[(u16, bool)]) -> Vec<u8> {
        let mut buf = vec![0u8; 12];
        buf[6..8].copy_from_slice(&current.to_be_bytes());
        buf[8..10].copy_from_slice(&feature.to_be_bytes());
        buf[10] = 0x03;
        buf[11] = (profiles.len() * 4) as u8;
        for &(profile, is_current) in profiles {
            buf.extend_from_slice(&profile.to_be_bytes());
            buf.extend_from_slice(&[is_current.into(), 0]);
        }
        let declared = (buf.len() - 4) as u32;
        buf[..4].copy_from_slice(&declared.to_be_bytes());
        buf
    }

    #[test]
    fn profile_list() {
        let buf = profile_answer(0, 0x0011, &[(0x0011, true), (0x0009, false), (0x0043, false)]);
        let list = ProfileList::parse(&buf).unwrap();
        assert_eq!(list.current, Profile::DVD_R);
        assert_eq!(list.profiles, [Profile::DVD_R, Profile::CD_R, Profile::BD_RE]);
    }

    #[test]
    fn wrong_feature_echoed_back() {
        let buf = profile_answer(0x0001, 0, &[]);
        assert_matches!(ProfileList::parse(&buf), Err(ErrorKind::TypeMismatch));
    }

    #[test]
    fn capabilities_page_after_block_descriptors() {
        let mut buf = vec![0u8; 8 + 8 + 22];
        buf[7] = 8; // one block descriptor
        let page = &mut buf[16..];
        page[0] = 0x2A;
        page[1] = 20;
        page[2] = 0b0011_1011;
        page[3] = 0b0001_0011;
        page[6] = 0b0000_1001;
        page[8..10].copy_from_slice(&7056u16.to_be_bytes());
        page[18..20].copy_from_slice(&1411u16.to_be_bytes());

        let caps = CapabilitiesPage::parse(&buf).unwrap();
        assert!(caps.reads_cd_rw && caps.reads_dvd_r && caps.reads_dvd_ram);
        assert!(caps.writes_cd_r && caps.writes_cd_rw && caps.writes_dvd_r);
        assert!(!caps.writes_dvd_ram && !caps.test_write);
        assert!(caps.can_lock && caps.can_eject && !caps.locked);
        assert_eq!(caps.max_read_speed, 7056);
        assert_eq!(caps.max_write_speed, 1411);
    }

    #[test]
    fn wrong_mode_page() {
        let mut buf = vec![0u8; 8 + 20];
        buf[8] = 0x08;
        assert_matches!(CapabilitiesPage::parse(&buf), Err(ErrorKind::TypeMismatch));
    }

    #[test]
    fn toc_tracks() {
        let buf = [
            0, 18, 1, 1, // length, first and last track
            0, 0x14, 1, 0, 0, 0, 0, 0, // track 1, data, lba 0
            0, 0x10, 0xAA, 0, 0, 0x04, 0x93, 0xE0, // lead-out
        ];
        let toc = Toc::parse(&buf).unwrap();
        assert_eq!((toc.first_track, toc.last_track), (1, 1));
        assert_eq!(toc.tracks.len(), 2);
        assert!(toc.tracks[0].is_data());
        assert_eq!(toc.tracks[0].adr, 1);
        assert_eq!(toc.tracks[1].number, TocTrack::LEAD_OUT);
        assert_eq!(toc.tracks[1].start, 0x0004_93E0);
    }

    #[test]
    fn disc_information() {
        let mut buf = [0u8; 34];
        buf[1] = 32;
        buf[2] = 0b0001_0101; // erasable, incomplete last session, incomplete disc
        buf[3] = 1;
        buf[4] = 2;
        buf[5] = 3;
        buf[6] = 4;
        buf[9] = 1; // sessions MSB
        let info = DiscInfo::parse(&buf).unwrap();
        assert_eq!(info.status, DiscStatus::Incomplete);
        assert_eq!(info.last_session_state, 1);
        assert!(info.erasable);
        assert_eq!(info.sessions, 0x0102);
        assert_eq!(info.last_track_last_session, 4);
    }

    #[test]
    fn track_information() {
        let mut buf = [0u8; 48];
        buf[2] = 2;
        buf[3] = 1;
        buf[5] = 0x4;
        buf[6] = 0b0100_0001;
        buf[7] = 1;
        buf[8..12].copy_from_slice(&1000u32.to_be_bytes());
        buf[12..16].copy_from_slice(&1150u32.to_be_bytes());
        buf[16..20].copy_from_slice(&2_000_000u32.to_be_bytes());
        let info = TrackInfo::parse(&buf).unwrap();
        assert_eq!((info.number, info.session), (2, 1));
        assert!(info.blank && !info.packet);
        assert_eq!(info.next_writable, Some(1150));
        assert_eq!(info.free_blocks, 2_000_000);

        buf[7] = 0;
        assert_eq!(TrackInfo::parse(&buf).unwrap().next_writable, None);
        assert_matches!(TrackInfo::parse(&buf[..20]), Err(ErrorKind::SizeMismatch));
    }

    #[test]
    fn format_capacities() {
        let buf = [
            0, 0, 0, 16, // list length
            0x00, 0x23, 0x05, 0x40, 0b10, 0x00, 0x08, 0x00, // formatted, 2048-byte blocks
            0x00, 0x23, 0x05, 0x40, 0x26 << 2, 0x00, 0x00, 0x10,
        ];
        let capacities = FormatCapacities::parse(&buf).unwrap();
        assert_eq!(capacities.current.kind, 2);
        assert_eq!(capacities.current.blocks, 0x0023_0540);
        assert_eq!(capacities.current.parameter, 2048);
        assert_eq!(capacities.formattable.len(), 1);
        assert_eq!(capacities.formattable[0].kind, 0x26);
        assert_eq!(capacities.formattable[0].parameter, 0x10);
    }

    #[test]
    fn write_speeds() {
        let mut buf = vec![0u8; 8 + 32];
        for (i, speed) in [11080u32, 5540].into_iter().enumerate() {
            let descriptor = &mut buf[8 + i * 16..8 + (i + 1) * 16];
            descriptor[4..8].copy_from_slice(&2_295_104u32.to_be_bytes());
            descriptor[12..16].copy_from_slice(&speed.to_be_bytes());
        }
        let speeds = WriteSpeed::parse_all(&buf).unwrap();
        assert_eq!(
            speeds.iter().map(|s| s.write_speed).collect::<Vec<_>>(),
            [11080, 5540]
        );
    }

    #[test]
    fn dual_layer_physical_format() {
        let mut buf = [0u8; 8];
        buf[4] = 0xE1; // DVD+R DL, version 1
        buf[6] = 0b0010_0001;
        let format = PhysicalFormat::parse(&buf).unwrap();
        assert_eq!(format.book_type, 0xE);
        assert_eq!(format.part_version, 1);
        assert_eq!(format.layers, 2);
    }

    #[test]
    fn capacity() {
        let buf = [0x00, 0x23, 0x05, 0x3F, 0x00, 0x00, 0x08, 0x00];
        let capacity = Capacity::parse(&buf).unwrap();
        assert_eq!(capacity.blocks(), 0x0023_0540);
        assert_eq!(capacity.block_len, 2048);
    }
}
