//! SCSI/MMC protocol and format implementation as described in:
//! - SCSI Primary Commands – 3 (SPC-3):
//!   <https://www.t10.org/ftp/t10/document.05/05-344r0.pdf>
//!   It has enough information to describe the commands every peripheral
//!   shares (INQUIRY, TEST UNIT READY, MODE SENSE, sense data).
//! - Multi-Media Commands – 5 (MMC-5)
//!   <https://www.t10.org/ftp/t10/document.05/05-061r0.pdf>
//!   Commands and data formats specific to CD, DVD and BD drives: profiles,
//!   features, TOC, disc and track information.

pub mod command;
mod command_descriptor;
pub mod negotiate;
pub mod response;
pub mod sense;

pub use command_descriptor::{BitField, MAX_CDB_SIZE, OpCode, get_be16, get_be24, get_be32};

use std::path::Path;

use tracing::debug;

use crate::error::{ErrorKind, Result};
use crate::transport::{PlatformTransport, Transport};
use command::{
    CAPABILITIES_PAGE, ConfigurationRequest, PerformanceType, SectorType, StructureMedia,
    TocFormat, TrackAddress,
};
use negotiate::{Negotiation, negotiate};
use response::{
    CapabilitiesPage, Capacity, DiscInfo, FormatCapacities, Inquiry, PROFILE_LIST_FEATURE,
    PhysicalFormat, ProfileList, Toc, TrackInfo, WriteSpeed,
};

/// An abstraction over an opened optical drive.
///
/// Commands are defined in the `command` module, and issued to the device with
/// the `.issue_command` method; the methods below wrap the ones the drive layer
/// needs, negotiating the answer size where the command has one.
#[derive(Debug)]
pub struct SCSIDevice<T: Transport = PlatformTransport> {
    transport: T,
}

impl<T: Transport> SCSIDevice<T> {
    /// Opens the device node at `path`.
    pub fn open(path: &Path, exclusive: bool) -> Result<Self> {
        Ok(Self::new(T::open(path, exclusive)?))
    }

    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Issues a command to the device.
    ///
    /// This function will submit the command to the device, and wait for the
    /// response to land in `buffer`.
    pub fn issue_command(&mut self, command: &command::CommandBlock, buffer: &mut [u8]) -> Result<()> {
        self.transport.submit(command, buffer)
    }

    pub fn test_unit_ready(&mut self) -> Result<()> {
        debug!("submitting TEST UNIT READY");
        self.issue_command(&command::test_unit_ready(), &mut [])
    }

    pub fn inquiry(&mut self) -> Result<Inquiry> {
        debug!("submitting INQUIRY");
        let mut buffer = [0; command::INQUIRY_LEN as usize];
        self.issue_command(&command::inquiry(command::INQUIRY_LEN), &mut buffer)?;
        Inquiry::parse(&buffer)
    }

    /// PREVENT (`true`) or ALLOW (`false`) MEDIUM REMOVAL.
    pub fn set_medium_removal(&mut self, prevent: bool) -> Result<()> {
        debug!(prevent, "submitting PREVENT ALLOW MEDIUM REMOVAL");
        self.issue_command(&command::prevent_allow_medium_removal(prevent), &mut [])
    }

    pub fn eject(&mut self) -> Result<()> {
        debug!("submitting START STOP UNIT (eject)");
        self.issue_command(&command::start_stop_unit(true, false), &mut [])
    }

    pub fn load(&mut self) -> Result<()> {
        debug!("submitting START STOP UNIT (load)");
        self.issue_command(&command::start_stop_unit(true, true), &mut [])
    }

    pub fn read_capacity(&mut self) -> Result<Capacity> {
        let mut buffer = [0; 8];
        self.issue_command(&command::read_capacity(), &mut buffer)?;
        Capacity::parse(&buffer)
    }

    /// Reads whole sectors into `buffer`, which decides how many are asked for.
    pub fn read_cd(
        &mut self,
        sector_type: SectorType,
        start_lba: u32,
        selection: u8,
        sector_size: usize,
        buffer: &mut [u8],
    ) -> Result<()> {
        if buffer.is_empty() || sector_size == 0 || buffer.len() % sector_size != 0 {
            return Err(ErrorKind::BadArgument);
        }
        let sectors = u32::try_from(buffer.len() / sector_size).map_err(|_| ErrorKind::BadArgument)?;
        let command = command::read_cd(sector_type, start_lba, sectors, selection, 0)?;
        self.issue_command(&command, buffer)
    }

    /// The whole GET CONFIGURATION answer for exactly one feature. Fails with
    /// [`ErrorKind::TypeMismatch`] when the drive answers with another feature.
    pub fn get_configuration_feature(&mut self, feature: u16) -> Result<Vec<u8>> {
        let answer = negotiate(&mut self.transport, &Negotiation::GET_CONFIGURATION, |len| {
            command::get_configuration(ConfigurationRequest::Single, feature, len)
        })?;
        response::feature_descriptor(&answer, feature)?;
        Ok(answer)
    }

    pub fn profiles(&mut self) -> Result<ProfileList> {
        let answer = negotiate(
            &mut self.transport,
            &Negotiation::GET_CONFIGURATION_PROFILES,
            |len| command::get_configuration(ConfigurationRequest::Single, PROFILE_LIST_FEATURE, len),
        )?;
        ProfileList::parse(&answer)
    }

    pub fn mode_sense_page(&mut self, page: u8) -> Result<Vec<u8>> {
        negotiate(&mut self.transport, &Negotiation::MODE_SENSE, |len| {
            command::mode_sense(page, len)
        })
    }

    pub fn capabilities_page(&mut self) -> Result<CapabilitiesPage> {
        CapabilitiesPage::parse(&self.mode_sense_page(CAPABILITIES_PAGE)?)
    }

    /// The format 0 TOC with LBA addresses.
    pub fn read_toc(&mut self) -> Result<Toc> {
        let answer = negotiate(&mut self.transport, &Negotiation::READ_TOC, |len| {
            command::read_toc_pma_atip(TocFormat::Toc, false, 0, len)
        })?;
        Toc::parse(&answer)
    }

    /// Raw READ TOC/PMA/ATIP answer for the formats without a dedicated view.
    pub fn read_toc_raw(&mut self, format: TocFormat, track_session: u8) -> Result<Vec<u8>> {
        let negotiation = match format {
            TocFormat::Toc | TocFormat::SessionInfo => &Negotiation::READ_TOC,
            TocFormat::FullToc | TocFormat::Pma => &Negotiation::READ_FULL_TOC,
            TocFormat::Atip | TocFormat::CdText => &Negotiation::READ_ATIP,
        };
        negotiate(&mut self.transport, negotiation, |len| {
            command::read_toc_pma_atip(format, false, track_session, len)
        })
    }

    pub fn read_disc_structure(
        &mut self,
        media: StructureMedia,
        layer: u8,
        format: u8,
    ) -> Result<Vec<u8>> {
        negotiate(&mut self.transport, &Negotiation::READ_DISC_STRUCTURE, |len| {
            command::read_disc_structure(media, 0, layer, format, 0, len)
        })
    }

    /// Book type and layer count of a DVD, from structure format 00h.
    pub fn physical_format(&mut self, layer: u8) -> Result<PhysicalFormat> {
        let answer =
            self.read_disc_structure(StructureMedia::Dvd, layer, PhysicalFormat::FORMAT)?;
        PhysicalFormat::parse(&answer)
    }

    pub fn read_format_capacities(&mut self) -> Result<FormatCapacities> {
        let answer = negotiate(
            &mut self.transport,
            &Negotiation::READ_FORMAT_CAPACITIES,
            command::read_format_capacities,
        )?;
        FormatCapacities::parse(&answer)
    }

    pub fn read_track_information(&mut self, track: u32) -> Result<TrackInfo> {
        let answer = negotiate(
            &mut self.transport,
            &Negotiation::READ_TRACK_INFORMATION,
            |len| command::read_track_information(TrackAddress::Track, track, len),
        )?;
        TrackInfo::parse(&answer)
    }

    pub fn read_disc_information(&mut self) -> Result<DiscInfo> {
        let answer = negotiate(
            &mut self.transport,
            &Negotiation::READ_DISC_INFORMATION,
            command::read_disc_information,
        )?;
        DiscInfo::parse(&answer)
    }

    /// Write speeds the drive offers for the loaded medium.
    pub fn write_speeds(&mut self) -> Result<Vec<WriteSpeed>> {
        let answer = negotiate(&mut self.transport, &Negotiation::GET_PERFORMANCE, |len| {
            let descriptors = len.saturating_sub(8) / 16;
            let descriptors = u16::try_from(descriptors).map_err(|_| ErrorKind::BadArgument)?;
            Ok(command::get_performance(
                PerformanceType::WriteSpeed,
                0,
                0,
                descriptors,
            ))
        })?;
        WriteSpeed::parse_all(&answer)
    }
}
