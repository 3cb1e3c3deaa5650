use bitflags::bitflags;

use crate::scsi::response::{CapabilitiesPage, Profile};

bitflags! {
    /// Writable media a drive supports.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DriveCapabilities: u32 {
        const CD_R = 1 << 0;
        const CD_RW = 1 << 1;
        const DVD_R = 1 << 2;
        const DVD_RW = 1 << 3;
        const DVD_R_DL = 1 << 4;
        const DVD_PLUS_R = 1 << 5;
        const DVD_PLUS_RW = 1 << 6;
        const DVD_PLUS_R_DL = 1 << 7;
        const DVD_PLUS_RW_DL = 1 << 8;
        const DVD_RAM = 1 << 9;
        const BD_R = 1 << 10;
        const BD_RE = 1 << 11;
    }
}

impl DriveCapabilities {
    /// The capability a profile implies, empty for read-only profiles.
    pub fn from_profile(profile: Profile) -> Self {
        match profile {
            Profile::CD_R => Self::CD_R,
            Profile::CD_RW => Self::CD_RW,
            Profile::DVD_R => Self::DVD_R,
            Profile::DVD_RW_RESTRICTED | Profile::DVD_RW_SEQUENTIAL => Self::DVD_RW,
            Profile::DVD_R_DL_SEQUENTIAL | Profile::DVD_R_DL_JUMP => Self::DVD_R_DL,
            Profile::DVD_PLUS_R => Self::DVD_PLUS_R,
            Profile::DVD_PLUS_RW => Self::DVD_PLUS_RW,
            Profile::DVD_PLUS_R_DL => Self::DVD_PLUS_R_DL,
            Profile::DVD_PLUS_RW_DL => Self::DVD_PLUS_RW_DL,
            Profile::DVD_RAM => Self::DVD_RAM,
            Profile::BD_R_SRM | Profile::BD_R_RRM => Self::BD_R,
            Profile::BD_RE => Self::BD_RE,
            _ => Self::empty(),
        }
    }

    pub fn from_profiles(profiles: &[Profile]) -> Self {
        profiles
            .iter()
            .fold(Self::empty(), |caps, &profile| caps | Self::from_profile(profile))
    }

    /// Older drives without GET CONFIGURATION only describe CD-R/RW, DVD-R
    /// and DVD-RAM writing in the capabilities page.
    pub fn from_capabilities_page(page: &CapabilitiesPage) -> Self {
        let mut caps = Self::empty();
        caps.set(Self::CD_R, page.writes_cd_r);
        caps.set(Self::CD_RW, page.writes_cd_rw);
        caps.set(Self::DVD_R, page.writes_dvd_r);
        caps.set(Self::DVD_RAM, page.writes_dvd_ram);
        caps
    }
}
