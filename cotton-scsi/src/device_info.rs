use crate::ata::AcsVersion;
use alloc::string::String;

/// Extract a fixed-width ASCII field
///
/// Trailing bytes that aren't ASCII letters or digits (spaces, NULs,
/// padding) are dropped; the field also stops at any NUL before that.
pub fn trimmed_ascii(field: &[u8]) -> String {
    let end = field
        .iter()
        .rposition(|b| b.is_ascii_alphanumeric())
        .map_or(0, |i| i + 1);
    let field = &field[..end];
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    field[..end].iter().map(|&b| b as char).collect()
}

/// VPD page 0x89, ATA Information
pub const ATA_INFORMATION_VPD_PAGE: u8 = 0x89;
/// Full length of the ATA Information page
pub const ATA_INFORMATION_VPD_LENGTH: u16 = 0x238;

/// The SAT layer, from VPD page 0x89 (T10 SAT-4 s12.4.2)
#[cfg_attr(feature = "std", derive(Debug))]
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SatIdentity {
    pub vendor: String,
    pub product: String,
    pub revision: String,
}

impl SatIdentity {
    /// Decode VPD page 0x89; `None` if it isn't one
    pub fn parse(page: &[u8]) -> Option<Self> {
        if page.len() < 36 || page[1] != ATA_INFORMATION_VPD_PAGE {
            return None;
        }
        Some(Self {
            vendor: trimmed_ascii(&page[8..16]),
            product: trimmed_ascii(&page[16..32]),
            revision: trimmed_ascii(&page[32..36]),
        })
    }
}

/// What only an ATA device (behind SAT) can tell us
#[cfg_attr(feature = "std", derive(Debug))]
#[derive(Clone, PartialEq, Eq)]
pub struct AtaInfo {
    pub acs_version: AcsVersion,
    pub sat: SatIdentity,
}

/// Everything `ScsiDevice::information` discovers
#[cfg_attr(feature = "std", derive(Debug))]
#[derive(Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    pub vendor: String,
    pub product: String,
    pub revision: String,
    pub logical_block_size: u32,
    pub physical_block_size: u32,
    /// Capacity in 512-byte sectors
    pub capacity: u64,
    /// Present for ATA devices only
    pub ata: Option<AtaInfo>,
}

impl DeviceInfo {
    /// Capacity in bytes
    pub fn capacity_bytes(&self) -> u64 {
        self.capacity << 9
    }

    /// 0 (unknown) or 1-6
    pub fn acs_ordinal(&self) -> u8 {
        self.ata.as_ref().map_or(0, |a| a.acs_version.ordinal())
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn trim_padding() {
        assert_eq!(trimmed_ascii(b"VENDOR\0\0"), "VENDOR");
        assert_eq!(trimmed_ascii(b"ATA     "), "ATA");
        assert_eq!(trimmed_ascii(b"WDC WD40EFRX-68N"), "WDC WD40EFRX-68N");
        assert_eq!(trimmed_ascii(b"1.0 "), "1.0");
        assert_eq!(trimmed_ascii(b"    "), "");
        assert_eq!(trimmed_ascii(b""), "");
    }

    #[test]
    fn trim_stops_at_nul() {
        assert_eq!(trimmed_ascii(b"AB\0CD   "), "AB");
    }

    fn page89() -> Vec<u8> {
        let mut p = vec![0u8; ATA_INFORMATION_VPD_LENGTH as usize];
        p[1] = 0x89;
        p[8..16].copy_from_slice(b"VENDOR\0\0");
        p[16..32].copy_from_slice(b"SAT PRODUCT     ");
        p[32..36].copy_from_slice(b"0102");
        p
    }

    #[test]
    fn sat_identity() {
        let sat = SatIdentity::parse(&page89()).unwrap();
        assert_eq!(sat.vendor, "VENDOR");
        assert_eq!(sat.product, "SAT PRODUCT");
        assert_eq!(sat.revision, "0102");
    }

    #[test]
    fn sat_identity_wrong_page() {
        let mut p = page89();
        p[1] = 0x80;
        assert_eq!(SatIdentity::parse(&p), None);
        assert_eq!(SatIdentity::parse(&page89()[..20]), None);
    }

    #[test]
    fn acs_ordinal() {
        let mut info = DeviceInfo::default();
        assert_eq!(info.acs_ordinal(), 0);
        info.ata = Some(AtaInfo {
            acs_version: AcsVersion::Acs4,
            sat: SatIdentity::default(),
        });
        assert_eq!(info.acs_ordinal(), 4);
    }
}
