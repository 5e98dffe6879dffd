//! OpenWrt firmware image naming

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    /// In-place upgrade image
    Sysupgrade,
    /// Image for flashing from the vendor firmware
    Factory,
}

impl ImageKind {
    fn suffix(self) -> &'static str {
        match self {
            ImageKind::Sysupgrade => "sysupgrade",
            ImageKind::Factory => "factory",
        }
    }
}

/// Everything needed to name an image for one board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareTarget<'a> {
    pub version: &'a str,
    /// e.g. `ath79/generic`
    pub target: &'a str,
    /// e.g. `tplink_archer-c7-v2`
    pub device: &'a str,
}

impl FirmwareTarget<'_> {
    pub fn image_name(&self, kind: ImageKind) -> String {
        format!(
            "openwrt-{}-{}-squashfs-{}.bin",
            self.version,
            self.device,
            kind.suffix()
        )
    }

    pub fn image_url(&self, mirror: &str, kind: ImageKind) -> String {
        format!(
            "{}/{}/targets/{}/{}",
            mirror.trim_end_matches('/'),
            self.version,
            self.target,
            self.image_name(kind)
        )
    }

    pub fn urls(&self, mirror: &str) -> FirmwareUrls {
        FirmwareUrls {
            version: self.version.to_string(),
            sysupgrade: self.image_url(mirror, ImageKind::Sysupgrade),
            factory: self.image_url(mirror, ImageKind::Factory),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FirmwareUrls {
    pub version: String,
    pub sysupgrade: String,
    pub factory: String,
}
