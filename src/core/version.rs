use std::path::Path;

/// Version compared against the daemon; must match exactly.
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");
/// Version string with build metadata, for display only.
pub const DISPLAY_VERSION: &str = env!("CAIRN_VERSION");

pub const LANDING_PAGE_URL: &str = "https://console.redhat.com/openshift/create/local";
pub const DEFAULT_RELEASE_INFO_URL: &str = "https://releases.cairn.dev/latest/release-info.json";
pub const MACOS_APP_BUNDLE: &str = "/Applications/Cairn.app";

/// Distribution flavor selected at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildVariant {
    Standard,
    /// Community distribution build; human output carries an extra notice.
    Okd,
}

impl BuildVariant {
    pub const fn current() -> Self {
        if cfg!(feature = "okd") {
            Self::Okd
        } else {
            Self::Standard
        }
    }

    pub fn is_okd(self) -> bool {
        matches!(self, Self::Okd)
    }
}

/// Client and daemon versions observed during a compatibility check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub client: String,
    pub daemon: String,
}

impl VersionInfo {
    pub fn matches(&self) -> bool {
        self.client == self.daemon
    }
}

/// Whether `exe` runs from inside the macOS application bundle.
pub fn is_macos_app_install(exe: &Path) -> bool {
    exe.starts_with(MACOS_APP_BUNDLE)
}
