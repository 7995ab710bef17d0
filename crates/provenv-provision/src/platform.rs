//! Platform capability detection and the matching toolchain remediation.

use std::path::Path;

use crate::runner::CommandSpec;

/// Marker file identifying a Debian-family distribution, relative to the root.
const DEBIAN_MARKER: &str = "etc/debian_version";

/// System packages that provide the C, C++ and Fortran toolchain on Debian.
const APT_TOOLCHAIN_PACKAGES: &[&str] = &["build-essential", "gfortran"];

/// Which remediation strategy the host supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformTag {
    /// apt-based: missing compilers can be installed automatically
    Debian,
    /// No automatic remediation; missing tools are reported and fatal
    Unsupported,
}

impl PlatformTag {
    pub fn detect(root: &Path) -> Self {
        if root.join(DEBIAN_MARKER).is_file() {
            PlatformTag::Debian
        } else {
            PlatformTag::Unsupported
        }
    }

    /// Ordered commands that install the toolchain, or `None` when unsupported.
    pub fn remediation_plan(self, is_root: bool) -> Option<Vec<CommandSpec>> {
        match self {
            PlatformTag::Debian => Some(vec![
                CommandSpec::new("apt-get").arg("update").elevated(is_root),
                CommandSpec::new("apt-get")
                    .args(["install", "-y"])
                    .args(APT_TOOLCHAIN_PACKAGES.iter().copied())
                    .elevated(is_root),
            ]),
            PlatformTag::Unsupported => None,
        }
    }
}

impl std::fmt::Display for PlatformTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformTag::Debian => write!(f, "debian"),
            PlatformTag::Unsupported => write!(f, "unsupported"),
        }
    }
}
