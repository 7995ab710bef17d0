//! Tool presence checks and the compiler toolchain audit.

use std::path::PathBuf;

use crate::error::{ProvisionError, Result};
use crate::platform::PlatformTag;
use crate::runner::{run_checked, CommandRunner};

/// Resolves executables by name.
pub trait ToolLocator {
    fn locate(&self, name: &str) -> Option<PathBuf>;
}

/// Looks tools up on `PATH`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PathLocator;

impl ToolLocator for PathLocator {
    fn locate(&self, name: &str) -> Option<PathBuf> {
        which::which(name).ok()
    }
}

/// Fail with `PrerequisiteMissing` on the first tool that cannot be found.
pub fn require_tools(locator: &dyn ToolLocator, tools: &[String]) -> Result<()> {
    for tool in tools {
        match locator.locate(tool) {
            Some(path) => tracing::debug!(tool = %tool, path = %path.display(), "found"),
            None => {
                return Err(ProvisionError::PrerequisiteMissing { tool: tool.clone() });
            }
        }
    }
    Ok(())
}

/// The subset of `tools` that is absent, in the given order.
pub fn missing_tools(locator: &dyn ToolLocator, tools: &[String]) -> Vec<String> {
    tools
        .iter()
        .filter(|t| locator.locate(t).is_none())
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolchainStatus {
    /// Everything was already installed
    Complete,
    /// These tools were missing and have been installed
    Remediated(Vec<String>),
}

/// Check the compiler toolchain and install it when the platform allows.
pub fn audit_toolchain(
    locator: &dyn ToolLocator,
    runner: &dyn CommandRunner,
    toolchain: &[String],
    platform: PlatformTag,
    is_root: bool,
) -> Result<ToolchainStatus> {
    let missing = missing_tools(locator, toolchain);
    if missing.is_empty() {
        return Ok(ToolchainStatus::Complete);
    }

    let Some(plan) = platform.remediation_plan(is_root) else {
        return Err(ProvisionError::UnsupportedPlatform { missing });
    };

    tracing::warn!(
        missing = %missing.join(" "),
        platform = %platform,
        "build tools missing, installing via system package manager"
    );
    for cmd in &plan {
        run_checked(runner, cmd, |detail| ProvisionError::RemediationFailure { detail })?;
    }

    let still_missing = missing_tools(locator, toolchain);
    if !still_missing.is_empty() {
        return Err(ProvisionError::RemediationFailure {
            detail: format!(
                "still missing after installation: {}",
                still_missing.join(" ")
            ),
        });
    }
    Ok(ToolchainStatus::Remediated(missing))
}
