//! Installer steps run inside an activated environment.

use std::path::Path;

use serde::Deserialize;

use crate::conda::Activation;
use crate::error::{ProvisionError, Result};
use crate::runner::{run_checked, CommandRunner};

/// An environment variable applied to exactly one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvOverride {
    pub key: String,
    pub value: String,
}

impl EnvOverride {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

fn install(
    runner: &dyn CommandRunner,
    activation: &Activation,
    packages: &[String],
) -> Result<()> {
    if packages.is_empty() {
        return Ok(());
    }
    let cmd = activation.pip(["install"]).args(packages.iter().cloned());
    run_checked(runner, &cmd, |detail| ProvisionError::DependencyInstallFailure { detail })?;
    Ok(())
}

/// Install the exact-version dependency set.
pub fn install_dependencies(
    runner: &dyn CommandRunner,
    activation: &Activation,
    pins: &[String],
) -> Result<()> {
    tracing::info!(count = pins.len(), "installing pinned dependencies");
    install(runner, activation, pins)
}

/// Install the upper-bounded build-support libraries.
pub fn install_build_pins(
    runner: &dyn CommandRunner,
    activation: &Activation,
    pins: &[String],
) -> Result<()> {
    tracing::info!(pins = %pins.join(" "), "installing build-support pins");
    install(runner, activation, pins)
}

/// Build and install the package at `source_dir` without build isolation,
/// so the environment's compilers and pinned build tools are used.
pub fn build_and_install(
    runner: &dyn CommandRunner,
    activation: &Activation,
    source_dir: &Path,
    env_override: &EnvOverride,
) -> Result<()> {
    let cmd = activation
        .pip(["install", "--no-build-isolation"])
        .arg(source_dir.to_string_lossy())
        .env(env_override.key.as_str(), env_override.value.as_str())
        .current_dir(source_dir);
    tracing::info!(source = %source_dir.display(), "building and installing package");
    run_checked(runner, &cmd, |detail| ProvisionError::BuildFailure { detail })?;
    Ok(())
}

/// One row of `pip list --format=json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InstalledPackage {
    pub name: String,
    pub version: String,
}

pub fn list_installed(
    runner: &dyn CommandRunner,
    activation: &Activation,
) -> Result<Vec<InstalledPackage>> {
    let cmd = activation.pip(["list", "--format=json"]).captured();
    let out = run_checked(runner, &cmd, |detail| {
        ProvisionError::EnvironmentOperationFailure {
            operation: "package listing",
            detail,
        }
    })?;
    parse_pip_list(&out.stdout).map_err(|e| ProvisionError::EnvironmentOperationFailure {
        operation: "package listing",
        detail: format!("unreadable installer output: {}", e),
    })
}

pub(crate) fn parse_pip_list(json: &str) -> serde_json::Result<Vec<InstalledPackage>> {
    serde_json::from_str(json.trim())
}

/// Project names compare case-insensitively with `-`, `_` and `.` equivalent.
fn normalize(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .replace(['_', '.'], "-")
}

/// An exact pin whose package is absent or installed at another version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinMismatch {
    pub name: String,
    pub expected: String,
    /// `None` when the package is not installed at all
    pub found: Option<String>,
}

/// Compare `name==version` pins against a listing; range pins are ignored.
pub fn pin_mismatches(installed: &[InstalledPackage], pins: &[String]) -> Vec<PinMismatch> {
    pins.iter()
        .filter_map(|pin| {
            let (name, expected) = pin.split_once("==")?;
            let found = installed
                .iter()
                .find(|p| normalize(&p.name) == normalize(name))
                .map(|p| p.version.clone());
            if found.as_deref() == Some(expected.trim()) {
                return None;
            }
            Some(PinMismatch {
                name: name.trim().to_string(),
                expected: expected.trim().to_string(),
                found,
            })
        })
        .collect()
}
