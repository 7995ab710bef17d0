//! Failure taxonomy for provisioning steps.

use std::path::PathBuf;
use thiserror::Error;

use crate::provisioner::Step;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("required tool '{tool}' not found on PATH")]
    PrerequisiteMissing { tool: String },

    #[error("missing build tools: {}; automatic installation is only supported on Debian-family systems", .missing.join(" "))]
    UnsupportedPlatform { missing: Vec<String> },

    #[error("toolchain installation failed: {detail}")]
    RemediationFailure { detail: String },

    #[error("environment {operation} failed: {detail}")]
    EnvironmentOperationFailure { operation: &'static str, detail: String },

    #[error("dependency installation failed: {detail}")]
    DependencyInstallFailure { detail: String },

    #[error("package build failed: {detail}")]
    BuildFailure { detail: String },

    #[error("cannot remove '{}': {source}", .path.display())]
    CleanupFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A step's failure, tagged with the step that stopped the run.
#[derive(Debug, Error)]
#[error("step '{step}' failed")]
pub struct StepFailure {
    pub step: Step,
    #[source]
    pub source: ProvisionError,
}

pub type Result<T> = std::result::Result<T, ProvisionError>;
