//! Environment variable keys and their aliases.
//!
//! Primary keys use the `PROVENV_*` prefix.

/// Provisioning inputs
pub mod provision {
    pub const PROVENV_ENV_NAME: &str = "PROVENV_ENV_NAME";

    /// Runtime version pinned when the environment is created
    pub const PROVENV_PYTHON_VERSION: &str = "PROVENV_PYTHON_VERSION";

    /// Environment-manager binary (conda, mamba, ...)
    pub const PROVENV_ENV_MANAGER: &str = "PROVENV_ENV_MANAGER";
    pub const ENV_MANAGER_ALIASES: &[&str] = &["CONDA_EXE"];

    /// Filesystem root used when looking for the distribution marker
    pub const PROVENV_PLATFORM_ROOT: &str = "PROVENV_PLATFORM_ROOT";
}

/// Observability and logging
pub mod observability {
    pub const PROVENV_QUIET: &str = "PROVENV_QUIET";
    pub const PROVENV_LOG_LEVEL: &str = "PROVENV_LOG_LEVEL";
    pub const PROVENV_LOG_JSON: &str = "PROVENV_LOG_JSON";
    pub const PROVENV_AUDIT_LOG: &str = "PROVENV_AUDIT_LOG";
}

/// Set on the build-and-install command only, never on the process.
pub const SETUPTOOLS_USE_DISTUTILS: &str = "SETUPTOOLS_USE_DISTUTILS";
