//! Structured configuration, loaded from CLI arguments, the environment and `.env`.

use super::env_keys::{observability as obv_keys, provision as prov_keys, SETUPTOOLS_USE_DISTUTILS};
use super::loader::{env_bool, env_optional, env_or};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_ENV_NAME: &str = "bayhunter";
pub const DEFAULT_PYTHON_VERSION: &str = "3.10";
pub const DEFAULT_ENV_MANAGER: &str = "conda";
pub const DEFAULT_LOG_LEVEL: &str = "provenv=info,provenv_provision=info";

/// Interpreter that must be on PATH before anything else runs.
pub const LANGUAGE_RUNTIME: &str = "python3";

/// Compilers and build tools the native extensions need (C, C++ and Fortran).
pub const TOOLCHAIN: &[&str] = &["gcc", "g++", "gfortran", "make"];

/// Exact-version runtime dependencies of the target package.
pub const PINNED_PACKAGES: &[&str] = &[
    "numpy==1.26.4",
    "matplotlib==3.8.4",
    "configobj==5.0.8",
    "pyzmq==25.1.2",
    "pandas==2.2.2",
    "cartopy==0.23.0",
];

/// Upper-bounded build-support libraries for the legacy setup.py build path.
pub const BUILD_PINS: &[&str] = &["setuptools<60", "cython<3"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot determine current directory: {0}")]
    CurrentDir(#[source] std::io::Error),

    #[error("source directory '{}' does not exist or is not a directory", .0.display())]
    SourceDirNotFound(PathBuf),

    #[error("environment name must not be empty")]
    EmptyEnvName,
}

/// Everything the provisioner needs for one run.
#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    pub env_name: String,
    pub source_dir: PathBuf,
    pub python_version: String,
    /// Environment-manager executable
    pub env_manager: String,
    /// Tools that must exist before any step runs; absence is fatal
    pub required_tools: Vec<String>,
    /// Compiler tools audited (and possibly installed)
    pub toolchain: Vec<String>,
    pub pinned_packages: Vec<String>,
    pub build_pins: Vec<String>,
    /// Applied to the build-and-install invocation only
    pub build_env_override: (String, String),
    /// Root under which the distribution marker is looked up
    pub platform_root: PathBuf,
}

/// Explicit overrides coming from the command line.
#[derive(Debug, Clone, Default)]
pub struct ProvisionArgs {
    pub env_name: Option<String>,
    pub source_dir: Option<PathBuf>,
    pub python_version: Option<String>,
    pub env_manager: Option<String>,
}

impl ProvisionConfig {
    /// Resolve against the process environment / `.env` and the current directory.
    pub fn from_env(args: ProvisionArgs) -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir().map_err(ConfigError::CurrentDir)?;
        Self::resolve(args, &cwd, |key, aliases| env_optional(key, aliases))
    }

    /// Resolve with an explicit lookup. Precedence: args, then `lookup`, then defaults.
    pub fn resolve<F>(args: ProvisionArgs, cwd: &Path, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str, &[&str]) -> Option<String>,
    {
        let env_name = args
            .env_name
            .or_else(|| lookup(prov_keys::PROVENV_ENV_NAME, &[]))
            .unwrap_or_else(|| DEFAULT_ENV_NAME.to_string());
        if env_name.trim().is_empty() {
            return Err(ConfigError::EmptyEnvName);
        }

        let source_dir = match args.source_dir {
            Some(p) if p.is_absolute() => p,
            Some(p) => cwd.join(p),
            None => cwd.to_path_buf(),
        };
        if !source_dir.is_dir() {
            return Err(ConfigError::SourceDirNotFound(source_dir));
        }

        let python_version = args
            .python_version
            .or_else(|| lookup(prov_keys::PROVENV_PYTHON_VERSION, &[]))
            .unwrap_or_else(|| DEFAULT_PYTHON_VERSION.to_string());
        let env_manager = args
            .env_manager
            .or_else(|| lookup(prov_keys::PROVENV_ENV_MANAGER, prov_keys::ENV_MANAGER_ALIASES))
            .unwrap_or_else(|| DEFAULT_ENV_MANAGER.to_string());
        let platform_root = lookup(prov_keys::PROVENV_PLATFORM_ROOT, &[])
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/"));

        Ok(Self {
            required_tools: vec![env_manager.clone(), LANGUAGE_RUNTIME.to_string()],
            env_name,
            source_dir,
            python_version,
            env_manager,
            toolchain: TOOLCHAIN.iter().map(|s| s.to_string()).collect(),
            pinned_packages: PINNED_PACKAGES.iter().map(|s| s.to_string()).collect(),
            build_pins: BUILD_PINS.iter().map(|s| s.to_string()).collect(),
            build_env_override: (SETUPTOOLS_USE_DISTUTILS.to_string(), "stdlib".to_string()),
            platform_root,
        })
    }
}

/// Observability settings: quiet, log_level, log_json, audit_log
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub quiet: bool,
    pub log_level: String,
    pub log_json: bool,
    pub audit_log: Option<String>,
}

impl ObservabilityConfig {
    pub fn from_env() -> &'static Self {
        use std::sync::OnceLock;
        static CACHE: OnceLock<ObservabilityConfig> = OnceLock::new();
        CACHE.get_or_init(|| Self {
            quiet: env_bool(obv_keys::PROVENV_QUIET, &[], false),
            log_level: env_or(obv_keys::PROVENV_LOG_LEVEL, &[], || DEFAULT_LOG_LEVEL.to_string()),
            log_json: env_bool(obv_keys::PROVENV_LOG_JSON, &[], false),
            audit_log: env_optional(obv_keys::PROVENV_AUDIT_LOG, &[]),
        })
    }
}
