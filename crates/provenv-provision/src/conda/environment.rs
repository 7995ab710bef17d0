use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::conda::integration::CondaIntegration;
use crate::error::{ProvisionError, Result};
use crate::runner::{run_checked, CommandRunner, CommandSpec};

/// Output of `conda env list --json`.
#[derive(Debug, Deserialize)]
struct EnvList {
    envs: Vec<PathBuf>,
}

/// A named environment known to the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentEntry {
    pub name: String,
    pub prefix: PathBuf,
}

/// Parse the manager's JSON listing into its named environments. The base
/// prefix is named `base`; a prefix directly inside one of `envs_dirs` is named
/// after its final path component. Environments created by path elsewhere have
/// no name and are left out.
pub(crate) fn parse_env_list(
    json: &str,
    base: &Path,
    envs_dirs: &[PathBuf],
) -> serde_json::Result<Vec<EnvironmentEntry>> {
    let list: EnvList = serde_json::from_str(json)?;
    Ok(list
        .envs
        .into_iter()
        .filter_map(|prefix| {
            let name = if prefix == base {
                "base".to_string()
            } else if envs_dirs.iter().any(|d| prefix.parent() == Some(d.as_path())) {
                prefix.file_name()?.to_string_lossy().into_owned()
            } else {
                tracing::debug!(prefix = %prefix.display(), "skipping environment without a name");
                return None;
            };
            Some(EnvironmentEntry { name, prefix })
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// Already present; nothing was created
    Existing(PathBuf),
    Created,
}

impl EnsureOutcome {
    pub fn created(&self) -> bool {
        matches!(self, EnsureOutcome::Created)
    }
}

/// Create `name` with the pinned runtime unless it already exists.
pub fn ensure_environment(
    integration: &CondaIntegration,
    runner: &dyn CommandRunner,
    name: &str,
    python_version: &str,
) -> Result<EnsureOutcome> {
    let envs = integration.list_environments(runner)?;
    if let Some(existing) = envs.into_iter().find(|e| e.name == name) {
        tracing::info!(env = %name, prefix = %existing.prefix.display(), "environment exists, reusing");
        return Ok(EnsureOutcome::Existing(existing.prefix));
    }

    tracing::info!(env = %name, python = %python_version, "creating environment");
    let cmd = integration
        .command()
        .args(["create", "-y", "-n", name])
        .arg(format!("python={}", python_version));
    run_checked(runner, &cmd, |detail| ProvisionError::EnvironmentOperationFailure {
        operation: "creation",
        detail,
    })?;
    Ok(EnsureOutcome::Created)
}

/// Handle to an activated environment. Commands built from it resolve the
/// environment's interpreter and installer first.
#[derive(Debug, Clone)]
pub struct Activation {
    name: String,
    prefix: PathBuf,
    python: PathBuf,
    path_var: String,
}

impl Activation {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    pub fn interpreter(&self) -> &Path {
        &self.python
    }

    /// The environment's interpreter with activation variables applied.
    pub fn python(&self) -> CommandSpec {
        CommandSpec::new(self.python.to_string_lossy())
            .env("PATH", self.path_var.as_str())
            .env("CONDA_PREFIX", self.prefix.to_string_lossy())
            .env("CONDA_DEFAULT_ENV", self.name.as_str())
    }

    /// `python -m pip <args>` inside the environment.
    pub fn pip<I, S>(&self, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.python().args(["-m", "pip"]).args(args)
    }
}

/// Directories an activation puts in front of `PATH`.
fn bin_dirs(prefix: &Path) -> Vec<PathBuf> {
    if cfg!(windows) {
        vec![
            prefix.to_path_buf(),
            prefix.join("Scripts"),
            prefix.join("Library").join("bin"),
        ]
    } else {
        vec![prefix.join("bin")]
    }
}

fn interpreter_in(prefix: &Path) -> Option<PathBuf> {
    [prefix.join("bin").join("python"), prefix.join("python.exe")]
        .into_iter()
        .find(|p| p.is_file())
}

/// Activate `name`: resolve its prefix and interpreter and build the handle.
pub fn activate(
    integration: &CondaIntegration,
    runner: &dyn CommandRunner,
    name: &str,
) -> Result<Activation> {
    let envs = integration.list_environments(runner)?;
    let entry = envs.into_iter().find(|e| e.name == name).ok_or_else(|| {
        ProvisionError::EnvironmentOperationFailure {
            operation: "activation",
            detail: format!("environment '{}' is not known to the environment manager", name),
        }
    })?;
    let python = interpreter_in(&entry.prefix).ok_or_else(|| {
        ProvisionError::EnvironmentOperationFailure {
            operation: "activation",
            detail: format!("no python interpreter under {}", entry.prefix.display()),
        }
    })?;

    let inherited = std::env::var_os("PATH").unwrap_or_default();
    let path_var = std::env::join_paths(
        bin_dirs(&entry.prefix)
            .into_iter()
            .chain(std::env::split_paths(&inherited)),
    )
    .map_err(|e| ProvisionError::EnvironmentOperationFailure {
        operation: "activation",
        detail: format!("cannot build PATH: {}", e),
    })?
    .to_string_lossy()
    .into_owned();

    tracing::info!(env = %name, python = %python.display(), "environment activated");
    Ok(Activation {
        name: name.to_string(),
        prefix: entry.prefix,
        python,
        path_var,
    })
}
