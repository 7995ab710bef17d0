use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::conda::environment::{parse_env_list, EnvironmentEntry};
use crate::error::{ProvisionError, Result};
use crate::runner::{run_checked, CommandRunner, CommandSpec};

/// Shell integration script, relative to the manager's base prefix.
const SHELL_HOOK: &str = "etc/profile.d/conda.sh";

/// The part of `conda info --json` the provisioner reads.
#[derive(Debug, Deserialize)]
struct CondaInfo {
    root_prefix: PathBuf,
    #[serde(default)]
    envs_dirs: Vec<PathBuf>,
}

/// A located environment-manager installation.
#[derive(Debug, Clone)]
pub struct CondaIntegration {
    manager: String,
    base: PathBuf,
    /// Directories holding named environments
    envs_dirs: Vec<PathBuf>,
}

impl CondaIntegration {
    /// Resolve the base prefix and named-environment directories with
    /// `<manager> info --json` and require the shell integration script to exist.
    pub fn load(runner: &dyn CommandRunner, manager: &str) -> Result<Self> {
        let cmd = CommandSpec::new(manager).args(["info", "--json"]).captured();
        let out = run_checked(runner, &cmd, |detail| {
            ProvisionError::EnvironmentOperationFailure {
                operation: "integration load",
                detail,
            }
        })?;
        let info: CondaInfo = serde_json::from_str(&out.stdout).map_err(|e| {
            ProvisionError::EnvironmentOperationFailure {
                operation: "integration load",
                detail: format!("unreadable output of `{}`: {}", cmd.display(), e),
            }
        })?;
        if info.root_prefix.as_os_str().is_empty() {
            return Err(ProvisionError::EnvironmentOperationFailure {
                operation: "integration load",
                detail: format!("`{}` reported no base prefix", cmd.display()),
            });
        }
        let integration = Self {
            manager: manager.to_string(),
            base: info.root_prefix,
            envs_dirs: info.envs_dirs,
        };
        let hook = integration.shell_hook();
        if !hook.is_file() {
            return Err(ProvisionError::EnvironmentOperationFailure {
                operation: "integration load",
                detail: format!("shell integration not found at {}", hook.display()),
            });
        }
        tracing::debug!(base = %integration.base.display(), "environment manager located");
        Ok(integration)
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn envs_dirs(&self) -> &[PathBuf] {
        &self.envs_dirs
    }

    pub fn shell_hook(&self) -> PathBuf {
        self.base.join(SHELL_HOOK)
    }

    /// A bare manager invocation.
    pub fn command(&self) -> CommandSpec {
        CommandSpec::new(self.manager.as_str())
    }

    pub fn list_environments(&self, runner: &dyn CommandRunner) -> Result<Vec<EnvironmentEntry>> {
        let cmd = self.command().args(["env", "list", "--json"]).captured();
        let out = run_checked(runner, &cmd, |detail| {
            ProvisionError::EnvironmentOperationFailure {
                operation: "listing",
                detail,
            }
        })?;
        parse_env_list(&out.stdout, &self.base, &self.envs_dirs).map_err(|e| {
            ProvisionError::EnvironmentOperationFailure {
                operation: "listing",
                detail: format!("unreadable output of `{}`: {}", cmd.display(), e),
            }
        })
    }
}
