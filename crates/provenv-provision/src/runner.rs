//! External command seam.
//!
//! Every tool the provisioner drives (environment manager, installer, system
//! package manager) goes through [`CommandRunner`], so steps can be exercised
//! against a recording fake.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{ProvisionError, Result};

/// Number of trailing stderr lines kept in error messages.
const STDERR_TAIL_LINES: usize = 20;

/// One external invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Extra variables for this invocation only
    pub env: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
    /// Capture stdout/stderr instead of streaming them to the terminal
    pub capture: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            cwd: None,
            capture: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }

    pub fn captured(mut self) -> Self {
        self.capture = true;
        self
    }

    /// Run through `sudo` unless the process already has root privileges.
    pub fn elevated(self, is_root: bool) -> Self {
        if is_root {
            return self;
        }
        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push(self.program);
        args.extend(self.args);
        Self {
            program: "sudo".to_string(),
            args,
            ..self
        }
    }

    /// The command line as an operator would type it.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Outcome of a finished command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    /// Empty unless the command was captured
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Human-readable reason for a failed command: stderr tail or exit status.
    pub fn failure_detail(&self, cmd: &CommandSpec) -> String {
        let stderr = self.stderr.trim();
        let status = match self.code {
            Some(code) => format!("`{}` exited with status {}", cmd.display(), code),
            None => format!("`{}` was terminated by a signal", cmd.display()),
        };
        if stderr.is_empty() {
            return status;
        }
        let lines: Vec<&str> = stderr.lines().collect();
        let tail = &lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..];
        format!("{}: {}", status, tail.join("\n"))
    }
}

pub trait CommandRunner {
    /// Run to completion. `Err` only when the process could not be started.
    fn run(&self, cmd: &CommandSpec) -> std::io::Result<CommandOutput>;
}

/// Runs commands as child processes of this one; no timeout is applied.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> std::io::Result<CommandOutput> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }
        if let Some(ref cwd) = spec.cwd {
            cmd.current_dir(cwd);
        }
        tracing::debug!(command = %spec.display(), "spawning");

        if spec.capture {
            let out = cmd.stdin(Stdio::null()).output()?;
            Ok(CommandOutput {
                success: out.status.success(),
                code: out.status.code(),
                stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
            })
        } else {
            let status = cmd.status()?;
            Ok(CommandOutput {
                success: status.success(),
                code: status.code(),
                ..Default::default()
            })
        }
    }
}

/// Run `cmd`; a non-zero exit or a failure to start it becomes the error built
/// by `on_failure`, so each step keeps its own failure kind.
pub fn run_checked<F>(runner: &dyn CommandRunner, cmd: &CommandSpec, on_failure: F) -> Result<CommandOutput>
where
    F: FnOnce(String) -> ProvisionError,
{
    let out = match runner.run(cmd) {
        Ok(out) => out,
        Err(e) => return Err(on_failure(format!("cannot start '{}': {}", cmd.program, e))),
    };
    if !out.success {
        return Err(on_failure(out.failure_detail(cmd)));
    }
    Ok(out)
}

/// Whether this process runs with root privileges.
pub fn running_as_root() -> bool {
    #[cfg(unix)]
    {
        nix::unistd::geteuid().is_root()
    }
    #[cfg(not(unix))]
    {
        false
    }
}
