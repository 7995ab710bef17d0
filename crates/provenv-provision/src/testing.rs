//! Fakes for the process seams, shared by unit tests.

use std::cell::RefCell;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::runner::{CommandOutput, CommandRunner, CommandSpec};
use crate::tools::ToolLocator;

type Handler = Box<dyn Fn(&CommandSpec) -> CommandOutput>;

/// Records every command and answers from handlers keyed by a substring of
/// the command line. Later handlers win; unmatched commands succeed silently.
#[derive(Clone, Default)]
pub struct RecordingRunner {
    log: Rc<RefCell<Vec<CommandSpec>>>,
    handlers: Rc<RefCell<Vec<(String, Rc<Handler>)>>>,
    uninstalled: Rc<RefCell<HashSet<String>>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&self, needle: &str, handler: F)
    where
        F: Fn(&CommandSpec) -> CommandOutput + 'static,
    {
        self.handlers
            .borrow_mut()
            .push((needle.to_string(), Rc::new(Box::new(handler))));
    }

    /// Make every invocation of `program` fail to start, as if it were not installed.
    pub fn without_program(&self, program: &str) {
        self.uninstalled.borrow_mut().insert(program.to_string());
    }

    pub fn commands(&self) -> Vec<CommandSpec> {
        self.log.borrow().clone()
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.log.borrow().iter().map(CommandSpec::display).collect()
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.command_lines().iter().filter(|l| l.contains(needle)).count()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, cmd: &CommandSpec) -> std::io::Result<CommandOutput> {
        self.log.borrow_mut().push(cmd.clone());
        if self.uninstalled.borrow().contains(&cmd.program) {
            return Err(std::io::Error::from(std::io::ErrorKind::NotFound));
        }
        let line = cmd.display();
        // Clone the handler out so it may register or inspect state itself.
        let handler = self
            .handlers
            .borrow()
            .iter()
            .rev()
            .find(|(needle, _)| line.contains(needle.as_str()))
            .map(|(_, h)| Rc::clone(h));
        Ok(match handler {
            Some(h) => h(cmd),
            None => CommandOutput::ok(""),
        })
    }
}

/// A `PATH` with a fixed, mutable set of tools.
#[derive(Clone, Default)]
pub struct FakeLocator {
    present: Rc<RefCell<HashSet<String>>>,
}

impl FakeLocator {
    pub fn with(tools: &[&str]) -> Self {
        let locator = Self::default();
        locator.add(tools);
        locator
    }

    pub fn add(&self, tools: &[&str]) {
        self.present
            .borrow_mut()
            .extend(tools.iter().map(|t| t.to_string()));
    }
}

impl ToolLocator for FakeLocator {
    fn locate(&self, name: &str) -> Option<PathBuf> {
        self.present
            .borrow()
            .contains(name)
            .then(|| PathBuf::from("/usr/bin").join(name))
    }
}

/// A conda installation laid out under a temp dir: answers `info --json`,
/// `env list --json` and `create`, creating environment prefixes on disk.
#[derive(Clone)]
pub struct FakeConda {
    base: PathBuf,
    envs: Rc<RefCell<Vec<String>>>,
    /// Environments created with `-p`, listed but unnamed
    path_envs: Rc<RefCell<Vec<PathBuf>>>,
}

impl FakeConda {
    pub fn install(runner: &RecordingRunner, root: &Path, existing: &[&str]) -> Self {
        let base = root.join("miniconda3");
        std::fs::create_dir_all(base.join("etc/profile.d")).unwrap();
        std::fs::write(base.join("etc/profile.d/conda.sh"), "# conda hook\n").unwrap();

        let conda = Self {
            base,
            envs: Rc::new(RefCell::new(Vec::new())),
            path_envs: Rc::new(RefCell::new(Vec::new())),
        };
        for name in existing {
            conda.create_env(name);
        }

        let c = conda.clone();
        runner.on("info --json", move |_| {
            CommandOutput::ok(
                serde_json::json!({
                    "root_prefix": c.base,
                    "envs_dirs": [c.base.join("envs")],
                })
                .to_string(),
            )
        });
        let c = conda.clone();
        runner.on("env list --json", move |_| {
            let mut envs = vec![c.base.clone()];
            envs.extend(c.envs.borrow().iter().map(|n| c.prefix(n)));
            envs.extend(c.path_envs.borrow().iter().cloned());
            CommandOutput::ok(serde_json::json!({ "envs": envs }).to_string())
        });
        let c = conda.clone();
        runner.on(" create ", move |cmd| {
            if let Some(pos) = cmd.args.iter().position(|a| a == "-n") {
                c.create_env(&cmd.args[pos + 1]);
            }
            CommandOutput::ok("")
        });
        conda
    }

    pub fn prefix(&self, name: &str) -> PathBuf {
        self.base.join("envs").join(name)
    }

    /// Register an environment that lives at `prefix` outside the envs dir.
    pub fn add_path_env(&self, prefix: &Path) {
        std::fs::create_dir_all(prefix.join("bin")).unwrap();
        std::fs::write(prefix.join("bin").join("python"), "").unwrap();
        self.path_envs.borrow_mut().push(prefix.to_path_buf());
    }

    fn create_env(&self, name: &str) {
        let bin = self.prefix(name).join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::write(bin.join("python"), "").unwrap();
        self.envs.borrow_mut().push(name.to_string());
    }
}
