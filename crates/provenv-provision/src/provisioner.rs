//! The linear provisioning procedure.
//!
//! Each step returns a `Result`; the driver stops at the first failure and
//! reports the step by name. Nothing already done is rolled back, and every
//! step is idempotent, so re-running after a failure resumes where it stopped.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use provenv_core::config::ProvisionConfig;
use provenv_core::info_log;

use crate::cleanup::clean_artifacts;
use crate::conda::{activate, ensure_environment, Activation, CondaIntegration};
use crate::error::{ProvisionError, Result, StepFailure};
use crate::pip::{self, EnvOverride, InstalledPackage, PinMismatch};
use crate::platform::PlatformTag;
use crate::runner::CommandRunner;
use crate::tools::{audit_toolchain, require_tools, ToolLocator, ToolchainStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    CheckPrerequisites,
    AuditToolchain,
    LoadIntegration,
    EnsureEnvironment,
    ActivateEnvironment,
    InstallDependencies,
    InstallBuildPins,
    CleanArtifacts,
    BuildAndInstall,
    Report,
}

impl Step {
    pub fn name(self) -> &'static str {
        match self {
            Step::CheckPrerequisites => "check-prerequisites",
            Step::AuditToolchain => "audit-toolchain",
            Step::LoadIntegration => "load-integration",
            Step::EnsureEnvironment => "ensure-environment",
            Step::ActivateEnvironment => "activate-environment",
            Step::InstallDependencies => "install-dependencies",
            Step::InstallBuildPins => "install-build-pins",
            Step::CleanArtifacts => "clean-artifacts",
            Step::BuildAndInstall => "build-and-install",
            Step::Report => "report",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Hook for step lifecycle events (audit logging).
pub trait StepObserver {
    fn started(&self, step: Step);
    fn completed(&self, step: Step, elapsed: Duration);
    fn failed(&self, step: Step, error: &ProvisionError);
}

/// What a successful run did.
#[derive(Debug, Clone)]
pub struct ProvisionReport {
    pub env_name: String,
    pub prefix: PathBuf,
    pub created: bool,
    pub toolchain: ToolchainStatus,
    pub removed_artifacts: Vec<PathBuf>,
    /// Empty when the final listing could not be obtained
    pub installed: Vec<InstalledPackage>,
    pub pin_mismatches: Vec<PinMismatch>,
}

pub struct Provisioner<'a> {
    config: &'a ProvisionConfig,
    runner: &'a dyn CommandRunner,
    locator: &'a dyn ToolLocator,
    is_root: bool,
    observer: Option<&'a dyn StepObserver>,
}

impl<'a> Provisioner<'a> {
    pub fn new(
        config: &'a ProvisionConfig,
        runner: &'a dyn CommandRunner,
        locator: &'a dyn ToolLocator,
    ) -> Self {
        Self {
            config,
            runner,
            locator,
            is_root: crate::runner::running_as_root(),
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: &'a dyn StepObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Override privilege detection (elevation is skipped when root).
    pub fn with_root(mut self, is_root: bool) -> Self {
        self.is_root = is_root;
        self
    }

    fn step<T, F>(&self, step: Step, f: F) -> std::result::Result<T, StepFailure>
    where
        F: FnOnce() -> Result<T>,
    {
        info_log!(step = %step, "starting");
        if let Some(obs) = self.observer {
            obs.started(step);
        }
        let start = Instant::now();
        match f() {
            Ok(v) => {
                let elapsed = start.elapsed();
                tracing::debug!(step = %step, elapsed_ms = elapsed.as_millis() as u64, "done");
                if let Some(obs) = self.observer {
                    obs.completed(step, elapsed);
                }
                Ok(v)
            }
            Err(source) => {
                tracing::error!(step = %step, error = %source, "step failed");
                if let Some(obs) = self.observer {
                    obs.failed(step, &source);
                }
                Err(StepFailure { step, source })
            }
        }
    }

    pub fn run(&self) -> std::result::Result<ProvisionReport, StepFailure> {
        let cfg = self.config;

        self.step(Step::CheckPrerequisites, || {
            require_tools(self.locator, &cfg.required_tools)
        })?;

        let toolchain = self.step(Step::AuditToolchain, || {
            let platform = PlatformTag::detect(&cfg.platform_root);
            audit_toolchain(self.locator, self.runner, &cfg.toolchain, platform, self.is_root)
        })?;

        let integration = self.step(Step::LoadIntegration, || {
            CondaIntegration::load(self.runner, &cfg.env_manager)
        })?;

        let ensured = self.step(Step::EnsureEnvironment, || {
            ensure_environment(&integration, self.runner, &cfg.env_name, &cfg.python_version)
        })?;

        let activation = self.step(Step::ActivateEnvironment, || {
            activate(&integration, self.runner, &cfg.env_name)
        })?;

        self.step(Step::InstallDependencies, || {
            pip::install_dependencies(self.runner, &activation, &cfg.pinned_packages)
        })?;

        self.step(Step::InstallBuildPins, || {
            pip::install_build_pins(self.runner, &activation, &cfg.build_pins)
        })?;

        let (key, value) = &cfg.build_env_override;
        let env_override = EnvOverride::new(key.as_str(), value.as_str());

        let removed_artifacts =
            self.step(Step::CleanArtifacts, || clean_artifacts(&cfg.source_dir))?;

        self.step(Step::BuildAndInstall, || {
            pip::build_and_install(self.runner, &activation, &cfg.source_dir, &env_override)
        })?;

        let installed = self.report(&activation);
        let pin_mismatches = pip::pin_mismatches(&installed, &cfg.pinned_packages);
        for m in &pin_mismatches {
            tracing::warn!(
                package = %m.name,
                expected = %m.expected,
                found = m.found.as_deref().unwrap_or("<absent>"),
                "pinned dependency not at its pinned version"
            );
        }

        Ok(ProvisionReport {
            env_name: cfg.env_name.clone(),
            prefix: activation.prefix().to_path_buf(),
            created: ensured.created(),
            toolchain,
            removed_artifacts,
            installed,
            pin_mismatches,
        })
    }

    /// The final listing; a failure here is logged and never aborts the run.
    fn report(&self, activation: &Activation) -> Vec<InstalledPackage> {
        match self.step(Step::Report, || pip::list_installed(self.runner, activation)) {
            Ok(listing) => listing,
            Err(failure) => {
                tracing::warn!(error = %failure.source, "could not list installed packages");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::CommandOutput;
    use crate::testing::{FakeConda, FakeLocator, RecordingRunner};
    use provenv_core::config::ProvisionArgs;
    use std::cell::RefCell;

    const ALL_TOOLS: &[&str] = &["conda", "python3", "gcc", "g++", "gfortran", "make"];

    struct Fixture {
        _tmp: tempfile::TempDir,
        config: ProvisionConfig,
        runner: RecordingRunner,
        conda: FakeConda,
    }

    fn fixture(existing_envs: &[&str]) -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("BayHunter");
        std::fs::create_dir_all(src.join("build/lib")).unwrap();
        std::fs::create_dir_all(src.join("BayHunter.egg-info")).unwrap();
        std::fs::write(src.join("setup.py"), "").unwrap();
        let platform_root = tmp.path().join("sysroot");
        std::fs::create_dir_all(&platform_root).unwrap();

        let args = ProvisionArgs {
            source_dir: Some(src),
            ..Default::default()
        };
        let root = platform_root.to_string_lossy().to_string();
        let config = ProvisionConfig::resolve(args, tmp.path(), |key, _| {
            (key == "PROVENV_PLATFORM_ROOT").then(|| root.clone())
        })
        .unwrap();

        let runner = RecordingRunner::new();
        let conda = FakeConda::install(&runner, tmp.path(), existing_envs);
        let listing: Vec<serde_json::Value> = config
            .pinned_packages
            .iter()
            .filter_map(|p| p.split_once("=="))
            .map(|(n, v)| serde_json::json!({ "name": n, "version": v }))
            .chain(std::iter::once(serde_json::json!({ "name": "BayHunter", "version": "2.1" })))
            .collect();
        let listing = serde_json::Value::Array(listing).to_string();
        runner.on("pip list", move |_| CommandOutput::ok(listing.clone()));

        Fixture {
            _tmp: tmp,
            config,
            runner,
            conda,
        }
    }

    #[derive(Default)]
    struct EventLog(RefCell<Vec<String>>);

    impl StepObserver for EventLog {
        fn started(&self, step: Step) {
            self.0.borrow_mut().push(format!("start {step}"));
        }
        fn completed(&self, step: Step, _: Duration) {
            self.0.borrow_mut().push(format!("ok {step}"));
        }
        fn failed(&self, step: Step, _: &ProvisionError) {
            self.0.borrow_mut().push(format!("fail {step}"));
        }
    }

    #[test]
    fn test_full_run_installs_pins_and_package() {
        let fx = fixture(&[]);
        let locator = FakeLocator::with(ALL_TOOLS);
        let report = Provisioner::new(&fx.config, &fx.runner, &locator)
            .with_root(true)
            .run()
            .unwrap();

        assert!(report.created);
        assert_eq!(report.prefix, fx.conda.prefix("bayhunter"));
        assert_eq!(report.toolchain, ToolchainStatus::Complete);
        assert_eq!(report.removed_artifacts.len(), 2);
        assert!(report.pin_mismatches.is_empty());
        assert!(report.installed.iter().any(|p| p.name == "BayHunter"));

        let lines = fx.runner.command_lines();
        let deps = lines.iter().find(|l| l.contains("numpy==")).unwrap();
        for pin in &fx.config.pinned_packages {
            assert!(deps.contains(pin.as_str()), "{pin} missing from {deps}");
        }
        let src = fx.config.source_dir.to_string_lossy();
        assert!(lines
            .iter()
            .any(|l| l.ends_with(&format!("pip install --no-build-isolation {src}"))));
        assert_eq!(fx.runner.count_containing("apt-get"), 0);
    }

    #[test]
    fn test_steps_run_in_order() {
        let fx = fixture(&["bayhunter"]);
        let locator = FakeLocator::with(ALL_TOOLS);
        let events = EventLog::default();
        Provisioner::new(&fx.config, &fx.runner, &locator)
            .with_observer(&events)
            .run()
            .unwrap();
        let started: Vec<String> = events
            .0
            .borrow()
            .iter()
            .filter_map(|e| e.strip_prefix("start ").map(String::from))
            .collect();
        assert_eq!(
            started,
            vec![
                "check-prerequisites",
                "audit-toolchain",
                "load-integration",
                "ensure-environment",
                "activate-environment",
                "install-dependencies",
                "install-build-pins",
                "clean-artifacts",
                "build-and-install",
                "report",
            ]
        );
    }

    #[test]
    fn test_two_runs_create_once() {
        let fx = fixture(&[]);
        let locator = FakeLocator::with(ALL_TOOLS);
        let p = Provisioner::new(&fx.config, &fx.runner, &locator);
        assert!(p.run().unwrap().created);
        assert!(!p.run().unwrap().created);
        assert_eq!(fx.runner.count_containing(" create "), 1);
    }

    #[test]
    fn test_missing_prerequisite_runs_nothing() {
        let fx = fixture(&[]);
        let locator = FakeLocator::with(&["python3", "gcc", "g++", "gfortran", "make"]);
        let err = Provisioner::new(&fx.config, &fx.runner, &locator).run().unwrap_err();
        assert_eq!(err.step, Step::CheckPrerequisites);
        assert!(matches!(err.source, ProvisionError::PrerequisiteMissing { ref tool } if tool == "conda"));
        assert!(fx.runner.commands().is_empty());
    }

    #[test]
    fn test_unsupported_platform_stops_before_integration() {
        let fx = fixture(&[]);
        let locator = FakeLocator::with(&["conda", "python3", "gcc", "make"]);
        let err = Provisioner::new(&fx.config, &fx.runner, &locator).run().unwrap_err();
        assert_eq!(err.step, Step::AuditToolchain);
        match err.source {
            ProvisionError::UnsupportedPlatform { missing } => {
                assert_eq!(missing, vec!["g++".to_string(), "gfortran".to_string()]);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(fx.runner.commands().is_empty());
    }

    #[test]
    fn test_dependency_failure_skips_later_steps() {
        let fx = fixture(&["bayhunter"]);
        fx.runner.on("numpy==", |_| CommandOutput::failed(1, "ResolutionImpossible"));
        let locator = FakeLocator::with(ALL_TOOLS);
        let err = Provisioner::new(&fx.config, &fx.runner, &locator).run().unwrap_err();
        assert_eq!(err.step, Step::InstallDependencies);
        assert!(matches!(err.source, ProvisionError::DependencyInstallFailure { .. }));

        assert_eq!(fx.runner.count_containing("setuptools<60"), 0);
        assert_eq!(fx.runner.count_containing("--no-build-isolation"), 0);
        assert_eq!(fx.runner.count_containing("pip list"), 0);
        // Cleanup comes later in the sequence, so the stale build dir survives.
        assert!(fx.config.source_dir.join("build").exists());
    }

    #[test]
    fn test_build_failure_is_terminal() {
        let fx = fixture(&["bayhunter"]);
        fx.runner.on("--no-build-isolation", |_| CommandOutput::failed(1, "error: command 'gfortran' failed"));
        let locator = FakeLocator::with(ALL_TOOLS);
        let err = Provisioner::new(&fx.config, &fx.runner, &locator).run().unwrap_err();
        assert_eq!(err.step, Step::BuildAndInstall);
        assert_eq!(err.to_string(), "step 'build-and-install' failed");
        assert_eq!(fx.runner.count_containing("pip list"), 0);
        assert!(!fx.config.source_dir.join("build").exists());
    }

    #[test]
    fn test_report_failure_does_not_abort() {
        let fx = fixture(&["bayhunter"]);
        fx.runner.on("pip list", |_| CommandOutput::failed(1, "boom"));
        let locator = FakeLocator::with(ALL_TOOLS);
        let report = Provisioner::new(&fx.config, &fx.runner, &locator).run().unwrap();
        assert!(report.installed.is_empty());
        assert_eq!(report.pin_mismatches.len(), fx.config.pinned_packages.len());
    }
}
