//! `provenv [ENV_NAME] [SOURCE_DIR]`: run the provisioning procedure and print
//! the installed-package listing.

use anyhow::{Context, Result};
use provenv_core::config::{ProvisionArgs, ProvisionConfig};
use provenv_provision::pip::InstalledPackage;
use provenv_provision::tools::ToolchainStatus;
use provenv_provision::{PathLocator, ProvisionReport, Provisioner, StepObserver, SystemRunner};

use crate::cli::Cli;
use crate::observability::AuditLog;

pub fn cmd_provision(cli: Cli) -> Result<()> {
    let args = ProvisionArgs {
        env_name: cli.env_name,
        source_dir: cli.source_dir,
        python_version: cli.python_version,
        env_manager: cli.env_manager,
    };
    let config = ProvisionConfig::from_env(args).context("invalid arguments")?;
    tracing::info!(
        env = %config.env_name,
        source = %config.source_dir.display(),
        python = %config.python_version,
        "provisioning"
    );

    let audit = AuditLog::from_env(&config.env_name);
    let mut provisioner = Provisioner::new(&config, &SystemRunner, &PathLocator);
    if let Some(ref audit) = audit {
        provisioner = provisioner.with_observer(audit as &dyn StepObserver);
    }

    let report = provisioner.run()?;

    println!("{}", render_listing(&report.installed));
    eprintln!("{}", render_summary(&report));
    Ok(())
}

fn render_listing(installed: &[InstalledPackage]) -> String {
    if installed.is_empty() {
        return "(installed-package listing unavailable)".to_string();
    }
    let width = installed
        .iter()
        .map(|p| p.name.len())
        .max()
        .unwrap_or(0)
        .max("Package".len());
    let mut out = format!("{:<width$} Version\n", "Package");
    out.push_str(&format!("{} -------\n", "-".repeat(width)));
    for p in installed {
        out.push_str(&format!("{:<width$} {}\n", p.name, p.version));
    }
    out.trim_end().to_string()
}

fn render_summary(report: &ProvisionReport) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "✓ Environment '{}' {} at {}",
        report.env_name,
        if report.created { "created" } else { "reused" },
        report.prefix.display()
    ));
    if let ToolchainStatus::Remediated(ref tools) = report.toolchain {
        lines.push(format!("  installed build tools: {}", tools.join(" ")));
    }
    if !report.removed_artifacts.is_empty() {
        lines.push(format!(
            "  removed {} stale build artifact(s)",
            report.removed_artifacts.len()
        ));
    }
    for m in &report.pin_mismatches {
        lines.push(format!(
            "⚠ {} expected {} but found {}",
            m.name,
            m.expected,
            m.found.as_deref().unwrap_or("nothing")
        ));
    }
    lines.join("\n")
}
