//! Observability: tracing init and the JSONL step audit log.
//!
//! Uses config::ObservabilityConfig for PROVENV_QUIET, LOG_LEVEL, LOG_JSON, AUDIT_LOG.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use provenv_core::config::ObservabilityConfig;
use provenv_provision::{ProvisionError, Step, StepObserver};
use serde_json::json;
use tracing_subscriber::{prelude::*, EnvFilter};

/// Initialize tracing. Call at process startup.
/// When PROVENV_QUIET=1 only WARN and above are logged. Logs go to stderr;
/// stdout carries the final package listing.
pub fn init_tracing() {
    let cfg = ObservabilityConfig::from_env();
    let level: String = if cfg.quiet {
        "provenv=warn,provenv_provision=warn".to_string()
    } else {
        cfg.log_level.clone()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let _ = if cfg.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .try_init()
    };
}

/// Appends one JSON line per step event to the configured audit file.
pub struct AuditLog {
    path: PathBuf,
    env_name: String,
}

impl AuditLog {
    /// `None` when PROVENV_AUDIT_LOG is unset.
    pub fn from_env(env_name: &str) -> Option<Self> {
        let path = ObservabilityConfig::from_env().audit_log.clone()?;
        Some(Self::new(PathBuf::from(path), env_name))
    }

    pub fn new(path: PathBuf, env_name: &str) -> Self {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        Self {
            path,
            env_name: env_name.to_string(),
        }
    }

    fn append(&self, record: serde_json::Value) {
        append_jsonl(&self.path, &record);
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn append_jsonl(path: &Path, record: &serde_json::Value) {
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(mut f) => {
            if let Ok(line) = serde_json::to_string(record) {
                let _ = writeln!(f, "{}", line);
            }
        }
        Err(e) => tracing::debug!(path = %path.display(), error = %e, "audit log unavailable"),
    }
}

impl StepObserver for AuditLog {
    fn started(&self, step: Step) {
        self.append(json!({
            "ts": now(),
            "event": "step_started",
            "env": self.env_name,
            "step": step.name(),
        }));
    }

    fn completed(&self, step: Step, elapsed: Duration) {
        self.append(json!({
            "ts": now(),
            "event": "step_completed",
            "env": self.env_name,
            "step": step.name(),
            "duration_ms": elapsed.as_millis() as u64,
        }));
    }

    fn failed(&self, step: Step, error: &ProvisionError) {
        self.append(json!({
            "ts": now(),
            "event": "step_failed",
            "env": self.env_name,
            "step": step.name(),
            "error": error.to_string(),
        }));
    }
}
