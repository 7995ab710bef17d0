//! Environment-manager integration: base discovery, environment listing,
//! idempotent creation and activation.
//!
//! Activation does not source the manager's shell hook. It produces an
//! [`Activation`] handle whose commands carry the environment's `PATH` and
//! `CONDA_*` variables, so only commands built from the handle run inside the
//! environment.

pub mod environment;
pub mod integration;

pub use environment::{activate, ensure_environment, Activation, EnsureOutcome, EnvironmentEntry};
pub use integration::CondaIntegration;
