//! Provision an isolated conda environment and build a native-extension
//! package into it.
//!
//! The crate is a thin orchestration layer over external tools. The process
//! boundary is [`runner::CommandRunner`] and tool lookup is
//! [`tools::ToolLocator`]; [`provisioner::Provisioner`] sequences the steps.

pub mod cleanup;
pub mod conda;
pub mod error;
pub mod pip;
pub mod platform;
pub mod provisioner;
pub mod runner;
pub mod tools;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{ProvisionError, StepFailure};
pub use provisioner::{ProvisionReport, Provisioner, Step, StepObserver};
pub use runner::{CommandRunner, SystemRunner};
pub use tools::{PathLocator, ToolLocator};
