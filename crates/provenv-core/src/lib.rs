//! provenv core: configuration layer and logging helpers shared by the
//! provisioner crate and the CLI.

pub mod config;
pub mod log;
