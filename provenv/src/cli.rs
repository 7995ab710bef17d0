use std::path::PathBuf;

use clap::Parser;

/// provenv - provision a pinned conda environment and compile a
/// native-extension package into it
#[derive(Parser, Debug)]
#[command(name = "provenv")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Environment name (default: $PROVENV_ENV_NAME or "bayhunter")
    #[arg(value_name = "ENV_NAME")]
    pub env_name: Option<String>,

    /// Package source directory (default: current directory)
    #[arg(value_name = "SOURCE_DIR")]
    pub source_dir: Option<PathBuf>,

    /// Python version pinned when the environment is created (default: 3.10)
    #[arg(long = "python", value_name = "VERSION")]
    pub python_version: Option<String>,

    /// Environment-manager executable, e.g. conda or mamba
    #[arg(long, value_name = "BIN")]
    pub env_manager: Option<String>,
}
