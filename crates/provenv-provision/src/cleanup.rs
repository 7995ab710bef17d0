//! Removal of stale build output before a fresh compile.

use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use glob::{glob, Pattern};

use crate::error::{ProvisionError, Result};

/// Conventional build-output directories, relative to the source dir.
const BUILD_OUTPUT_DIRS: &[&str] = &["build", "dist"];

/// Generated metadata directories, matched directly under the source dir.
const METADATA_GLOB: &str = "*.egg-info";

/// Stale artifacts currently present under `source_dir` (not recursive).
/// A directory that cannot be read is reported, never skipped.
pub fn stale_artifacts(source_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut found: Vec<PathBuf> = BUILD_OUTPUT_DIRS
        .iter()
        .map(|d| source_dir.join(d))
        .filter(|p| p.symlink_metadata().is_ok())
        .collect();

    let pattern = format!(
        "{}/{}",
        Pattern::escape(&source_dir.to_string_lossy()),
        METADATA_GLOB
    );
    let paths = glob(&pattern).map_err(|e| ProvisionError::CleanupFailure {
        path: source_dir.to_path_buf(),
        source: io::Error::new(ErrorKind::InvalidInput, e.msg),
    })?;
    for entry in paths {
        match entry {
            Ok(path) => found.push(path),
            Err(e) => {
                return Err(ProvisionError::CleanupFailure {
                    path: e.path().to_path_buf(),
                    source: e.into_error(),
                })
            }
        }
    }
    Ok(found)
}

/// Delete every stale artifact. Missing targets are not an error.
/// Returns the paths that were removed.
pub fn clean_artifacts(source_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for path in stale_artifacts(source_dir)? {
        let is_dir = path
            .symlink_metadata()
            .map(|m| m.file_type().is_dir())
            .unwrap_or(false);
        let res = if is_dir {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        match res {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "removed");
                removed.push(path);
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => return Err(ProvisionError::CleanupFailure { path, source }),
        }
    }
    Ok(removed)
}
