//! Filesystem helpers shared by the conversion pipeline and the CLI.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{ChemError, Result};

/// Resets `path` to an empty directory, deleting it first if it exists.
/// Missing parent directories are created.
pub fn prepare_output_directory(path: &Path) -> Result<()> {
    if path.exists() {
        debug!(path = %path.display(), "removing existing output directory");
        fs::remove_dir_all(path).map_err(|e| ChemError::io(path, e))?;
    }
    fs::create_dir_all(path).map_err(|e| ChemError::io(path, e))?;
    Ok(())
}

/// Reads a structure file into a string that can be embedded as a JSON
/// string value.
pub fn read_text_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| ChemError::io(path, e))
}
