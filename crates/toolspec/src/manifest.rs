// SPDX-License-Identifier: MIT
// Copyright (c) 2026 wrkd contributors

//! Parsed shape of a single `*.tool.toml` manifest.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("failed to parse manifest {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
}

/// A `*.tool.toml` manifest, naming the tool, its compiled binary entry
/// point (relative to the manifest's own directory), and the functions it
/// exports.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolManifest {
    pub name: String,
    pub entry_point: PathBuf,
    #[serde(default)]
    pub functions: Vec<String>,
}

impl ToolManifest {
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|source| ManifestError::Read { path: path.to_path_buf(), source })?;
        toml::from_str(&contents).map_err(|source| ManifestError::Parse { path: path.to_path_buf(), source })
    }

    /// Resolves `entry_point` to an absolute path, relative to the
    /// manifest's containing directory when it is itself relative.
    pub fn resolved_entry_point(&self, manifest_path: &Path) -> PathBuf {
        if self.entry_point.is_absolute() {
            return self.entry_point.clone();
        }
        manifest_path
            .parent()
            .map(|dir| dir.join(&self.entry_point))
            .unwrap_or_else(|| self.entry_point.clone())
    }
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
