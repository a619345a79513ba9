// SPDX-License-Identifier: MIT
// Copyright (c) 2026 wrkd contributors

//! Recursive scan of a tools directory for `*.tool.toml` manifests.
//!
//! `*.test.tool.toml` manifests are excluded — they describe fixtures used
//! by a tool's own tests, not tools the runtime should spawn.

use crate::manifest::{ManifestError, ToolManifest};
use crate::overlay::ToolFile;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolspecError {
    #[error("failed to read directory {path}: {source}")]
    ReadDir { path: std::path::PathBuf, source: std::io::Error },
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

const MANIFEST_SUFFIX: &str = ".tool.toml";
const TEST_MANIFEST_SUFFIX: &str = ".test.tool.toml";

/// Recursively scans `dir`, returning one [`ToolFile`] per non-test
/// manifest found. Missing `dir` is treated as "no tools", not an error,
/// since both the project and global tools directories are optional.
pub fn scan_dir(dir: &Path) -> Result<Vec<ToolFile>, ToolspecError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut tools = Vec::new();
    walk(dir, &mut tools)?;
    tools.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(tools)
}

fn walk(dir: &Path, tools: &mut Vec<ToolFile>) -> Result<(), ToolspecError> {
    let entries =
        std::fs::read_dir(dir).map_err(|source| ToolspecError::ReadDir { path: dir.to_path_buf(), source })?;

    for entry in entries {
        let entry = entry.map_err(|source| ToolspecError::ReadDir { path: dir.to_path_buf(), source })?;
        let path = entry.path();
        if path.is_dir() {
            walk(&path, tools)?;
            continue;
        }
        if !is_manifest(&path) {
            continue;
        }
        let manifest = ToolManifest::load(&path)?;
        let resolved_path = manifest.resolved_entry_point(&path);
        tools.push(ToolFile { name: manifest.name, path: resolved_path, functions: manifest.functions });
    }
    Ok(())
}

fn is_manifest(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.ends_with(MANIFEST_SUFFIX) && !name.ends_with(TEST_MANIFEST_SUFFIX)
}

#[cfg(test)]
#[path = "discover_tests.rs"]
mod tests;
