// SPDX-License-Identifier: MIT
// Copyright (c) 2026 wrkd contributors

//! Merges a project tools directory over a global one: names are unique
//! across the merged set, and the project directory shadows the global
//! directory when both define a tool of the same name.

use indexmap::IndexMap;
use std::path::PathBuf;

/// One discovered tool: its unique name, the resolved path to its compiled
/// worker binary, and the function names its manifest exports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolFile {
    pub name: String,
    pub path: PathBuf,
    pub functions: Vec<String>,
}

/// Merges `global` under `project`: every project tool wins over a global
/// tool of the same name. Order is preserved within each input, project
/// entries first.
pub fn merge(project: Vec<ToolFile>, global: Vec<ToolFile>) -> IndexMap<String, ToolFile> {
    let mut merged: IndexMap<String, ToolFile> = IndexMap::new();
    for tool in project {
        merged.insert(tool.name.clone(), tool);
    }
    for tool in global {
        merged.entry(tool.name.clone()).or_insert(tool);
    }
    merged
}

#[cfg(test)]
#[path = "overlay_tests.rs"]
mod tests;
