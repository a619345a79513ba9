// SPDX-License-Identifier: MIT
// Copyright (c) 2026 wrkd contributors

use super::*;

#[test]
fn loads_a_minimal_manifest() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("echo.tool.toml");
    std::fs::write(&path, "name = \"echo\"\nentry_point = \"echo-bin\"\nfunctions = [\"run\"]\n")
        .expect("write");

    let manifest = ToolManifest::load(&path).expect("load");
    assert_eq!(manifest.name, "echo");
    assert_eq!(manifest.entry_point, PathBuf::from("echo-bin"));
    assert_eq!(manifest.functions, vec!["run".to_string()]);
}

#[test]
fn functions_defaults_to_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("bare.tool.toml");
    std::fs::write(&path, "name = \"bare\"\nentry_point = \"bare-bin\"\n").expect("write");

    let manifest = ToolManifest::load(&path).expect("load");
    assert!(manifest.functions.is_empty());
}

#[test]
fn missing_file_is_a_read_error() {
    let result = ToolManifest::load(Path::new("/nonexistent/missing.tool.toml"));
    assert!(matches!(result, Err(ManifestError::Read { .. })));
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("broken.tool.toml");
    std::fs::write(&path, "not valid = = toml").expect("write");

    let result = ToolManifest::load(&path);
    assert!(matches!(result, Err(ManifestError::Parse { .. })));
}

#[test]
fn resolved_entry_point_joins_relative_path_to_manifest_dir() {
    let manifest = ToolManifest { name: "echo".into(), entry_point: PathBuf::from("bin/echo"), functions: vec![] };
    let manifest_path = Path::new("/tools/echo/echo.tool.toml");
    assert_eq!(manifest.resolved_entry_point(manifest_path), PathBuf::from("/tools/echo/bin/echo"));
}

#[test]
fn resolved_entry_point_leaves_absolute_path_untouched() {
    let manifest =
        ToolManifest { name: "echo".into(), entry_point: PathBuf::from("/opt/tools/echo"), functions: vec![] };
    let manifest_path = Path::new("/tools/echo/echo.tool.toml");
    assert_eq!(manifest.resolved_entry_point(manifest_path), PathBuf::from("/opt/tools/echo"));
}
