// SPDX-License-Identifier: MIT
// Copyright (c) 2026 wrkd contributors

use super::*;

#[test]
fn bare_invocation_produces_no_overrides() {
    let cli = Cli::parse_from(["wrkd"]);
    let (config_path, overrides) = cli.into_overrides();

    assert_eq!(config_path, None);
    assert_eq!(overrides.port, None);
    assert_eq!(overrides.tools_dir, None);
    assert_eq!(overrides.global_tools_dir, None);
    assert_eq!(overrides.dev, None);
}

#[test]
fn flags_translate_into_matching_overrides() {
    let cli = Cli::parse_from([
        "wrkd",
        "--config",
        "/etc/wrkd.toml",
        "--port",
        "9090",
        "--tools-dir",
        "/proj/tools",
        "--global-tools-dir",
        "/etc/wrkd/tools",
        "--dev",
    ]);
    let (config_path, overrides) = cli.into_overrides();

    assert_eq!(config_path, Some(PathBuf::from("/etc/wrkd.toml")));
    assert_eq!(overrides.port, Some(9090));
    assert_eq!(overrides.tools_dir, Some(PathBuf::from("/proj/tools")));
    assert_eq!(overrides.global_tools_dir, Some(PathBuf::from("/etc/wrkd/tools")));
    assert_eq!(overrides.dev, Some(true));
}

#[test]
fn dev_flag_absent_leaves_dev_override_unset_rather_than_false() {
    let cli = Cli::parse_from(["wrkd", "--port", "1234"]);
    let (_, overrides) = cli.into_overrides();

    assert_eq!(overrides.dev, None);
}
