// SPDX-License-Identifier: MIT
// Copyright (c) 2026 wrkd contributors

use super::*;
use serial_test::serial;

fn clear_env() {
    for var in ["OJ_RPC_CONFIG", "OJ_RPC_PORT", "OJ_RPC_TOOLS_DIR", "OJ_RPC_GLOBAL_TOOLS_DIR", "OJ_RPC_DEV"] {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn defaults_apply_when_nothing_else_is_set() {
    clear_env();
    let config = Config::load(None, ConfigOverrides::default()).expect("load");
    assert_eq!(config.port, 7337);
    assert_eq!(config.tools_dir, PathBuf::from(".lootbox/tools"));
    assert!(!config.dev);
    assert_eq!(config.max_connections, 100);
    assert_eq!(config.max_frame_bytes, 1024 * 1024);
}

#[test]
#[serial]
fn file_layer_overrides_defaults() {
    clear_env();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("oj-rpc.toml");
    std::fs::write(&path, "port = 9999\ndev = true\n").expect("write");

    let config = Config::load(Some(&path), ConfigOverrides::default()).expect("load");
    assert_eq!(config.port, 9999);
    assert!(config.dev);
    assert_eq!(config.tools_dir, PathBuf::from(".lootbox/tools"));
}

#[test]
#[serial]
fn missing_file_is_not_an_error() {
    clear_env();
    let config = Config::load(Some(Path::new("/definitely/does/not/exist.toml")), ConfigOverrides::default())
        .expect("load");
    assert_eq!(config.port, 7337);
}

#[test]
#[serial]
fn env_layer_overrides_file_layer() {
    clear_env();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("oj-rpc.toml");
    std::fs::write(&path, "port = 9999\n").expect("write");
    std::env::set_var("OJ_RPC_PORT", "4242");

    let config = Config::load(Some(&path), ConfigOverrides::default()).expect("load");
    assert_eq!(config.port, 4242);
    clear_env();
}

#[test]
#[serial]
fn cli_layer_overrides_env_layer() {
    clear_env();
    std::env::set_var("OJ_RPC_PORT", "4242");

    let cli = ConfigOverrides { port: Some(1111), ..Default::default() };
    let config = Config::load(None, cli).expect("load");
    assert_eq!(config.port, 1111);
    clear_env();
}

#[test]
#[serial]
fn each_layer_only_overrides_fields_it_sets() {
    clear_env();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("oj-rpc.toml");
    std::fs::write(&path, "port = 9999\n").expect("write");
    std::env::set_var("OJ_RPC_DEV", "true");

    let cli = ConfigOverrides { max_connections: Some(5), ..Default::default() };
    let config = Config::load(Some(&path), cli).expect("load");

    assert_eq!(config.port, 9999);
    assert!(config.dev);
    assert_eq!(config.max_connections, 5);
    assert_eq!(config.tools_dir, PathBuf::from(".lootbox/tools"));
    clear_env();
}

#[test]
#[serial]
fn invalid_env_port_is_an_error() {
    clear_env();
    std::env::set_var("OJ_RPC_PORT", "not-a-port");
    let result = Config::load(None, ConfigOverrides::default());
    assert!(matches!(result, Err(ConfigError::InvalidEnvVar { var: "OJ_RPC_PORT", .. })));
    clear_env();
}

#[test]
#[serial]
fn invalid_env_dev_flag_is_an_error() {
    clear_env();
    std::env::set_var("OJ_RPC_DEV", "maybe");
    let result = Config::load(None, ConfigOverrides::default());
    assert!(matches!(result, Err(ConfigError::InvalidEnvVar { var: "OJ_RPC_DEV", .. })));
    clear_env();
}

#[test]
fn log_format_parses_case_insensitively() {
    assert_eq!("Pretty".parse::<LogFormat>(), Ok(LogFormat::Pretty));
    assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
    assert!("bogus".parse::<LogFormat>().is_err());
}
