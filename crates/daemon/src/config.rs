// SPDX-License-Identifier: MIT
// Copyright (c) 2026 wrkd contributors

//! Configuration loading. Four layers, lowest to highest priority: built-in
//! defaults → optional TOML file → environment variables → CLI flags. Each
//! layer only overrides the fields it actually sets.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("failed to parse config file {path}: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("invalid value for {var}: {value:?}")]
    InvalidEnvVar { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(()),
        }
    }
}

/// Fully resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub tools_dir: PathBuf,
    pub global_tools_dir: PathBuf,
    pub dev: bool,
    pub log_format: LogFormat,
    pub max_connections: usize,
    pub max_frame_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 7337,
            tools_dir: PathBuf::from(".lootbox/tools"),
            global_tools_dir: dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".lootbox/tools"),
            dev: false,
            log_format: LogFormat::Pretty,
            max_connections: 100,
            max_frame_bytes: 1024 * 1024,
        }
    }
}

/// One layer's worth of overrides; every field is optional so a layer that
/// doesn't set a value never clobbers a lower layer's value.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigOverrides {
    pub port: Option<u16>,
    pub tools_dir: Option<PathBuf>,
    pub global_tools_dir: Option<PathBuf>,
    pub dev: Option<bool>,
    pub log_format: Option<LogFormat>,
    pub max_connections: Option<usize>,
    pub max_frame_bytes: Option<usize>,
}

impl Config {
    fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(v) = overrides.port {
            self.port = v;
        }
        if let Some(v) = overrides.tools_dir {
            self.tools_dir = v;
        }
        if let Some(v) = overrides.global_tools_dir {
            self.global_tools_dir = v;
        }
        if let Some(v) = overrides.dev {
            self.dev = v;
        }
        if let Some(v) = overrides.log_format {
            self.log_format = v;
        }
        if let Some(v) = overrides.max_connections {
            self.max_connections = v;
        }
        if let Some(v) = overrides.max_frame_bytes {
            self.max_frame_bytes = v;
        }
    }

    /// Composes the four layers described in `§3 Config` of the runtime
    /// design: defaults, an optional file, environment variables, then the
    /// CLI flags the caller has already parsed into `cli`.
    pub fn load(cli_config_path: Option<&Path>, cli: ConfigOverrides) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(file_overrides) = load_file_layer(cli_config_path)? {
            config.apply(file_overrides);
        }
        config.apply(load_env_layer()?);
        config.apply(cli);

        Ok(config)
    }
}

fn default_config_path() -> PathBuf {
    std::env::var_os("OJ_RPC_CONFIG").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("./oj-rpc.toml"))
}

fn load_file_layer(cli_config_path: Option<&Path>) -> Result<Option<ConfigOverrides>, ConfigError> {
    let path = cli_config_path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }
    let contents =
        std::fs::read_to_string(&path).map_err(|source| ConfigError::ReadFile { path: path.clone(), source })?;
    let overrides: ConfigOverrides =
        toml::from_str(&contents).map_err(|source| ConfigError::ParseFile { path, source })?;
    Ok(Some(overrides))
}

fn load_env_layer() -> Result<ConfigOverrides, ConfigError> {
    let mut overrides = ConfigOverrides::default();

    if let Some(value) = env_var("OJ_RPC_PORT") {
        overrides.port =
            Some(value.parse().map_err(|_| ConfigError::InvalidEnvVar { var: "OJ_RPC_PORT", value })?);
    }
    if let Some(value) = env_var("OJ_RPC_TOOLS_DIR") {
        overrides.tools_dir = Some(PathBuf::from(value));
    }
    if let Some(value) = env_var("OJ_RPC_GLOBAL_TOOLS_DIR") {
        overrides.global_tools_dir = Some(PathBuf::from(value));
    }
    if let Some(value) = env_var("OJ_RPC_DEV") {
        overrides.dev =
            Some(parse_bool(&value).ok_or_else(|| ConfigError::InvalidEnvVar { var: "OJ_RPC_DEV", value })?);
    }

    Ok(overrides)
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
