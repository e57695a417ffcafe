//! Where SafeFrame keeps `safeframe.json` and `safeframe.log`.
//!
//! Both files live in one directory, picked in this order: `--config-dir`,
//! `SAFEFRAME_CONFIG_DIR`, the working directory if it already holds one of
//! them, then `<platform config or data root>/safeframe`.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub const APP_DIR: &str = "safeframe";
pub const SETTINGS_FILE: &str = "safeframe.json";
/// Default target of `--log` without a path
pub const LOG_FILE: &str = "safeframe.log";

const CONFIG_DIR_ENV: &str = "SAFEFRAME_CONFIG_DIR";

/// Directory override from the command line or the environment
#[derive(Debug, Clone)]
pub struct PathConfig {
    pub config_dir: Option<PathBuf>,
}

impl PathConfig {
    /// `--config-dir` wins over `SAFEFRAME_CONFIG_DIR`.
    pub fn from_env_and_cli(cli_dir: Option<PathBuf>) -> Self {
        let config_dir = cli_dir.or_else(|| std::env::var_os(CONFIG_DIR_ENV).map(PathBuf::from));
        Self { config_dir }
    }
}

/// Settings file path (platform config root by default)
pub fn config_file(name: &str, config: &PathConfig) -> PathBuf {
    get_config_dir(config).join(name)
}

/// Log file path (platform data root by default)
pub fn data_file(name: &str, config: &PathConfig) -> PathBuf {
    get_data_dir(config).join(name)
}

/// Create the settings and log directories if missing.
pub fn ensure_dirs(config: &PathConfig) -> Result<()> {
    let config_dir = get_config_dir(config);
    let data_dir = get_data_dir(config);
    for dir in [&config_dir, &data_dir] {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    }
    Ok(())
}

/// Working directory already used as a portable config dir
fn has_local_config_files(dir: &Path) -> bool {
    [SETTINGS_FILE, LOG_FILE].iter().any(|f| dir.join(f).exists())
}

fn get_config_dir(config: &PathConfig) -> PathBuf {
    resolve_dir(config, dirs_next::config_dir)
}

fn get_data_dir(config: &PathConfig) -> PathBuf {
    resolve_dir(config, dirs_next::data_dir)
}

/// CLI/ENV override, then a local folder holding our files, then the
/// platform root, then "."
fn resolve_dir(config: &PathConfig, platform_root: fn() -> Option<PathBuf>) -> PathBuf {
    if let Some(dir) = &config.config_dir {
        return dir.clone();
    }

    if let Ok(current_dir) = std::env::current_dir()
        && has_local_config_files(&current_dir)
    {
        return current_dir;
    }

    platform_root()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
}
