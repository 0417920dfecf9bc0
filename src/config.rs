//! `msrun.toml` settings.
//!
//! Looked up in the current directory first, then in the user config
//! directory (`~/.config/msrun/config.toml` on Linux). Every key is optional.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = "msrun.toml";

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Directory for `build.log`/`mstest.log` and the tools' working
    /// directory. Defaults to the nearest ancestor holding a `.sln`.
    pub solution_dir: Option<PathBuf>,
    /// 0 disables the timeout.
    pub timeout_secs: u64,
    pub build: BuildToolConfig,
    pub test: TestToolConfig,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct BuildToolConfig {
    pub tool: String,
    /// Placed before the tool's own arguments, e.g. the `MSBuild.exe` path when `tool` is `mono`.
    pub launcher_args: Vec<String>,
    pub extra_args: Vec<String>,
    pub configuration: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct TestToolConfig {
    pub tool: String,
    pub launcher_args: Vec<String>,
    pub extra_args: Vec<String>,
}

impl Default for BuildToolConfig {
    fn default() -> Self {
        Self {
            tool: "msbuild".to_string(),
            launcher_args: Vec::new(),
            extra_args: Vec::new(),
            configuration: "Debug".to_string(),
        }
    }
}

impl Default for TestToolConfig {
    fn default() -> Self {
        Self {
            tool: "mstest".to_string(),
            launcher_args: Vec::new(),
            extra_args: Vec::new(),
        }
    }
}

impl Settings {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .context("Failed to parse msrun settings - check for unknown keys or syntax errors")
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid settings in {}", path.display()))
    }
}

/// Candidate settings files, most specific first.
pub fn config_paths(current_dir: &Path) -> Vec<PathBuf> {
    let mut paths = vec![current_dir.join(CONFIG_FILE)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("msrun").join("config.toml"));
    }
    paths
}

/// Load the first settings file that exists, or defaults if none does.
pub fn load_settings() -> Result<Settings> {
    let current_dir = std::env::current_dir()?;
    match config_paths(&current_dir).into_iter().find(|p| p.exists()) {
        Some(path) => Settings::load_from(&path),
        None => Ok(Settings::default()),
    }
}
