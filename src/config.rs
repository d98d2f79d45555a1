use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Secret store executable, called as `<program> <key>`.
    pub program: String,
    /// First segment of every registry key.
    pub prefix: String,
    /// Read the registry from this TOML file instead of the secret store.
    pub hosts_file: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Defaults {
    pub wakeup_port: u16,
    pub wakeup_delay: u64,
    pub status_timeout: u64,
    pub ssh_term: String,
    pub tunnel_arg: String,
    pub rtunnel_arg: String,
    pub local_path: String,
    pub remote_path: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Tools {
    pub status: String,
    pub wakeup: String,
    pub ssh: String,
    pub sshfs: String,
    pub rsync: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct AppConfig {
    pub log_dir: Option<PathBuf>,
    pub store: StoreConfig,
    pub defaults: Defaults,
    pub tools: Tools,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            program: "pass".to_string(),
            prefix: "computers".to_string(),
            hosts_file: None,
        }
    }
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            wakeup_port: 40000,
            wakeup_delay: 60,
            status_timeout: 5,
            ssh_term: "xterm-256color".to_string(),
            tunnel_arg: "65535".to_string(),
            rtunnel_arg: "65535:localhost:22".to_string(),
            local_path: "./".to_string(),
            remote_path: "~/".to_string(),
        }
    }
}

impl Default for Tools {
    fn default() -> Self {
        Self {
            status: "nc".to_string(),
            wakeup: "wol".to_string(),
            ssh: "ssh".to_string(),
            sshfs: "sshfs".to_string(),
            rsync: "rsync".to_string(),
        }
    }
}

#[derive(Debug)]
pub struct ConfigManager {
    config_file: PathBuf,
}

impl ConfigManager {
    /// Uses `<config dir>/remote/remote.toml`.
    pub fn new() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .context("Could not find config directory")?
            .join("remote");

        Ok(Self {
            config_file: config_dir.join("remote.toml"),
        })
    }

    pub fn with_file(config_file: impl Into<PathBuf>) -> Self {
        Self {
            config_file: config_file.into(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_file
    }

    /// Missing file means defaults. The file is never created implicitly.
    pub fn load_config(&self) -> Result<AppConfig> {
        if !self.config_file.exists() {
            tracing::debug!(
                "No config file at {:?}, using defaults",
                self.config_file
            );
            return Ok(AppConfig::default());
        }

        let content: String =
            fs::read_to_string(&self.config_file).context("Failed to read config file")?;

        let config: AppConfig =
            toml::from_str(&content).context("Failed to parse config file")?;

        if config.store.program.trim().is_empty() {
            anyhow::bail!(crate::error::Error::Config(
                "store.program must not be empty".to_string()
            ));
        }

        Ok(config)
    }

    pub fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(dir) = self.config_file.parent() {
            fs::create_dir_all(dir).context("Failed to create config directory")?;
        }
        let toml = toml::to_string_pretty(config).context("Failed to serialize config")?;
        fs::write(&self.config_file, toml).context("Failed to write config file")?;
        Ok(())
    }
}
