use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that points at an alternate config file
pub const CONFIG_ENV: &str = "CLAWPURGE_CONFIG";

/// Global ClawPurge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding detection.log, removal.log and the trace log
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Lowest UID treated as a local (human) account
    #[serde(default = "default_min_uid")]
    pub min_uid: u32,

    /// Seconds to wait after asking a GUI app to quit before force-killing it
    #[serde(default = "default_quit_grace_secs")]
    pub quit_grace_secs: u64,

    /// Number of trailing log lines the tail check inspects
    #[serde(default = "default_tail_lines")]
    pub tail_lines: usize,

    /// Optional TOML catalogue replacing the built-in one
    #[serde(default)]
    pub catalogue_path: Option<PathBuf>,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("/Library/Logs/ClawPurge")
}
fn default_min_uid() -> u32 {
    501
}
fn default_quit_grace_secs() -> u64 {
    5
}
fn default_tail_lines() -> usize {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            min_uid: default_min_uid(),
            quit_grace_secs: default_quit_grace_secs(),
            tail_lines: default_tail_lines(),
            catalogue_path: None,
        }
    }
}

impl Config {
    /// Get the config file path (`$CLAWPURGE_CONFIG` wins)
    pub fn config_path() -> PathBuf {
        match std::env::var_os(CONFIG_ENV) {
            Some(p) if !p.is_empty() => PathBuf::from(p),
            _ => PathBuf::from("/Library/Application Support/ClawPurge/config.toml"),
        }
    }

    /// Path of the detection run log
    pub fn detection_log(&self) -> PathBuf {
        self.log_dir.join("detection.log")
    }

    /// Path of the removal run log
    pub fn removal_log(&self) -> PathBuf {
        self.log_dir.join("removal.log")
    }

    /// Load config from file, or fall back to defaults if not exists
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let config: Config = toml::from_str(&contents).map_err(|e| {
                crate::common::errors::PurgeError::Config {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }
            })?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config dir: {}", dir.display()))?;
        }
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Apply a `config set` key/value pair
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "log_dir" => self.log_dir = PathBuf::from(value),
            "min_uid" => self.min_uid = value.parse().context("min_uid must be a number")?,
            "quit_grace_secs" => {
                self.quit_grace_secs = value.parse().context("quit_grace_secs must be a number")?
            }
            "tail_lines" => {
                self.tail_lines = value.parse().context("tail_lines must be a number")?
            }
            "catalogue_path" => {
                self.catalogue_path = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                }
            }
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
        Ok(())
    }

    /// Make sure the log directory exists
    pub fn ensure_log_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.log_dir)
            .with_context(|| format!("Failed to create log dir: {}", self.log_dir.display()))
    }
}
