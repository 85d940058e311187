//! The identifier catalogue: every name, label, path fragment and pattern the
//! detection and removal walks look for.
//!
//! A catalogue is immutable for the duration of a run. The built-in one covers
//! OpenClaw and its two former names; a TOML file with the same shape can
//! replace it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::common::errors::PurgeError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalogue {
    pub product: ProductMeta,
    #[serde(default)]
    pub apps: Vec<AppEntry>,
    #[serde(default)]
    pub service_labels: Vec<String>,
    #[serde(default)]
    pub processes: ProcessNames,
    #[serde(default)]
    pub packages: Packages,
    #[serde(default)]
    pub cli: CliTool,
    /// Home-relative configuration directories, e.g. `.openclaw`
    #[serde(default)]
    pub config_dirs: Vec<String>,
    /// Prefixes of profile-suffixed config dirs, e.g. `.openclaw-` for `~/.openclaw-work`
    #[serde(default)]
    pub profile_prefixes: Vec<String>,
    /// Installer receipt id prefixes as listed by `pkgutil --pkgs`
    #[serde(default)]
    pub receipt_prefixes: Vec<String>,
    /// Case-insensitive substrings for the pattern sweep
    #[serde(default)]
    pub name_patterns: Vec<String>,
    #[serde(default)]
    pub fingerprints: Fingerprints,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductMeta {
    pub name: String,
    #[serde(default)]
    pub former_names: Vec<String>,
}

/// A GUI application bundle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppEntry {
    /// Bundle name without `.app`, also the name used for `quit app`
    pub name: String,
    pub bundle_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessNames {
    /// Matched with `pgrep -x` / `pkill -x`
    #[serde(default)]
    pub exact: Vec<String>,
    /// Matched against full command lines with `-i -f`
    #[serde(default)]
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Packages {
    #[serde(default)]
    pub npm: Vec<String>,
    #[serde(default)]
    pub brew_formulae: Vec<String>,
    #[serde(default)]
    pub brew_casks: Vec<String>,
}

/// The product's own command-line tool
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliTool {
    #[serde(default)]
    pub binaries: Vec<String>,
    /// Directories searched in order; `~/` entries are per user
    #[serde(default)]
    pub search_dirs: Vec<String>,
    #[serde(default)]
    pub uninstall_args: Vec<String>,
}

/// Log text signatures the classifier looks for
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fingerprints {
    /// Package-manager output meaning "that package was never installed"
    #[serde(default)]
    pub manager_noop: Vec<String>,
    /// Success-but-empty summary written by the removal run
    #[serde(default = "default_no_changes")]
    pub no_changes: String,
}

fn default_no_changes() -> String {
    "No changes made".to_string()
}

impl Default for Fingerprints {
    fn default() -> Self {
        Self {
            manager_noop: vec![
                "up to date, audited".to_string(),
                "No such keg".to_string(),
                "is not installed".to_string(),
            ],
            no_changes: default_no_changes(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Catalogue {
    /// The built-in catalogue
    pub fn builtin() -> Self {
        Self {
            product: ProductMeta {
                name: "OpenClaw".into(),
                former_names: strings(&["Moltbot", "Clawdbot"]),
            },
            apps: vec![
                AppEntry {
                    name: "OpenClaw".into(),
                    bundle_id: "ai.openclaw.mac".into(),
                },
                AppEntry {
                    name: "Moltbot".into(),
                    bundle_id: "bot.molt.mac".into(),
                },
                AppEntry {
                    name: "Clawdbot".into(),
                    bundle_id: "com.clawdbot.mac".into(),
                },
            ],
            service_labels: strings(&[
                "ai.openclaw.gateway",
                "ai.openclaw.mac",
                "bot.molt.gateway",
                "bot.molt.mac",
                "com.clawdbot.gateway",
                "com.clawdbot.mac",
            ]),
            processes: ProcessNames {
                exact: strings(&[
                    "openclaw",
                    "openclaw-gateway",
                    "OpenClaw",
                    "moltbot",
                    "moltbot-gateway",
                    "Moltbot",
                    "clawdbot",
                    "clawdbot-gateway",
                    "Clawdbot",
                ]),
                patterns: strings(&["openclaw", "moltbot", "clawdbot"]),
            },
            packages: Packages {
                npm: strings(&["openclaw", "moltbot", "clawdbot"]),
                brew_formulae: strings(&["openclaw", "moltbot", "clawdbot"]),
                brew_casks: strings(&["openclaw", "moltbot", "clawdbot"]),
            },
            cli: CliTool {
                binaries: strings(&["openclaw", "moltbot", "clawdbot"]),
                search_dirs: strings(&[
                    "/opt/homebrew/bin",
                    "/usr/local/bin",
                    "~/.local/bin",
                    "~/.npm-global/bin",
                    "~/.volta/bin",
                    "~/.bun/bin",
                    "~/Library/pnpm",
                ]),
                uninstall_args: strings(&["uninstall", "--all", "--yes", "--non-interactive"]),
            },
            config_dirs: strings(&[".openclaw", ".moltbot", ".clawdbot"]),
            profile_prefixes: strings(&[".openclaw-", ".moltbot-", ".clawdbot-"]),
            receipt_prefixes: strings(&["ai.openclaw", "bot.molt", "com.clawdbot"]),
            name_patterns: strings(&["openclaw", "moltbot", "clawdbot"]),
            fingerprints: Fingerprints::default(),
        }
    }

    /// Load a catalogue from TOML, or the built-in one when `path` is `None`
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::builtin());
        };
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalogue: {}", path.display()))?;
        let catalogue: Catalogue =
            toml::from_str(&contents).map_err(|e| PurgeError::Catalogue {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        catalogue.validate().map_err(|message| PurgeError::Catalogue {
            path: path.to_path_buf(),
            message,
        })?;
        Ok(catalogue)
    }

    /// Reject catalogues that would make the pattern sweep meaningless or dangerous
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.product.name.trim().is_empty() {
            return Err("product.name must not be empty".into());
        }
        if self.name_patterns.is_empty() {
            return Err("name_patterns must list at least one pattern".into());
        }
        if let Some(p) = self.name_patterns.iter().find(|p| p.trim().len() < 3) {
            return Err(format!("name pattern '{}' is too short to sweep safely", p));
        }
        let unsafe_entry = self
            .config_dirs
            .iter()
            .chain(&self.profile_prefixes)
            .find(|d| d.trim().is_empty() || d.contains('/') || d.contains(".."));
        if let Some(d) = unsafe_entry {
            return Err(format!("config entry '{}' must be a plain directory name", d));
        }
        Ok(())
    }

    /// All names the product has shipped under, current first
    pub fn all_names(&self) -> Vec<&str> {
        std::iter::once(self.product.name.as_str())
            .chain(self.product.former_names.iter().map(String::as_str))
            .collect()
    }

    /// launchd descriptor file names for the known labels
    pub fn descriptor_names(&self) -> Vec<String> {
        self.service_labels
            .iter()
            .map(|l| format!("{}.plist", l))
            .collect()
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize catalogue")
    }
}
