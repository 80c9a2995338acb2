//! `upnext.toml` loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use upnext_ai::GeneratorConfig;
use upnext_notify::{SchedulerConfig, WebhookConfig};

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "upnext.toml";

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the JSON data store
    pub storage_path: PathBuf,
    /// JSON catalog replacing the built-in one
    pub catalog_path: Option<PathBuf>,
    /// Delivery and reminder tunables
    pub scheduler: SchedulerConfig,
    /// Webhook endpoints; channels are only logged when absent
    pub webhooks: Option<WebhookConfig>,
    /// Content generation endpoint; generation falls back to defaults when absent
    pub generator: Option<GeneratorConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from(".upnext"),
            catalog_path: None,
            scheduler: SchedulerConfig::default(),
            webhooks: None,
            generator: None,
        }
    }
}

impl Config {
    /// Load `path`, or `upnext.toml` if present, or defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))
            }
            None => Ok(Self::default()),
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("invalid config {}", path.display()))
    }
}
