use std::{io::ErrorKind, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = "config.json";

/// Where to push frames to and how to authenticate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub url: Option<String>,
    pub token: Option<String>,
}

impl RemoteConfig {
    /// Values given on the command line win over the ones from the file.
    pub fn with_overrides(self, url: Option<String>, token: Option<String>) -> Self {
        Self {
            url: url.or(self.url),
            token: token.or(self.token),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub remote: RemoteConfig,
}

impl Config {
    /// Reads the configuration file. A missing or empty file means default configuration.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = match tokio::fs::read(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No configuration at {path:?}");
                return Ok(Self::default());
            }
            Err(e) => return Err(e).with_context(|| format!("Can't read config {path:?}")),
        };
        if content.is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_slice(&content).with_context(|| format!("Invalid config {path:?}"))
    }
}
