use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::loader::DEFAULT_CONTENT_PATH;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parsing(#[from] toml::de::Error),
}

/// Settings `folio-core` reads from `folio.toml`.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub page: PageConfig,
}

impl Config {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&data)?;

        Ok(config)
    }

    /// Switch the build into preview mode: pages get the live reload client.
    pub fn dev(&mut self, host: impl Into<String>, port: u16) {
        self.page.live_reload = Some(LiveReload {
            host: host.into(),
            port,
        });
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct PageConfig {
    /// Content document, relative to the source directory.
    pub content: String,
    /// Page template inside the theme directory.
    pub template: String,
    #[serde(skip)]
    pub live_reload: Option<LiveReload>,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            content: DEFAULT_CONTENT_PATH.to_string(),
            template: "index.html".to_string(),
            live_reload: None,
        }
    }
}

/// Where the preview server's reload socket listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveReload {
    pub host: String,
    pub port: u16,
}
