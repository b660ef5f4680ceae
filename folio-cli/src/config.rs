use anyhow::Result;
use clap::ArgMatches;
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "./folio.toml";

/// Complete configuration that merges CLI args, env vars, config files, and defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FolioConfig {
    pub build: BuildConfig,
    /// Page settings handed to folio-core
    #[serde(flatten)]
    pub site: folio_core::config::Config,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BuildConfig {
    /// Directory holding the content document
    pub source: String,
    /// Output directory for the built page
    pub output: String,
    pub theme: String,
    pub config: String,
    /// Host for the preview server
    pub host: String,
    /// Port for the preview server
    pub port: u16,
    /// Open browser automatically
    pub open: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            source: "./site".to_string(),
            output: "./out".to_string(),
            theme: "./theme".to_string(),
            config: DEFAULT_CONFIG_FILE.to_string(),
            host: "127.0.0.1".to_string(),
            port: 3000,
            open: false,
        }
    }
}

/// CLI arguments that were given, as `build.*` keys.
fn cli_overrides(args: &ArgMatches) -> HashMap<String, String> {
    let mut overrides = HashMap::new();

    for key in ["source", "output", "theme", "config", "host"] {
        // Only look at args that are actually defined for this command
        if let Some(value) = args.try_get_one::<String>(key).ok().flatten() {
            overrides.insert(format!("build.{key}"), value.clone());
        }
    }
    if let Some(port) = args.try_get_one::<u16>("port").ok().flatten() {
        overrides.insert("build.port".to_string(), port.to_string());
    }
    if args.try_get_one::<bool>("open").ok().flatten() == Some(&true) {
        overrides.insert("build.open".to_string(), "true".to_string());
    }

    overrides
}

impl FolioConfig {
    /// Load configuration with cascading precedence:
    /// 1. CLI arguments (highest priority)
    /// 2. Environment variables (FOLIO_*)
    /// 3. Configuration file
    /// 4. Defaults (lowest priority)
    pub fn load(args: &ArgMatches) -> Result<Self> {
        let config_file = args
            .try_get_one::<String>("config")
            .ok()
            .flatten()
            .cloned()
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

        let mut builder = ConfigBuilder::builder()
            .add_source(ConfigBuilder::try_from(&Self::default())?);

        if Path::new(&config_file).exists() {
            tracing::debug!("Reading configuration from {config_file}");
            builder = builder.add_source(File::new(&config_file, FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix("FOLIO")
                .prefix_separator("_")
                .separator("__"),
        );

        let overrides = cli_overrides(args);
        if !overrides.is_empty() {
            builder = builder.add_source(ConfigBuilder::try_from(&overrides)?);
        }

        Ok(builder.build()?.try_deserialize()?)
    }

    pub fn site_config(&self) -> &folio_core::config::Config {
        &self.site
    }

    pub fn build_config(&self) -> &BuildConfig {
        &self.build
    }
}

pub fn load_build_config(args: &ArgMatches) -> Result<FolioConfig> {
    FolioConfig::load(args)
}

pub fn load_serve_config(args: &ArgMatches) -> Result<FolioConfig> {
    FolioConfig::load(args)
}
