//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.assetinc.toml` files.

use crate::aggregator::{
    AssetAggregator, CSS_PATTERN, DEFAULT_CSS_TEMPLATE, DEFAULT_SCRIPT_TEMPLATE, JS_PATTERN,
};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".assetinc.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Overrides for the `js` preset.
    #[serde(default)]
    pub js: AssetClassConfig,

    /// Overrides for the `css` preset.
    #[serde(default)]
    pub css: AssetClassConfig,

    /// Additional named asset classes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom: Vec<CustomAssetConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            js: AssetClassConfig {
                pattern: Some(JS_PATTERN.to_string()),
                template: Some(DEFAULT_SCRIPT_TEMPLATE.to_string()),
            },
            css: AssetClassConfig {
                pattern: Some(CSS_PATTERN.to_string()),
                template: Some(DEFAULT_CSS_TEMPLATE.to_string()),
            },
            custom: Vec::new(),
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Write tags to this file instead of stdout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// Pattern/template override for a preset. Missing fields keep the preset value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetClassConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

impl AssetClassConfig {
    fn aggregator(&self, pattern: &str, template: &str) -> AssetAggregator {
        AssetAggregator::new(
            self.pattern.as_deref().unwrap_or(pattern),
            self.template.as_deref().unwrap_or(template),
        )
    }
}

/// A user-defined asset class, selected with `--kind <name>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomAssetConfig {
    pub name: String,
    pub pattern: String,
    pub template: String,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;

        for (i, custom) in config.custom.iter().enumerate() {
            if custom.name.is_empty() {
                bail!("custom asset class #{} has an empty name", i + 1);
            }
            if matches!(custom.name.as_str(), "js" | "css") {
                bail!("custom asset class `{}` shadows a built-in preset", custom.name);
            }
            if config.custom[..i].iter().any(|c| c.name == custom.name) {
                bail!("custom asset class `{}` is defined twice", custom.name);
            }
        }

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.assetinc.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref output) = args.output {
            self.general.output = Some(output.display().to_string());
        }

        if args.verbose {
            self.general.verbose = true;
        }
        if args.quiet {
            self.general.verbose = false;
        }
    }

    /// Build the aggregator for a named asset class.
    pub fn aggregator_for(&self, kind: &str) -> Result<AssetAggregator> {
        match kind {
            "js" => Ok(self.js.aggregator(JS_PATTERN, DEFAULT_SCRIPT_TEMPLATE)),
            "css" => Ok(self.css.aggregator(CSS_PATTERN, DEFAULT_CSS_TEMPLATE)),
            name => match self.custom.iter().find(|c| c.name == name) {
                Some(custom) => Ok(AssetAggregator::new(
                    custom.pattern.as_str(),
                    custom.template.as_str(),
                )),
                None => bail!(
                    "Unknown asset kind `{}` (expected js, css{})",
                    name,
                    self.custom
                        .iter()
                        .map(|c| format!(", {}", c.name))
                        .collect::<String>()
                ),
            },
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
