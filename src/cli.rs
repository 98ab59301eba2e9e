//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::aggregator::AssetAggregator;
use clap::Parser;
use std::path::PathBuf;

/// AssetInc - cache-busted include tags for static assets
///
/// Scans a file or directory and prints one <script> or <link> tag per
/// matching asset, versioned with the file's modification time.
///
/// Examples:
///   assetinc static/js
///   assetinc --kind css static/css
///   assetinc --pattern '\.mjs$' --template '<script type="module" src="{}?ver={}"></script>\r\n' static
///   assetinc --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// File or directory to scan
    #[arg(value_name = "PATH", required_unless_present = "init_config")]
    pub target: Option<PathBuf>,

    /// Asset class to aggregate: js, css, or a custom class name from the config
    #[arg(short, long, default_value = "js", env = "ASSETINC_KIND")]
    pub kind: String,

    /// Regular expression selecting asset paths (ad-hoc class, overrides --kind)
    #[arg(long, value_name = "REGEX", requires = "template")]
    pub pattern: Option<String>,

    /// Tag template with two `{}` slots: path, then version
    ///
    /// The literal sequences \r and \n are turned into CR and LF.
    #[arg(long, value_name = "FORMAT", requires = "pattern")]
    pub template: Option<String>,

    /// Write tags to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .assetinc.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .assetinc.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.target.is_none() {
            return Err("A file or directory to scan is required".to_string());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.kind.trim().is_empty() {
            return Err("--kind must not be empty".to_string());
        }

        if self.pattern.is_some() != self.template.is_some() {
            return Err("--pattern and --template must be given together".to_string());
        }

        if let Some(ref pattern) = self.pattern {
            if pattern.is_empty() {
                return Err("--pattern must not be empty".to_string());
            }
        }

        Ok(())
    }

    /// Log level, with the config file's `verbose` as a fallback.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// The aggregator described by `--pattern`/`--template`, if given.
    pub fn adhoc_aggregator(&self) -> Option<AssetAggregator> {
        match (&self.pattern, &self.template) {
            (Some(pattern), Some(template)) => Some(AssetAggregator::new(
                pattern.as_str(),
                unescape_line_breaks(template),
            )),
            _ => None,
        }
    }
}

fn unescape_line_breaks(template: &str) -> String {
    template.replace("\\r", "\r").replace("\\n", "\n")
}
