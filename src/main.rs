//! AssetInc - cache-busted include tags for static assets
//!
//! Prints one include tag per matching asset under a file or directory.
//!
//! Exit codes:
//!   0 - Success (including "nothing matched")
//!   1 - Any error (bad arguments, config, missing path, walk failure)

use anyhow::{Context, Result};
use assetinc::cli::Args;
use assetinc::config::{Config, CONFIG_FILE_NAME};
use assetinc::{Aggregate, AggregateError, AssetAggregator};
use std::io::Write;
use std::path::Path;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(&args, &config);

    debug!("AssetInc v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(&args, &config) {
        error!("Aggregation failed: {:#}", e);
        eprintln!("❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .assetinc.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE_NAME);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    eprintln!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    eprintln!("   Edit it to customize patterns, templates, and custom asset classes.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// Logs go to stderr so stdout carries only the tags.
fn init_logging(args: &Args, config: &Config) {
    let level = args.log_level(config.general.verbose);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    Ok(Config::load_default()?.unwrap_or_default())
}

/// Pick the aggregator: ad-hoc flags first, then --kind.
fn select_aggregator(args: &Args, config: &Config) -> Result<AssetAggregator> {
    match args.adhoc_aggregator() {
        Some(aggregator) => Ok(aggregator),
        None => config.aggregator_for(&args.kind),
    }
}

/// Aggregate the target and write the tags out.
fn run(args: &Args, config: &Config) -> Result<()> {
    let target = args
        .target
        .as_deref()
        .context("A file or directory to scan is required")?;
    let aggregator = select_aggregator(args, config)?;

    info!("Scanning {} for `{}`", target.display(), aggregator.pattern());

    match aggregator.aggregate(target) {
        Ok(tags) => {
            if tags.is_empty() {
                warn!("No assets matched under {}", target.display());
            }
            write_output(config.general.output.as_deref(), &tags)
        }
        Err(AggregateError::Traversal {
            partial,
            path,
            source,
        }) => {
            if !partial.is_empty() {
                warn!("Writing partial output collected before the walk failed");
                write_output(config.general.output.as_deref(), &partial)?;
            }
            Err(AggregateError::Traversal {
                partial: String::new(),
                path,
                source,
            })
            .with_context(|| format!("Failed to scan {}", target.display()))
        }
        Err(e) if e.is_fatal() => Err(e).context("Asset pattern is unusable"),
        Err(e) => Err(e).with_context(|| format!("Cannot read {}", target.display())),
    }
}

fn write_output(output: Option<&str>, tags: &str) -> Result<()> {
    match output {
        Some(file) => {
            std::fs::write(file, tags).with_context(|| format!("Failed to write tags to {}", file))?;
            info!("Tags written to {}", file);
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(tags.as_bytes())
                .and_then(|_| stdout.flush())
                .context("Failed to write tags to stdout")?;
        }
    }
    Ok(())
}
