//! AssetInc - cache-busted include tags for static assets.
//!
//! Point an [`AssetAggregator`] at a file or directory and it returns one
//! `<script>` or `<link>` tag per matching asset, each versioned with the
//! file's modification time. [`AssetIncludes`] wraps the two presets for
//! template renderers.
//!
//! ```no_run
//! use assetinc::{Aggregate, AssetAggregator};
//! use std::path::Path;
//!
//! let tags = AssetAggregator::js().aggregate(Path::new("static"))?;
//! print!("{}", tags);
//! # Ok::<(), assetinc::AggregateError>(())
//! ```

pub mod aggregator;
pub mod cli;
pub mod config;
pub mod error;
pub mod include;

pub use aggregator::{Aggregate, AssetAggregator, TagTemplate};
pub use error::AggregateError;
pub use include::{AssetIncludes, SafeHtml};
