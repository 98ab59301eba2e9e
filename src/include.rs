//! Template helpers.
//!
//! `include_js` / `include_css` are what a template renderer binds: they run
//! the matching aggregator and hand back the tags as already-escaped HTML.
//! An aggregation failure is a broken page, so these panic instead of
//! rendering something partial. Use the `try_` variants to handle errors.

use crate::aggregator::{Aggregate, AssetAggregator};
use crate::error::AggregateError;
use std::fmt;
use std::path::Path;

/// HTML that must be emitted as-is, without further escaping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SafeHtml(String);

impl SafeHtml {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SafeHtml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<SafeHtml> for String {
    fn from(html: SafeHtml) -> Self {
        html.0
    }
}

/// Script and stylesheet include helpers.
#[derive(Debug, Clone)]
pub struct AssetIncludes<J = AssetAggregator, C = AssetAggregator> {
    js: J,
    css: C,
}

impl AssetIncludes {
    /// Helpers backed by the `.js` and `.css` presets.
    pub fn with_presets() -> Self {
        Self::new(AssetAggregator::js(), AssetAggregator::css())
    }
}

impl Default for AssetIncludes {
    fn default() -> Self {
        Self::with_presets()
    }
}

impl<J: Aggregate, C: Aggregate> AssetIncludes<J, C> {
    pub fn new(js: J, css: C) -> Self {
        Self { js, css }
    }

    /// Script tags for `target`.
    ///
    /// # Panics
    ///
    /// Panics if aggregation fails for any reason.
    pub fn include_js(&self, target: impl AsRef<Path>) -> SafeHtml {
        escalate(self.try_include_js(target))
    }

    /// Stylesheet tags for `target`.
    ///
    /// # Panics
    ///
    /// Panics if aggregation fails for any reason.
    pub fn include_css(&self, target: impl AsRef<Path>) -> SafeHtml {
        escalate(self.try_include_css(target))
    }

    pub fn try_include_js(&self, target: impl AsRef<Path>) -> Result<SafeHtml, AggregateError> {
        self.js.aggregate(target.as_ref()).map(SafeHtml)
    }

    pub fn try_include_css(&self, target: impl AsRef<Path>) -> Result<SafeHtml, AggregateError> {
        self.css.aggregate(target.as_ref()).map(SafeHtml)
    }
}

fn escalate(result: Result<SafeHtml, AggregateError>) -> SafeHtml {
    match result {
        Ok(html) => html,
        Err(e) => panic!("asset include failed: {}", e),
    }
}
