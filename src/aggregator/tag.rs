//! Tag templates and cache-busting version tokens.

use chrono::{DateTime, Utc};
use std::fs::Metadata;
use std::io;

/// Placeholder token in a tag template.
pub const PLACEHOLDER: &str = "{}";

/// `<script>` include, one per line.
pub const DEFAULT_SCRIPT_TEMPLATE: &str = "<script src=\"{}?ver={}\"></script>\r\n";

/// Stylesheet `<link>` include, one per line.
pub const DEFAULT_CSS_TEMPLATE: &str =
    "<link type=\"text/css\" rel=\"stylesheet\" href=\"{}?ver={}\">\r\n";

/// A format string with two ordered `{}` slots: asset path, then version.
///
/// Placeholders past the second are kept as literal text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagTemplate {
    source: String,
}

impl TagTemplate {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Render one tag into `out`.
    pub fn render_into(&self, out: &mut String, path: &str, version: i64) {
        let mut parts = self.source.splitn(3, PLACEHOLDER);

        out.push_str(parts.next().unwrap_or(""));
        if let Some(rest) = parts.next() {
            out.push_str(path);
            out.push_str(rest);
        }
        if let Some(rest) = parts.next() {
            out.push_str(&version.to_string());
            out.push_str(rest);
        }
    }

    pub fn render(&self, path: &str, version: i64) -> String {
        let mut out = String::with_capacity(self.source.len() + path.len() + 12);
        self.render_into(&mut out, path, version);
        out
    }
}

impl From<&str> for TagTemplate {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TagTemplate {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Modification time as Unix epoch seconds.
///
/// Times before the epoch come out negative.
pub fn version_token(metadata: &Metadata) -> io::Result<i64> {
    let modified: DateTime<Utc> = metadata.modified()?.into();
    Ok(modified.timestamp())
}
