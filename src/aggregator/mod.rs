//! Asset aggregation.
//!
//! An [`AssetAggregator`] pairs a path pattern with a [`TagTemplate`]. Given a
//! file it renders one include tag if the path matches; given a directory it
//! walks the whole subtree in file-name order and renders a tag for every
//! matching regular file. Each tag carries the file's mtime as a
//! cache-busting version.

pub mod tag;

pub use tag::{TagTemplate, DEFAULT_CSS_TEMPLATE, DEFAULT_SCRIPT_TEMPLATE};

use crate::error::AggregateError;
use regex::Regex;
use std::borrow::Cow;
use std::fs::{self, Metadata};
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Matches any path ending in `.js`.
pub const JS_PATTERN: &str = r".*\.js$";

/// Matches any path ending in `.css`.
pub const CSS_PATTERN: &str = r".*\.css$";

/// Something that turns a file or directory into include tags.
pub trait Aggregate {
    /// Render include tags for `target`.
    ///
    /// A regular file that does not match yields an empty string, not an error.
    fn aggregate(&self, target: &Path) -> Result<String, AggregateError>;
}

impl<T: Aggregate + ?Sized> Aggregate for &T {
    fn aggregate(&self, target: &Path) -> Result<String, AggregateError> {
        (**self).aggregate(target)
    }
}

impl<T: Aggregate + ?Sized> Aggregate for Box<T> {
    fn aggregate(&self, target: &Path) -> Result<String, AggregateError> {
        (**self).aggregate(target)
    }
}

/// Pattern + template aggregator.
///
/// The pattern is compiled on first use and cached; a pattern that fails to
/// compile makes every `aggregate` call that reaches a file fail with
/// [`AggregateError::InvalidPattern`].
///
/// Paths are matched and rendered as UTF-8 text. A file name that is not
/// valid UTF-8 has its bad bytes replaced with U+FFFD, so its tag will not
/// point at the real file; such paths are logged at debug level.
#[derive(Debug, Clone)]
pub struct AssetAggregator {
    pattern: String,
    template: TagTemplate,
    matcher: OnceLock<Result<Regex, regex::Error>>,
}

impl AssetAggregator {
    /// Create an aggregator for an arbitrary asset class.
    pub fn new(pattern: impl Into<String>, template: impl Into<TagTemplate>) -> Self {
        Self {
            pattern: pattern.into(),
            template: template.into(),
            matcher: OnceLock::new(),
        }
    }

    /// `<script>` tags for `*.js` files.
    pub fn js() -> Self {
        Self::new(JS_PATTERN, DEFAULT_SCRIPT_TEMPLATE)
    }

    /// Stylesheet `<link>` tags for `*.css` files.
    pub fn css() -> Self {
        Self::new(CSS_PATTERN, DEFAULT_CSS_TEMPLATE)
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn template(&self) -> &TagTemplate {
        &self.template
    }

    /// Unanchored regex search of `path`.
    pub fn is_asset(&self, path: &str) -> Result<bool, AggregateError> {
        match self.matcher.get_or_init(|| Regex::new(&self.pattern)) {
            Ok(re) => Ok(re.is_match(path)),
            Err(source) => Err(AggregateError::InvalidPattern {
                pattern: self.pattern.clone(),
                source: source.clone(),
            }),
        }
    }

    fn process_file(&self, path: &Path, metadata: &Metadata) -> Result<String, AggregateError> {
        let path_str = path_text(path);

        if !self.is_asset(&path_str)? {
            debug!("{} does not match `{}`, skipping", path_str, self.pattern);
            return Ok(String::new());
        }

        let version = tag::version_token(metadata)?;
        Ok(self.template.render(&path_str, version))
    }

    fn process_dir(&self, dir: &Path) -> Result<String, AggregateError> {
        let mut tags = String::new();
        let mut count = 0usize;

        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => return Err(traversal_error(tags, err)),
            };

            // Directories are only descended; symlinks and special files are skipped.
            if !entry.file_type().is_file() {
                continue;
            }

            let path_str = path_text(entry.path());
            if !self.is_asset(&path_str)? {
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(err) => return Err(traversal_error(tags, err)),
            };
            let version = match tag::version_token(&metadata) {
                Ok(version) => version,
                Err(source) => {
                    return Err(AggregateError::Traversal {
                        partial: tags,
                        path: Some(entry.path().to_path_buf()),
                        source,
                    })
                }
            };

            trace!("{} -> ver={}", path_str, version);
            self.template.render_into(&mut tags, &path_str, version);
            count += 1;
        }

        debug!("{} asset(s) matched under {}", count, dir.display());
        Ok(tags)
    }
}

impl Aggregate for AssetAggregator {
    fn aggregate(&self, target: &Path) -> Result<String, AggregateError> {
        let metadata = fs::metadata(target)?;
        let file_type = metadata.file_type();

        if file_type.is_dir() {
            debug!("Aggregating directory: {}", target.display());
            self.process_dir(target)
        } else if file_type.is_file() {
            debug!("Aggregating file: {}", target.display());
            self.process_file(target, &metadata)
        } else {
            debug!("{} is neither a file nor a directory", target.display());
            Ok(String::new())
        }
    }
}

/// Path as text for matching and rendering.
fn path_text(path: &Path) -> Cow<'_, str> {
    let text = path.to_string_lossy();
    if let Cow::Owned(_) = text {
        debug!("{} is not valid UTF-8, rendering it lossily", text);
    }
    text
}

fn traversal_error(partial: String, err: walkdir::Error) -> AggregateError {
    let path = err.path().map(Path::to_path_buf);
    AggregateError::Traversal {
        partial,
        path,
        source: err.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const CRLF: &str = "\r\n";
    const SCRIPT_TAG_REGEX: &str = r#"^<script src=".*\.js\?ver=\d+"></script>$"#;
    const CSS_TAG_REGEX: &str = r#"^<link type="text/css" rel="stylesheet" href=".*\.css\?ver=\d+">$"#;

    /// Serializes tests that change the working directory.
    static CWD_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    fn create_files(dir: &Path, names: &[&str]) {
        for name in names {
            let path = dir.join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(&path, "/* asset */").unwrap();
        }
    }

    fn lines(output: &str) -> Vec<&str> {
        match output.strip_suffix(CRLF) {
            Some(body) => body.split(CRLF).collect(),
            None if output.is_empty() => Vec::new(),
            None => panic!("output does not end with CRLF: {:?}", output),
        }
    }

    fn assert_all_match(output: &str, pattern: &str, expected: usize) {
        let re = Regex::new(pattern).unwrap();
        assert_eq!(output.matches(CRLF).count(), expected, "output: {:?}", output);
        let lines = lines(output);
        assert_eq!(lines.len(), expected, "output: {:?}", output);
        for line in lines {
            assert!(re.is_match(line), "{:?} does not match {}", line, pattern);
        }
    }

    #[test]
    fn test_js_directory() {
        let dir = TempDir::new().unwrap();
        let static_dir = dir.path().join("static");
        create_files(&static_dir, &["file1.js", "file2.js", "file3.js"]);

        let output = AssetAggregator::js().aggregate(&static_dir).unwrap();

        assert_all_match(&output, SCRIPT_TAG_REGEX, 3);
        assert!(output.ends_with(CRLF));
    }

    #[test]
    fn test_css_directory() {
        let dir = TempDir::new().unwrap();
        let static_dir = dir.path().join("static");
        create_files(&static_dir, &["style1.css", "style2.css", "style3.css"]);

        let output = AssetAggregator::css().aggregate(&static_dir).unwrap();

        assert_all_match(&output, CSS_TAG_REGEX, 3);
    }

    #[test]
    fn test_directory_ignores_other_assets() {
        let dir = TempDir::new().unwrap();
        create_files(
            dir.path(),
            &["a.js", "b.css", "c.js", "readme.md", "d.css", "e.js.map"],
        );

        let js = AssetAggregator::js().aggregate(dir.path()).unwrap();
        let css = AssetAggregator::css().aggregate(dir.path()).unwrap();

        assert_all_match(&js, SCRIPT_TAG_REGEX, 2);
        assert_all_match(&css, CSS_TAG_REGEX, 2);
    }

    #[test]
    fn test_nested_directories_in_name_order() {
        let dir = TempDir::new().unwrap();
        create_files(
            dir.path(),
            &["z.js", "lib/b.js", "lib/a.js", "lib/vendor/jquery.js", "app.js"],
        );

        let output = AssetAggregator::new(JS_PATTERN, "{}\n").aggregate(dir.path()).unwrap();

        let root = dir.path();
        let expected: Vec<String> = ["app.js", "lib/a.js", "lib/b.js", "lib/vendor/jquery.js", "z.js"]
            .iter()
            .map(|name| format!("{}\n", root.join(name).display()))
            .collect();
        assert_eq!(output, expected.concat());
    }

    #[test]
    fn test_single_file() {
        let dir = TempDir::new().unwrap();
        create_files(dir.path(), &["file1.js"]);
        let file = dir.path().join("file1.js");

        let output = AssetAggregator::js().aggregate(&file).unwrap();

        let version = tag::version_token(&fs::metadata(&file).unwrap()).unwrap();
        assert_eq!(
            output,
            format!("<script src=\"{}?ver={}\"></script>\r\n", file.display(), version)
        );
        assert_all_match(&output, SCRIPT_TAG_REGEX, 1);
    }

    #[test]
    fn test_single_css_file() {
        let dir = TempDir::new().unwrap();
        create_files(dir.path(), &["style1.css"]);

        let output = AssetAggregator::css()
            .aggregate(&dir.path().join("style1.css"))
            .unwrap();

        assert_all_match(&output, CSS_TAG_REGEX, 1);
    }

    #[test]
    fn test_non_matching_file_is_empty() {
        let dir = TempDir::new().unwrap();
        create_files(dir.path(), &["style1.css", "file1.js"]);

        let js = AssetAggregator::js().aggregate(&dir.path().join("style1.css"));
        let css = AssetAggregator::css().aggregate(&dir.path().join("file1.js"));

        assert_eq!(js.unwrap(), "");
        assert_eq!(css.unwrap(), "");
    }

    #[test]
    fn test_empty_directory() {
        let dir = TempDir::new().unwrap();
        assert_eq!(AssetAggregator::js().aggregate(dir.path()).unwrap(), "");
    }

    #[test]
    fn test_missing_target() {
        let dir = TempDir::new().unwrap();
        let err = AssetAggregator::js()
            .aggregate(&dir.path().join("NotExistsFolder"))
            .unwrap_err();

        assert!(matches!(err, AggregateError::Stat(_)));
        assert_eq!(err.io_kind(), Some(io::ErrorKind::NotFound));
        assert_eq!(err.partial(), "");
    }

    #[test]
    fn test_invalid_pattern_on_file() {
        let dir = TempDir::new().unwrap();
        create_files(dir.path(), &["asset1.js"]);

        let aggregator = AssetAggregator::new(r"*.\.js$", DEFAULT_SCRIPT_TEMPLATE);
        let err = aggregator
            .aggregate(&dir.path().join("asset1.js"))
            .unwrap_err();

        assert!(err.is_fatal());
        assert!(matches!(err, AggregateError::InvalidPattern { .. }));
    }

    #[test]
    fn test_invalid_pattern_on_directory() {
        let dir = TempDir::new().unwrap();
        create_files(dir.path(), &["teststyle1.css"]);

        let aggregator = AssetAggregator::new(r"*.\.css$", DEFAULT_CSS_TEMPLATE);
        let err = aggregator.aggregate(dir.path()).unwrap_err();

        assert!(err.is_fatal());
    }

    #[test]
    fn test_pattern_is_unanchored_search() {
        let aggregator = AssetAggregator::new(r"vendor/", "{}");
        assert!(aggregator.is_asset("static/vendor/x.js").unwrap());
        assert!(!aggregator.is_asset("static/app.js").unwrap());
    }

    #[test]
    fn test_custom_aggregator() {
        let dir = TempDir::new().unwrap();
        create_files(dir.path(), &["logo.png", "icon.svg", "app.js"]);

        let aggregator = AssetAggregator::new(r"\.(png|svg)$", "<img src=\"{}?v={}\">\r\n");
        let output = aggregator.aggregate(dir.path()).unwrap();

        let re = Regex::new(r#"^<img src=".*\.(png|svg)\?v=\d+">$"#).unwrap();
        let lines = lines(&output);
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| re.is_match(l)));
        assert!(lines[0].contains("icon.svg"));
        assert!(lines[1].contains("logo.png"));
    }

    #[test]
    fn test_idempotent() {
        let dir = TempDir::new().unwrap();
        create_files(dir.path(), &["a.js", "b/c.js", "b/d.js"]);

        let aggregator = AssetAggregator::js();
        let first = aggregator.aggregate(dir.path()).unwrap();
        let second = aggregator.aggregate(dir.path()).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_path_not_normalized() {
        let dir = TempDir::new().unwrap();
        create_files(dir.path(), &["static/app.js"]);
        let target: PathBuf = dir.path().join("static").join("..").join("static");

        let output = AssetAggregator::new(JS_PATTERN, "{}").aggregate(&target).unwrap();

        assert_eq!(output, target.join("app.js").display().to_string());
    }

    #[test]
    fn test_relative_target_stays_relative() {
        let _guard = CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = TempDir::new().unwrap();
        create_files(dir.path(), &["static/file1.js", "static/file2.js", "file3.js"]);

        let previous = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();
        let from_dir = AssetAggregator::new(JS_PATTERN, "{}\r\n").aggregate(Path::new("static"));
        let from_file = AssetAggregator::new(JS_PATTERN, "{}").aggregate(Path::new("file3.js"));
        std::env::set_current_dir(previous).unwrap();

        let expected = format!(
            "{}\r\n{}\r\n",
            Path::new("static").join("file1.js").display(),
            Path::new("static").join("file2.js").display()
        );
        assert_eq!(from_dir.unwrap(), expected);
        assert_eq!(from_file.unwrap(), "file3.js");
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_subdirectory_keeps_partial_output() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        create_files(dir.path(), &["a.js", "b/c.js"]);
        let locked = dir.path().join("b");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Permission bits do not stop a privileged user.
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let result = AssetAggregator::js().aggregate(dir.path());
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let err = result.unwrap_err();
        assert!(matches!(err, AggregateError::Traversal { .. }), "{:?}", err);
        assert_eq!(err.io_kind(), Some(io::ErrorKind::PermissionDenied));

        let a_js = dir.path().join("a.js");
        let version = tag::version_token(&fs::metadata(&a_js).unwrap()).unwrap();
        assert_eq!(
            err.partial(),
            format!("<script src=\"{}?ver={}\"></script>\r\n", a_js.display(), version)
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_name_rendered_lossily() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        let name = OsStr::from_bytes(b"bad\xffname.js");
        let file = dir.path().join(name);
        if fs::write(&file, "x").is_err() {
            // Some filesystems reject non-UTF-8 names outright.
            return;
        }

        let output = AssetAggregator::new(JS_PATTERN, "{}").aggregate(&file).unwrap();

        assert!(output.ends_with("bad\u{FFFD}name.js"), "{:?}", output);
        assert!(matches!(path_text(&file), Cow::Owned(_)));
        assert!(matches!(path_text(Path::new("ok.js")), Cow::Borrowed(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_skipped_in_directory() {
        let dir = TempDir::new().unwrap();
        create_files(dir.path(), &["real.js"]);
        std::os::unix::fs::symlink(dir.path().join("real.js"), dir.path().join("link.js")).unwrap();

        let output = AssetAggregator::js().aggregate(dir.path()).unwrap();

        assert_all_match(&output, SCRIPT_TAG_REGEX, 1);
        assert!(output.contains("real.js"));
        assert!(!output.contains("link.js"));
    }

    #[cfg(unix)]
    #[test]
    fn test_socket_target_is_empty() {
        let dir = TempDir::new().unwrap();
        let socket = dir.path().join("assets.js");
        let _listener = std::os::unix::net::UnixListener::bind(&socket).unwrap();

        assert_eq!(AssetAggregator::js().aggregate(&socket).unwrap(), "");
    }

    #[test]
    fn test_aggregator_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AssetAggregator>();
    }

    #[test]
    fn test_boxed_aggregate() {
        let dir = TempDir::new().unwrap();
        create_files(dir.path(), &["a.js"]);

        let boxed: Box<dyn Aggregate> = Box::new(AssetAggregator::js());
        assert_all_match(&boxed.aggregate(dir.path()).unwrap(), SCRIPT_TAG_REGEX, 1);
    }
}
