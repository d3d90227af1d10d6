//! Pattern matching over virtual paths.
//!
//! Patterns are written as `syntax:pattern`, with `glob` or `regex` as the
//! syntax. Both match the whole display form of the path (`/src/main.rs`),
//! never the real path.

use glob::{MatchOptions, Pattern};
use regex::Regex;

use super::error::{VfsError, VfsResult};
use super::path::VirtualPath;

#[derive(Debug, Clone)]
enum Syntax {
    Glob(Pattern),
    Regex(Regex),
}

/// Compiled matcher usable as a [`DirFilter`](super::DirFilter).
///
/// In glob syntax `*` and `?` do not cross `/`; use `**` for any depth.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    syntax: Syntax,
}

const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

impl PathMatcher {
    /// Compile `syntax:pattern`.
    ///
    /// Fails with `InvalidArgument` for a missing or unknown syntax, or a
    /// pattern that does not compile.
    pub fn new(syntax_and_pattern: &str) -> VfsResult<Self> {
        let (syntax, pattern) = syntax_and_pattern.split_once(':').ok_or_else(|| {
            VfsError::invalid_argument(format!(
                "{:?} is not of the form syntax:pattern",
                syntax_and_pattern
            ))
        })?;

        let syntax = match syntax {
            "glob" => Syntax::Glob(Pattern::new(pattern).map_err(|e| {
                VfsError::invalid_argument(format!("bad glob {:?}: {}", pattern, e))
            })?),
            // Anchored: the whole path must match.
            "regex" => Syntax::Regex(Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| {
                VfsError::invalid_argument(format!("bad regex {:?}: {}", pattern, e))
            })?),
            other => {
                return Err(VfsError::invalid_argument(format!(
                    "unknown pattern syntax {:?}",
                    other
                )));
            }
        };
        Ok(Self { syntax })
    }

    /// Whether `path` matches.
    pub fn matches(&self, path: &VirtualPath) -> bool {
        let text = path.to_string();
        match &self.syntax {
            Syntax::Glob(pattern) => pattern.matches_with(&text, GLOB_OPTIONS),
            Syntax::Regex(regex) => regex.is_match(&text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::Mount;
    use tempfile::TempDir;

    #[test]
    fn test_glob() {
        let dir = TempDir::new().unwrap();
        let m = Mount::new(dir.path(), false).unwrap();

        let top = PathMatcher::new("glob:/*.txt").unwrap();
        assert!(top.matches(&m.path("/a.txt")));
        assert!(!top.matches(&m.path("/d/a.txt")));
        assert!(!top.matches(&m.path("/a.log")));

        let deep = PathMatcher::new("glob:/src/**/*.rs").unwrap();
        assert!(deep.matches(&m.path("/src/a/b.rs")));
        assert!(!deep.matches(&m.path("/docs/a.rs")));
    }

    #[test]
    fn test_glob_matches_normalized_form() {
        let dir = TempDir::new().unwrap();
        let m = Mount::new(dir.path(), false).unwrap();
        let matcher = PathMatcher::new("glob:/etc/passwd").unwrap();
        assert!(matcher.matches(&m.path("/../../etc/./passwd")));
    }

    #[test]
    fn test_regex_is_anchored() {
        let dir = TempDir::new().unwrap();
        let m = Mount::new(dir.path(), false).unwrap();

        let matcher = PathMatcher::new("regex:/logs/[0-9]+\\.log").unwrap();
        assert!(matcher.matches(&m.path("/logs/42.log")));
        assert!(!matcher.matches(&m.path("/logs/42.log.bak")));
        assert!(!matcher.matches(&m.path("/x/logs/42.log")));
    }

    #[test]
    fn test_bad_patterns() {
        for bad in ["*.txt", "shell:*.txt", "glob:[", "regex:("] {
            let err = PathMatcher::new(bad).unwrap_err();
            assert!(matches!(err, VfsError::InvalidArgument(_)), "{}", bad);
        }
    }
}
