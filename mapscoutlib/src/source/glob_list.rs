//! Candidate file sets expressed as a root plus include/exclude globs.
//!
//! A [`GlobList`] is how callers describe "the compiled files worth looking
//! at". Patterns are relative to the root; a leading `!` turns a pattern
//! into an exclusion. Pattern order never changes which files match.
//!
//! Search backends don't consume a `GlobList` directly. They receive a
//! [`SearchProjection`], which splits the patterns into include and exclude
//! sets with POSIX separators and switches off every implicit filter
//! (ignore files, default excludes, symlink skipping).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Glob used when a list has no include patterns.
pub const MATCH_ALL: &str = "**/*";

/// An ordered root path plus glob patterns, `!`-prefixed ones excluded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobList {
    /// Directory all patterns are relative to
    pub root_path: PathBuf,
    /// Include patterns and `!`-prefixed exclude patterns
    pub patterns: Vec<String>,
}

impl GlobList {
    /// Create a glob list rooted at `root`.
    pub fn new<I, S>(root: impl Into<PathBuf>, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            root_path: root.into(),
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }

    /// Root directory of the list.
    pub fn root(&self) -> &Path {
        &self.root_path
    }

    /// Patterns that select files, in declaration order.
    pub fn includes(&self) -> impl Iterator<Item = &str> {
        self.patterns
            .iter()
            .map(String::as_str)
            .filter(|p| !p.starts_with('!'))
    }

    /// Exclusion patterns with their leading `!` stripped.
    pub fn excludes(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().filter_map(|p| p.strip_prefix('!'))
    }

    /// Project the list into the form search backends consume.
    pub fn projection(&self) -> SearchProjection {
        SearchProjection {
            root: self.root_path.clone(),
            includes: self.includes().map(normalize_separators).collect(),
            excludes: self.excludes().map(normalize_separators).collect(),
            use_ignore_files: false,
            use_default_excludes: false,
            follow_symlinks: true,
        }
    }
}

/// Include/exclude view of a [`GlobList`] handed to search backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchProjection {
    /// Directory the globs are relative to
    pub root: PathBuf,
    /// Include globs, forward-slash separated
    pub includes: Vec<String>,
    /// Exclude globs, `!` stripped, forward-slash separated
    pub excludes: Vec<String>,
    /// Whether the backend may honour `.gitignore`-style files
    pub use_ignore_files: bool,
    /// Whether the backend may apply its own default excludes
    pub use_default_excludes: bool,
    /// Whether symbolic links are traversed
    pub follow_symlinks: bool,
}

impl SearchProjection {
    /// Comma-joined include patterns.
    pub fn include_expr(&self) -> String {
        self.includes.join(",")
    }

    /// Comma-joined exclude patterns (empty when nothing is excluded).
    pub fn exclude_expr(&self) -> String {
        self.excludes.join(",")
    }

    /// The include set as one glob, using brace alternation when needed.
    pub fn include_glob(&self) -> String {
        alternation(&self.includes).unwrap_or_else(|| MATCH_ALL.to_string())
    }

    /// The exclude set as one glob, if anything is excluded.
    pub fn exclude_glob(&self) -> Option<String> {
        alternation(&self.excludes)
    }
}

fn alternation(patterns: &[String]) -> Option<String> {
    match patterns {
        [] => None,
        [single] => Some(single.clone()),
        many => Some(format!("{{{}}}", many.join(","))),
    }
}

/// Rewrite `\` separators as `/`.
pub fn normalize_separators(pattern: &str) -> String {
    pattern.replace('\\', "/")
}
