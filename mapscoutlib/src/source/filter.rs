//! File filtering and discovery with glob pattern support.
//!
//! This module walks a directory tree and keeps the files whose path,
//! relative to the walk root and written with `/` separators, matches the
//! include/exclude globs of a [`GlobList`]. Every backend compiles its
//! globs here, so `{a,b}` alternation and `**` mean the same thing whichever
//! backend runs.

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use walkdir::WalkDir;

use crate::error::MapScoutError;
use crate::metadata::normalize_lexically;
use crate::source::glob_list::{normalize_separators, GlobList};
use crate::Result;

/// Compiled include/exclude matcher.
///
/// `*` stops at `/`, `**` spans directories and dotfiles are not special.
#[derive(Debug, Clone, Default)]
pub struct GlobFilter {
    /// Glob patterns to include (if empty, include every file)
    pub include: Vec<GlobMatcher>,
    /// Glob patterns to exclude
    pub exclude: Vec<GlobMatcher>,
    /// Directory patterns derived from `<dir>/**` excludes, used to prune walks
    prune: Vec<GlobMatcher>,
}

impl GlobFilter {
    /// Create a new empty filter (includes every file).
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile every pattern of a glob list.
    pub fn from_glob_list(list: &GlobList) -> Result<Self> {
        Self::from_patterns(list.includes(), list.excludes())
    }

    /// Compile include patterns and `!`-stripped exclude patterns.
    pub fn from_patterns<I, E>(includes: I, excludes: E) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        let mut filter = Self::new();
        for pattern in includes {
            filter = filter.include(pattern.as_ref())?;
        }
        for pattern in excludes {
            filter = filter.exclude(pattern.as_ref())?;
        }
        Ok(filter)
    }

    /// Add an include pattern.
    pub fn include(mut self, pattern: &str) -> Result<Self> {
        self.include.push(compile(pattern)?);
        Ok(self)
    }

    /// Add an exclude pattern.
    pub fn exclude(mut self, pattern: &str) -> Result<Self> {
        let normalized = normalize_separators(pattern);
        if let Some(dir) = normalized.strip_suffix("/**") {
            if !dir.is_empty() {
                self.prune.push(compile(dir)?);
            }
        }
        self.exclude.push(compile(&normalized)?);
        Ok(self)
    }

    /// Check a root-relative, `/`-separated path against the filter.
    ///
    /// A path matches if it matches no exclude pattern and at least one
    /// include pattern (or there are no include patterns).
    pub fn matches(&self, relative: &str) -> bool {
        if self.exclude.iter().any(|m| m.is_match(relative)) {
            return false;
        }

        self.include.is_empty() || self.include.iter().any(|m| m.is_match(relative))
    }

    /// Whether every file below this root-relative directory is excluded.
    pub fn prunes_dir(&self, relative: &str) -> bool {
        self.prune.iter().any(|m| m.is_match(relative))
    }
}

fn compile(pattern: &str) -> Result<GlobMatcher> {
    let normalized = normalize_separators(pattern);
    GlobBuilder::new(&normalized)
        .literal_separator(true)
        .backslash_escape(false)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|e| MapScoutError::InvalidGlob {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
}

/// Render `path` relative to `root` with `/` separators.
pub fn relative_slash_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    Some(parts.join("/"))
}

/// The path a candidate is matched by: root-relative, or the bare file
/// name when the walk root is the file itself.
pub(crate) fn candidate_path(root: &Path, path: &Path) -> Option<String> {
    if path == root {
        return path.file_name().map(|n| n.to_string_lossy().into_owned());
    }
    relative_slash_path(root, path)
}

/// Make `path` absolute against the current directory and fold `.` and `..`
/// without resolving links, so every walk reports paths in one spelling.
pub(crate) fn absolute(path: &Path) -> Result<PathBuf> {
    Ok(normalize_lexically(&std::path::absolute(path)?))
}

/// Discover files below `root` that pass `filter`.
///
/// Symbolic links are followed. Any traversal error fails the whole call,
/// since a partial listing cannot be trusted as complete.
pub fn discover_files(root: impl AsRef<Path>, filter: &GlobFilter) -> Result<Vec<PathBuf>> {
    let root = absolute(root.as_ref())?;

    if !root.exists() {
        return Err(MapScoutError::PathNotFound(root));
    }

    let mut files = Vec::new();

    if root.is_file() {
        if candidate_path(&root, &root).is_some_and(|name| filter.matches(&name)) {
            files.push(root);
        }
        return Ok(files);
    }

    let walker = WalkDir::new(&root).follow_links(true).into_iter();

    for entry in walker.filter_entry(|e| {
        // Always include the root directory
        if e.depth() == 0 || !e.file_type().is_dir() {
            return true;
        }
        relative_slash_path(&root, e.path()).is_none_or(|rel| !filter.prunes_dir(&rel))
    }) {
        let entry = entry.map_err(|e| MapScoutError::walk(&root, e))?;

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if relative_slash_path(&root, path).is_some_and(|rel| filter.matches(&rel)) {
            files.push(path.to_path_buf());
        }
    }

    // Sort for deterministic output
    files.sort();

    Ok(files)
}
