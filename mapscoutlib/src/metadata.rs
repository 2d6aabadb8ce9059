//! Source map metadata records and the builder that produces them.
//!
//! Every discovery mode funnels into a [`MetadataBuilder`]: inline comments
//! found by a search backend, synthesized comment lines from lookup
//! manifests, and so on. The builder only locates the map reference; it
//! never opens or parses the map itself.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;
use std::time::UNIX_EPOCH;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::MapScoutError;
use crate::Result;

/// Literal text that marks a source map reference.
pub const SOURCE_MAPPING_URL: &str = "sourceMappingURL";

/// `mtime` value for records whose compiled file is not tracked.
pub const UNTRACKED_MTIME: i64 = -1;

static COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?://|/\*)\s*[#@]\s*sourceMappingURL=([^\s'"]*)"#).unwrap()
});

static SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]+:").unwrap());

/// One compiled file and the source map it points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMapMetadata {
    /// Absolute path of the compiled file
    pub compiled_path: PathBuf,
    /// Modification time in milliseconds since the epoch, or [`UNTRACKED_MTIME`]
    pub mtime: i64,
    /// Absolute path or URL of the source map
    pub source_map_url: String,
}

impl SourceMapMetadata {
    pub fn new(compiled_path: impl Into<PathBuf>, mtime: i64, url: impl Into<String>) -> Self {
        Self {
            compiled_path: compiled_path.into(),
            mtime,
            source_map_url: url.into(),
        }
    }

    /// A record whose modification time is not tracked.
    pub fn untracked(compiled_path: impl Into<PathBuf>, url: impl Into<String>) -> Self {
        Self::new(compiled_path, UNTRACKED_MTIME, url)
    }

    pub fn is_mtime_tracked(&self) -> bool {
        self.mtime != UNTRACKED_MTIME
    }
}

/// Turns a compiled file plus text mentioning its map into a record.
///
/// `text` may be the whole file or just the line holding the reference.
/// Returns `Ok(None)` when no reference is present; an `Err` means the
/// reference exists but is unusable, which callers log and skip.
pub trait MetadataBuilder: Send + Sync {
    fn build(&self, compiled_path: &Path, text: &str) -> Result<Option<SourceMapMetadata>>;
}

/// The line form used for references that don't come from the file itself.
pub fn source_mapping_comment(url: &str) -> String {
    format!("//# {SOURCE_MAPPING_URL}={url}")
}

/// Extract the raw URL of the last `sourceMappingURL` comment in `text`.
pub fn find_source_mapping_url(text: &str) -> Option<&str> {
    let captures = COMMENT.captures_iter(text).last()?;
    let raw = captures.get(1)?.as_str();
    let raw = raw.strip_suffix("*/").unwrap_or(raw);
    if raw.is_empty() {
        None
    } else {
        Some(raw)
    }
}

/// Default builder: reads `//# sourceMappingURL=` style comments.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommentMetadataBuilder;

impl CommentMetadataBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a raw reference against the compiled file that holds it.
    pub fn resolve_url(&self, compiled_path: &Path, raw: &str) -> Result<String> {
        let invalid = |reason: String| MapScoutError::InvalidSourceMapUrl {
            path: compiled_path.to_path_buf(),
            url: raw.to_string(),
            reason,
        };

        if let Some(rest) = raw.strip_prefix("data:") {
            if !rest.contains(',') {
                return Err(invalid("data URI has no ',' separator".to_string()));
            }
            return Ok(raw.to_string());
        }

        if let Some(rest) = raw.strip_prefix("file://") {
            let decoded = urlencoding::decode(rest).map_err(|e| invalid(e.to_string()))?;
            return Ok(normalize_lexically(Path::new(decoded.as_ref()))
                .to_string_lossy()
                .into_owned());
        }

        if SCHEME.is_match(raw) {
            return Ok(raw.to_string());
        }

        let decoded = urlencoding::decode(raw).map_err(|e| invalid(e.to_string()))?;
        let target = Path::new(decoded.as_ref());
        let resolved = if target.is_absolute() {
            target.to_path_buf()
        } else {
            compiled_path
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join(target)
        };

        Ok(normalize_lexically(&resolved).to_string_lossy().into_owned())
    }
}

impl MetadataBuilder for CommentMetadataBuilder {
    fn build(&self, compiled_path: &Path, text: &str) -> Result<Option<SourceMapMetadata>> {
        let Some(raw) = find_source_mapping_url(text) else {
            return Ok(None);
        };

        let url = self.resolve_url(compiled_path, raw)?;
        let mtime = modified_millis(compiled_path)?;

        Ok(Some(SourceMapMetadata::new(compiled_path, mtime, url)))
    }
}

/// Modification time of `path` in milliseconds since the epoch.
pub fn modified_millis(path: &Path) -> Result<i64> {
    let meta = fs::metadata(path).map_err(|source| MapScoutError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    // Platforms without modification times fall back to untracked
    let millis = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(UNTRACKED_MTIME, |d| d.as_millis() as i64);

    Ok(millis)
}

/// Fold `.` and `..` components without touching the filesystem.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
