//! Merging references from several discovery modes into one answer.
//!
//! Content-search correlation runs in two phases:
//!
//! 1. A [`MergeBuffer`] collects `path → reference line` pairs, first from
//!    inline comments, then from lookup manifests. Manifest entries replace
//!    inline ones for the same path, never the other way round.
//! 2. [`MergeBuffer::freeze`] consumes the buffer and yields a
//!    [`FrozenMerge`], an immutable snapshot that the concurrent metadata
//!    build fan-out reads from.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{trace, warn};

use crate::mapping::manifest::ManifestEntry;
use crate::metadata::{normalize_lexically, MetadataBuilder, SourceMapMetadata};
use crate::options::Concurrency;
use crate::Result;

/// Where a reference line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceOrigin {
    /// A `sourceMappingURL` comment inside the compiled file
    InlineComment,
    /// An entry of a `*.source-maps.json` manifest
    Manifest,
}

/// A reference line waiting to be turned into metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub text: String,
    pub origin: ReferenceOrigin,
}

/// Write-only collection phase of a merge.
#[derive(Debug, Default)]
pub struct MergeBuffer {
    entries: HashMap<PathBuf, Reference>,
}

impl MergeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an inline comment line. A later line for the same file replaces
    /// an earlier one; manifest entries are never replaced.
    ///
    /// Paths are keyed with `.` and `..` folded, so `out/../out/a.js` and
    /// `out/a.js` are one file.
    pub fn record_inline(&mut self, path: PathBuf, line: String) {
        let path = normalize_lexically(&path);
        if self
            .entries
            .get(&path)
            .is_some_and(|r| r.origin == ReferenceOrigin::Manifest)
        {
            return;
        }
        self.entries.insert(
            path,
            Reference {
                text: line,
                origin: ReferenceOrigin::InlineComment,
            },
        );
    }

    /// Overlay manifest entries, replacing inline references.
    pub fn overlay_manifest(&mut self, entries: impl IntoIterator<Item = ManifestEntry>) {
        for entry in entries {
            let text = entry.comment_line();
            self.entries.insert(
                normalize_lexically(&entry.compiled_path),
                Reference {
                    text,
                    origin: ReferenceOrigin::Manifest,
                },
            );
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// End the collection phase.
    pub fn freeze(self) -> FrozenMerge {
        FrozenMerge {
            entries: self.entries.into_iter().collect(),
        }
    }
}

/// Read-only snapshot of merged references.
#[derive(Debug)]
pub struct FrozenMerge {
    entries: Vec<(PathBuf, Reference)>,
}

impl FrozenMerge {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, path: &Path) -> Option<&Reference> {
        self.entries
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, r)| r)
    }

    /// Build metadata for every entry concurrently.
    ///
    /// A per-file failure is logged at warning level and left out; it never
    /// affects the others. Any other error fails the call.
    pub fn build_all(
        &self,
        builder: &dyn MetadataBuilder,
        concurrency: Concurrency,
    ) -> Result<Vec<SourceMapMetadata>> {
        let built = concurrency.install(|| {
            self.entries
                .par_iter()
                .map(|(path, reference)| match builder.build(path, &reference.text) {
                    Ok(Some(meta)) => {
                        trace!(
                            compiled = %meta.compiled_path.display(),
                            url = %meta.source_map_url,
                            origin = ?reference.origin,
                            "resolved source map"
                        );
                        Ok(Some(meta))
                    }
                    Ok(None) => Ok(None),
                    Err(err) if err.is_recoverable() => {
                        warn!(
                            path = %path.display(),
                            origin = ?reference.origin,
                            error = %err,
                            "skipping unusable source map reference"
                        );
                        Ok(None)
                    }
                    Err(err) => Err(err),
                })
                .collect::<Result<Vec<_>>>()
        })??;

        Ok(built.into_iter().flatten().collect())
    }
}

/// Combine records from two modes, keeping `primary` on conflicts.
pub fn merge_preferring(
    primary: Vec<SourceMapMetadata>,
    secondary: Vec<SourceMapMetadata>,
) -> Vec<SourceMapMetadata> {
    let taken: HashSet<PathBuf> = primary.iter().map(|m| m.compiled_path.clone()).collect();
    let mut merged = primary;
    merged.extend(
        secondary
            .into_iter()
            .filter(|m| !taken.contains(&m.compiled_path)),
    );
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MapScoutError;
    use crate::metadata::find_source_mapping_url;

    /// Builder that needs no filesystem: fails on URLs containing "corrupt".
    struct StubBuilder;

    impl MetadataBuilder for StubBuilder {
        fn build(&self, path: &Path, text: &str) -> Result<Option<SourceMapMetadata>> {
            let Some(url) = find_source_mapping_url(text) else {
                return Ok(None);
            };
            if url.contains("broken-disk") {
                return Err(MapScoutError::Io(std::io::Error::other("disk gone")));
            }
            if url.contains("corrupt") {
                return Err(MapScoutError::InvalidSourceMapUrl {
                    path: path.to_path_buf(),
                    url: url.to_string(),
                    reason: "corrupt".to_string(),
                });
            }
            Ok(Some(SourceMapMetadata::new(path, 1, url)))
        }
    }

    fn manifest_entry(path: &str, url: &str) -> ManifestEntry {
        ManifestEntry {
            compiled_path: PathBuf::from(path),
            source_map_url: url.to_string(),
            manifest: PathBuf::from("/out/.source-maps.json"),
        }
    }

    #[test]
    fn test_last_inline_line_wins() {
        let mut buffer = MergeBuffer::new();
        buffer.record_inline("/out/a.js".into(), "//# sourceMappingURL=one.map".into());
        buffer.record_inline("/out/a.js".into(), "//# sourceMappingURL=two.map".into());

        let frozen = buffer.freeze();
        assert_eq!(frozen.len(), 1);
        assert_eq!(
            frozen.get(Path::new("/out/a.js")).unwrap().text,
            "//# sourceMappingURL=two.map"
        );
    }

    #[test]
    fn test_manifest_overrides_inline() {
        let mut buffer = MergeBuffer::new();
        buffer.record_inline("/out/a.js".into(), "//# sourceMappingURL=inline.map".into());
        buffer.overlay_manifest(vec![manifest_entry("/out/a.js", "manifest.map")]);
        // Inline lines arriving late must not displace the manifest
        buffer.record_inline("/out/a.js".into(), "//# sourceMappingURL=late.map".into());

        let frozen = buffer.freeze();
        let reference = frozen.get(Path::new("/out/a.js")).unwrap();
        assert_eq!(reference.origin, ReferenceOrigin::Manifest);
        assert_eq!(reference.text, "//# sourceMappingURL=manifest.map");
    }

    #[test]
    fn test_manifest_overrides_differently_spelled_path() {
        let mut buffer = MergeBuffer::new();
        buffer.record_inline(
            "/out/../out/./a.js".into(),
            "//# sourceMappingURL=inline.map".into(),
        );
        buffer.overlay_manifest(vec![manifest_entry("/out/a.js", "declared.map")]);

        let frozen = buffer.freeze();
        assert_eq!(frozen.len(), 1);
        let reference = frozen.get(Path::new("/out/a.js")).unwrap();
        assert_eq!(reference.origin, ReferenceOrigin::Manifest);
        assert_eq!(reference.text, "//# sourceMappingURL=declared.map");
    }

    #[test]
    fn test_build_all_skips_failures() {
        let mut buffer = MergeBuffer::new();
        buffer.record_inline("/out/a.js".into(), "//# sourceMappingURL=a.map".into());
        buffer.record_inline("/out/b.js".into(), "//# sourceMappingURL=corrupt.map".into());
        buffer.record_inline("/out/c.js".into(), "//# sourceMappingURL=c.map".into());
        buffer.record_inline("/out/d.js".into(), "sourceMappingURL in a string".into());

        let mut records = buffer
            .freeze()
            .build_all(&StubBuilder, Concurrency::Unbounded)
            .unwrap();
        records.sort();

        let paths: Vec<_> = records.iter().map(|m| m.compiled_path.clone()).collect();
        assert_eq!(
            paths,
            vec![PathBuf::from("/out/a.js"), PathBuf::from("/out/c.js")]
        );
    }

    #[test]
    fn test_build_all_fails_on_unrecoverable_error() {
        let mut buffer = MergeBuffer::new();
        buffer.record_inline("/out/a.js".into(), "//# sourceMappingURL=a.map".into());
        buffer.record_inline("/out/b.js".into(), "//# sourceMappingURL=broken-disk.map".into());

        let result = buffer.freeze().build_all(&StubBuilder, Concurrency::Unbounded);

        assert!(matches!(result, Err(MapScoutError::Io(_))));
    }

    #[test]
    fn test_build_all_with_limit() {
        let mut buffer = MergeBuffer::new();
        for i in 0..20 {
            buffer.record_inline(
                format!("/out/{i}.js").into(),
                format!("//# sourceMappingURL={i}.map"),
            );
        }

        let records = buffer
            .freeze()
            .build_all(&StubBuilder, Concurrency::from_count(2))
            .unwrap();

        assert_eq!(records.len(), 20);
    }

    #[test]
    fn test_merge_preferring() {
        let primary = vec![SourceMapMetadata::new("/out/a.js", 5, "/out/a.js.map")];
        let secondary = vec![
            SourceMapMetadata::untracked("/out/a.js", "/remote/a.js"),
            SourceMapMetadata::untracked("/out/b.js", "/remote/b.js"),
        ];

        let merged = merge_preferring(primary, secondary);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].source_map_url, "/out/a.js.map");
        assert_eq!(merged[1].compiled_path, PathBuf::from("/out/b.js"));
    }
}
