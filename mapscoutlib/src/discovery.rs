//! The discovery entry point.
//!
//! [`SourceMapDiscovery`] runs the capability probe once at construction and
//! keeps whichever backend it selected for its whole lifetime. Every
//! operation then goes through that backend.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::mapping::path_mapping::PathMapping;
use crate::metadata::{CommentMetadataBuilder, MetadataBuilder, SourceMapMetadata};
use crate::options::DiscoveryOptions;
use crate::source::GlobList;
use crate::strategy::merge::merge_preferring;
use crate::strategy::{
    probe_host_search, CapableStrategy, FallbackStrategy, HostSearch, SearchStrategy,
};
use crate::Result;

/// The backend selected by the capability probe.
#[derive(Clone)]
pub enum DiscoveryStrategy {
    /// A bulk search backend was available
    Capable(CapableStrategy),
    /// Direct filesystem access only
    Fallback(FallbackStrategy),
}

impl DiscoveryStrategy {
    pub fn is_capable(&self) -> bool {
        matches!(self, DiscoveryStrategy::Capable(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            DiscoveryStrategy::Capable(_) => "capable",
            DiscoveryStrategy::Fallback(_) => "fallback",
        }
    }

    fn as_search(&self) -> &dyn SearchStrategy {
        match self {
            DiscoveryStrategy::Capable(strategy) => strategy as &dyn SearchStrategy,
            DiscoveryStrategy::Fallback(strategy) => strategy,
        }
    }
}

impl fmt::Debug for DiscoveryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Inputs for [`SourceMapDiscovery::discover`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryRequest {
    /// Candidate compiled files for content search
    pub files: GlobList,
    /// Optional directory correspondence to correlate as well
    pub path_mapping: Option<PathMapping>,
}

impl DiscoveryRequest {
    pub fn new(files: GlobList) -> Self {
        Self {
            files,
            path_mapping: None,
        }
    }

    pub fn path_mapping(mut self, mapping: PathMapping) -> Self {
        self.path_mapping = Some(mapping);
        self
    }
}

/// Locates source maps for compiled files.
///
/// # Example
///
/// ```rust
/// use mapscoutlib::{DiscoveryOptions, GlobList, SourceMapDiscovery};
/// use std::fs;
/// use tempfile::tempdir;
///
/// let dir = tempdir().unwrap();
/// fs::write(dir.path().join("app.js"), "run();\n//# sourceMappingURL=app.js.map\n").unwrap();
///
/// let discovery = SourceMapDiscovery::new(DiscoveryOptions::new());
/// let records = discovery
///     .find_by_source_map_comment(&GlobList::new(dir.path(), ["**/*.js"]))
///     .unwrap();
///
/// assert_eq!(records.len(), 1);
/// assert!(records[0].source_map_url.ends_with("app.js.map"));
/// ```
#[derive(Debug, Clone)]
pub struct SourceMapDiscovery {
    strategy: DiscoveryStrategy,
    options: DiscoveryOptions,
}

impl SourceMapDiscovery {
    /// Create a discovery using the comment builder and the default probe.
    pub fn new(options: DiscoveryOptions) -> Self {
        let enabled = options.host_search;
        Self::with_probe(Arc::new(CommentMetadataBuilder), options, || {
            probe_host_search(enabled)
        })
    }

    /// Create a discovery with an explicit builder and capability probe.
    ///
    /// The probe is not consulted when `options.host_search` is off.
    pub fn with_probe<P>(
        builder: Arc<dyn MetadataBuilder>,
        options: DiscoveryOptions,
        probe: P,
    ) -> Self
    where
        P: FnOnce() -> Option<Arc<dyn HostSearch>>,
    {
        let host = if options.host_search { probe() } else { None };

        let strategy = match host {
            Some(host) => DiscoveryStrategy::Capable(CapableStrategy::new(
                host,
                builder,
                options.clone(),
            )),
            None => DiscoveryStrategy::Fallback(FallbackStrategy::new(builder, options.clone())),
        };
        debug!(strategy = strategy.name(), "selected discovery strategy");

        Self { strategy, options }
    }

    pub fn strategy(&self) -> &DiscoveryStrategy {
        &self.strategy
    }

    pub fn options(&self) -> &DiscoveryOptions {
        &self.options
    }

    /// Every file selected by `files`, sorted.
    pub fn list_files(&self, files: &GlobList) -> Result<Vec<PathBuf>> {
        self.strategy.as_search().list_files(files)
    }

    /// Path mapping correlation using the configured glob.
    pub fn find_by_path_mapping(&self, mapping: &PathMapping) -> Result<Vec<SourceMapMetadata>> {
        self.find_by_path_mapping_with(mapping, &self.options.path_mapping_glob)
    }

    pub fn find_by_path_mapping_with(
        &self,
        mapping: &PathMapping,
        pattern: &str,
    ) -> Result<Vec<SourceMapMetadata>> {
        self.strategy
            .as_search()
            .find_by_path_mapping(mapping, pattern)
    }

    /// Records for files with an inline reference or a manifest entry.
    pub fn find_by_source_map_comment(&self, files: &GlobList) -> Result<Vec<SourceMapMetadata>> {
        self.strategy.as_search().find_by_source_map_comment(files)
    }

    /// Content search plus optional path mapping, merged and sorted by
    /// compiled path. Content search records win on conflicts.
    pub fn discover(&self, request: &DiscoveryRequest) -> Result<Vec<SourceMapMetadata>> {
        let found = self.find_by_source_map_comment(&request.files)?;
        let mapped = match &request.path_mapping {
            Some(mapping) if !mapping.is_empty() => self.find_by_path_mapping(mapping)?,
            _ => Vec::new(),
        };

        let mut records = merge_preferring(found, mapped);
        records.sort_by(|a, b| a.compiled_path.cmp(&b.compiled_path));
        Ok(records)
    }
}

impl Default for SourceMapDiscovery {
    fn default() -> Self {
        Self::new(DiscoveryOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::UNTRACKED_MTIME;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn fallback() -> SourceMapDiscovery {
        SourceMapDiscovery::with_probe(
            Arc::new(CommentMetadataBuilder),
            DiscoveryOptions::new(),
            || None,
        )
    }

    #[cfg(feature = "host-search")]
    fn capable() -> SourceMapDiscovery {
        SourceMapDiscovery::with_probe(
            Arc::new(CommentMetadataBuilder),
            DiscoveryOptions::new(),
            || Some(Arc::new(crate::strategy::ParallelTextSearch::new()) as Arc<dyn HostSearch>),
        )
    }

    fn sorted(mut records: Vec<SourceMapMetadata>) -> Vec<SourceMapMetadata> {
        records.sort();
        records
    }

    /// A small build output tree with every kind of reference.
    fn build_tree(root: &Path) {
        fs::create_dir_all(root.join("dist/chunks")).unwrap();
        fs::create_dir_all(root.join("node_modules/dep")).unwrap();
        fs::write(
            root.join("dist/main.js"),
            "main();\n//# sourceMappingURL=main.js.map\n",
        )
        .unwrap();
        fs::write(
            root.join("dist/chunks/one.js"),
            "one();\n//@ sourceMappingURL=../maps/one.js.map\n",
        )
        .unwrap();
        fs::write(root.join("dist/chunks/two.js"), "two();\n").unwrap();
        fs::write(
            root.join("dist/remote.js"),
            "//# sourceMappingURL=https://cdn.example.com/remote.js.map",
        )
        .unwrap();
        fs::write(
            root.join("node_modules/dep/index.js"),
            "//# sourceMappingURL=index.js.map",
        )
        .unwrap();
    }

    fn out_files(root: &Path) -> GlobList {
        GlobList::new(root, ["**/*.js", "!**/node_modules/**"])
    }

    #[test]
    fn test_probe_skipped_when_disabled() {
        let mut probed = false;
        let discovery = SourceMapDiscovery::with_probe(
            Arc::new(CommentMetadataBuilder),
            DiscoveryOptions::new().without_host_search(),
            || {
                probed = true;
                None
            },
        );

        assert!(!probed);
        assert!(!discovery.strategy().is_capable());
        assert_eq!(discovery.strategy().name(), "fallback");
    }

    #[cfg(feature = "host-search")]
    #[test]
    fn test_probe_selects_capable() {
        assert!(capable().strategy().is_capable());
        assert!(SourceMapDiscovery::default().strategy().is_capable());
    }

    #[test]
    fn test_list_files() {
        let temp = tempdir().unwrap();
        build_tree(temp.path());

        let files = fallback().list_files(&out_files(temp.path())).unwrap();

        assert_eq!(
            files,
            vec![
                temp.path().join("dist/chunks/one.js"),
                temp.path().join("dist/chunks/two.js"),
                temp.path().join("dist/main.js"),
                temp.path().join("dist/remote.js"),
            ]
        );
    }

    #[test]
    fn test_find_by_source_map_comment() {
        let temp = tempdir().unwrap();
        build_tree(temp.path());

        let records = sorted(
            fallback()
                .find_by_source_map_comment(&out_files(temp.path()))
                .unwrap(),
        );

        let urls: Vec<_> = records.iter().map(|m| m.source_map_url.clone()).collect();
        assert_eq!(
            urls,
            vec![
                temp.path()
                    .join("dist/maps/one.js.map")
                    .to_string_lossy()
                    .into_owned(),
                temp.path()
                    .join("dist/main.js.map")
                    .to_string_lossy()
                    .into_owned(),
                "https://cdn.example.com/remote.js.map".to_string(),
            ]
        );
        assert!(records.iter().all(|m| m.is_mtime_tracked()));
    }

    #[test]
    fn test_idempotent() {
        let temp = tempdir().unwrap();
        build_tree(temp.path());
        let discovery = fallback();
        let files = out_files(temp.path());

        let first = sorted(discovery.find_by_source_map_comment(&files).unwrap());
        let second = sorted(discovery.find_by_source_map_comment(&files).unwrap());

        assert_eq!(first, second);
    }

    /// `out/app.js` with an inline comment and a conflicting manifest entry.
    fn conflicting_tree(root: &Path) -> PathBuf {
        let out = root.join("out");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("app.js"), "//# sourceMappingURL=inline.js.map\n").unwrap();
        fs::write(
            out.join(".source-maps.json"),
            r#"{ "app.js": { "sourceMappingURL": "declared.js.map" } }"#,
        )
        .unwrap();
        out
    }

    fn assert_manifest_wins(records: &[SourceMapMetadata], out: &Path) {
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].compiled_path, out.join("app.js"));
        assert_eq!(
            Path::new(&records[0].source_map_url),
            out.join("declared.js.map")
        );
    }

    #[test]
    fn test_manifest_takes_precedence() {
        let temp = tempdir().unwrap();
        let out = conflicting_tree(temp.path());

        let records = fallback()
            .find_by_source_map_comment(&GlobList::new(temp.path(), ["**/*.js"]))
            .unwrap();

        assert_manifest_wins(&records, &out);
    }

    #[cfg(feature = "host-search")]
    #[test]
    fn test_manifest_takes_precedence_over_bulk_search() {
        let temp = tempdir().unwrap();
        let out = conflicting_tree(temp.path());

        let records = capable()
            .find_by_source_map_comment(&GlobList::new(temp.path(), ["**/*.js"]))
            .unwrap();

        assert_manifest_wins(&records, &out);
    }

    #[test]
    fn test_parent_components_in_root_fold_into_one_record() {
        let temp = tempdir().unwrap();
        let out = conflicting_tree(temp.path());
        let files = GlobList::new(out.join("../out"), ["**/*.js"]);

        let records = fallback().find_by_source_map_comment(&files).unwrap();
        assert_manifest_wins(&records, &out);

        #[cfg(feature = "host-search")]
        {
            let records = capable().find_by_source_map_comment(&files).unwrap();
            assert_manifest_wins(&records, &out);
        }
    }

    #[test]
    fn test_manifest_resolution() {
        let temp = tempdir().unwrap();
        let out = temp.path().join("out");
        fs::create_dir_all(&out).unwrap();
        // No inline comment at all
        fs::write(out.join("app.js"), "app();\n").unwrap();
        fs::write(out.join(".source-maps.json"), r#"{ "app.js": "app.js.map" }"#).unwrap();

        let records = fallback()
            .find_by_source_map_comment(&GlobList::new(temp.path(), ["**/*.js"]))
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].compiled_path, out.join("app.js"));
        assert_eq!(Path::new(&records[0].source_map_url), out.join("app.js.map"));
    }

    #[test]
    fn test_malformed_manifest_fails() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("app.js"), "app();\n").unwrap();
        fs::write(temp.path().join("app.source-maps.json"), "{ not json").unwrap();

        let result = fallback().find_by_source_map_comment(&GlobList::new(temp.path(), ["**/*.js"]));

        assert!(matches!(
            result,
            Err(crate::MapScoutError::ManifestParse { .. })
        ));
    }

    #[test]
    fn test_partial_failure_tolerated() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("a.js"), "//# sourceMappingURL=a.js.map\n").unwrap();
        fs::write(
            temp.path().join("b.js"),
            "//# sourceMappingURL=data:application/json;base64\n",
        )
        .unwrap();
        fs::write(temp.path().join("c.js"), "//# sourceMappingURL=c.js.map\n").unwrap();

        let records = sorted(
            fallback()
                .find_by_source_map_comment(&GlobList::new(temp.path(), ["*.js"]))
                .unwrap(),
        );

        let paths: Vec<_> = records.iter().map(|m| m.compiled_path.clone()).collect();
        assert_eq!(
            paths,
            vec![temp.path().join("a.js"), temp.path().join("c.js")]
        );
    }

    #[cfg(feature = "host-search")]
    #[test]
    fn test_backends_agree() {
        let temp = tempdir().unwrap();
        build_tree(temp.path());
        fs::write(
            temp.path().join("dist/.source-maps.json"),
            r#"{ "chunks/two.js": "two.js.map" }"#,
        )
        .unwrap();
        let files = out_files(temp.path());

        let from_fallback = sorted(fallback().find_by_source_map_comment(&files).unwrap());
        let from_capable = sorted(capable().find_by_source_map_comment(&files).unwrap());

        assert_eq!(from_fallback.len(), 4);
        assert_eq!(from_fallback, from_capable);
    }

    #[cfg(feature = "host-search")]
    #[test]
    fn test_backends_agree_on_brace_patterns() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("a.mjs"), "//# sourceMappingURL=a.mjs.map\n").unwrap();
        fs::write(temp.path().join("b.js"), "//# sourceMappingURL=b.js.map\n").unwrap();
        fs::write(temp.path().join("c.ts"), "//# sourceMappingURL=c.ts.map\n").unwrap();
        let files = GlobList::new(temp.path(), ["**/*.{js,mjs}"]);

        let from_fallback = sorted(fallback().find_by_source_map_comment(&files).unwrap());
        let from_capable = sorted(capable().find_by_source_map_comment(&files).unwrap());

        assert_eq!(from_fallback.len(), 2);
        assert_eq!(from_fallback, from_capable);
    }

    #[cfg(feature = "host-search")]
    #[test]
    fn test_backends_agree_on_file_root() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("a.js");
        fs::write(&file, "a();\n//# sourceMappingURL=a.js.map\n").unwrap();
        let files = GlobList::new(&file, ["**/*.js"]);

        let from_fallback = fallback().find_by_source_map_comment(&files).unwrap();
        let from_capable = capable().find_by_source_map_comment(&files).unwrap();

        assert_eq!(from_fallback.len(), 1);
        assert_eq!(from_fallback, from_capable);
    }

    #[test]
    fn test_path_mapping() {
        let temp = tempdir().unwrap();
        let out = temp.path().join("out");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("app.js"), "app();\n").unwrap();

        let mapping = PathMapping::new().with(out.to_string_lossy(), "/src-remote");
        let records = fallback().find_by_path_mapping(&mapping).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].compiled_path, out.join("app.js"));
        assert_eq!(records[0].source_map_url, "/src-remote/app.js");
        assert_eq!(records[0].mtime, UNTRACKED_MTIME);
    }

    #[test]
    fn test_discover_prefers_content_search() {
        let temp = tempdir().unwrap();
        build_tree(temp.path());
        let dist = temp.path().join("dist");

        let request = DiscoveryRequest::new(out_files(temp.path()))
            .path_mapping(PathMapping::new().with(dist.to_string_lossy(), "/remote"));
        let records = fallback().discover(&request).unwrap();

        let paths: Vec<_> = records.iter().map(|m| m.compiled_path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                dist.join("chunks/one.js"),
                dist.join("chunks/two.js"),
                dist.join("main.js"),
                dist.join("remote.js"),
            ]
        );

        // Only two.js lacks a comment, so only it comes from the mapping
        let mapped: Vec<_> = records.iter().filter(|m| !m.is_mtime_tracked()).collect();
        assert_eq!(mapped.len(), 1);
        assert_eq!(mapped[0].source_map_url, "/remote/chunks/two.js");
    }

    #[test]
    fn test_discover_without_mapping() {
        let temp = tempdir().unwrap();
        build_tree(temp.path());

        let records = fallback()
            .discover(&DiscoveryRequest::new(out_files(temp.path())))
            .unwrap();

        assert_eq!(records.len(), 3);
        assert!(records
            .windows(2)
            .all(|pair| pair[0].compiled_path < pair[1].compiled_path));
    }
}
