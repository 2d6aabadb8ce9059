//! Lookup manifests: out-of-band `*.source-maps.json` files.
//!
//! A manifest sits next to compiled output and maps file names, relative to
//! the manifest's own directory, to source map URLs:
//!
//! ```json
//! {
//!   "app.js": "app.js.map",
//!   "vendor/lib.js": { "sourceMappingURL": "https://cdn.example.com/lib.js.map" }
//! }
//! ```
//!
//! Entries are turned into the same `//# sourceMappingURL=` line an inline
//! comment would carry, so they go through the regular metadata builder.
//! A manifest that exists but does not parse is a configuration error and
//! fails the call.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Deserialize;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::MapScoutError;
use crate::metadata::{normalize_lexically, source_mapping_comment};
use crate::source::filter::absolute;
use crate::source::normalize_separators;
use crate::Result;

/// File name suffix identifying a lookup manifest.
pub const MANIFEST_SUFFIX: &str = ".source-maps.json";

/// Dependency directories never searched for manifests.
const VENDOR_DIRS: &[&str] = &["node_modules"];

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ManifestValue {
    Url(String),
    Object {
        #[serde(rename = "sourceMappingURL")]
        source_mapping_url: String,
    },
}

impl ManifestValue {
    fn into_url(self) -> String {
        match self {
            ManifestValue::Url(url) => url,
            ManifestValue::Object { source_mapping_url } => source_mapping_url,
        }
    }
}

/// One compiled file declared by a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Absolute path of the compiled file
    pub compiled_path: PathBuf,
    /// The URL exactly as written in the manifest
    pub source_map_url: String,
    /// Manifest that declared the entry
    pub manifest: PathBuf,
}

impl ManifestEntry {
    /// The comment line equivalent to this entry.
    pub fn comment_line(&self) -> String {
        source_mapping_comment(&self.source_map_url)
    }
}

/// Whether `path` names a lookup manifest.
pub fn is_manifest(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(MANIFEST_SUFFIX))
}

/// Find every manifest below `root`, skipping dependency directories.
pub fn find_manifests(root: &Path) -> Result<Vec<PathBuf>> {
    let root = absolute(root)?;

    if !root.exists() {
        return Err(MapScoutError::PathNotFound(root));
    }

    let walker = WalkDir::new(&root).follow_links(true).into_iter();
    let mut manifests = Vec::new();

    for entry in walker.filter_entry(|e| {
        e.depth() == 0
            || !e.file_type().is_dir()
            || !VENDOR_DIRS.iter().any(|d| e.file_name() == *d)
    }) {
        let entry = entry.map_err(|e| MapScoutError::walk(&root, e))?;
        if entry.file_type().is_file() && is_manifest(entry.path()) {
            manifests.push(entry.into_path());
        }
    }

    manifests.sort();
    Ok(manifests)
}

/// Parse one manifest into entries with absolute compiled paths.
pub fn read_manifest(path: &Path) -> Result<Vec<ManifestEntry>> {
    let content = fs::read_to_string(path).map_err(|source| MapScoutError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let parsed: BTreeMap<String, ManifestValue> =
        serde_json::from_str(&content).map_err(|source| MapScoutError::ManifestParse {
            path: path.to_path_buf(),
            source,
        })?;

    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    let entries: Vec<ManifestEntry> = parsed
        .into_iter()
        .map(|(name, value)| ManifestEntry {
            compiled_path: normalize_lexically(&dir.join(normalize_separators(&name))),
            source_map_url: value.into_url(),
            manifest: path.to_path_buf(),
        })
        .collect();

    debug!(manifest = %path.display(), entries = entries.len(), "loaded source map manifest");

    Ok(entries)
}

/// Collect the entries of every manifest below `root`.
///
/// Entries come back in manifest path order, so when two manifests name the
/// same compiled file the later one wins once overlaid.
pub fn resolve_manifests(root: &Path) -> Result<Vec<ManifestEntry>> {
    let manifests = find_manifests(root)?;

    let parsed = manifests
        .par_iter()
        .map(|path| read_manifest(path))
        .collect::<Result<Vec<_>>>()?;

    Ok(parsed.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_is_manifest() {
        assert!(is_manifest(Path::new("/out/.source-maps.json")));
        assert!(is_manifest(Path::new("/out/bundle.source-maps.json")));
        assert!(!is_manifest(Path::new("/out/source-maps.json")));
        assert!(!is_manifest(Path::new("/out/app.js.map")));
    }

    #[test]
    fn test_read_both_value_forms() {
        let temp = tempdir().unwrap();
        let manifest = temp.path().join(".source-maps.json");
        fs::write(
            &manifest,
            r#"{
                "app.js": "app.js.map",
                "lib/vendor.js": { "sourceMappingURL": "https://cdn.example.com/vendor.js.map" }
            }"#,
        )
        .unwrap();

        let entries = read_manifest(&manifest).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].compiled_path, temp.path().join("app.js"));
        assert_eq!(entries[0].source_map_url, "app.js.map");
        assert_eq!(entries[0].comment_line(), "//# sourceMappingURL=app.js.map");
        assert_eq!(entries[1].compiled_path, temp.path().join("lib/vendor.js"));
        assert_eq!(
            entries[1].source_map_url,
            "https://cdn.example.com/vendor.js.map"
        );
    }

    #[test]
    fn test_malformed_manifest_fails() {
        let temp = tempdir().unwrap();
        let manifest = temp.path().join("broken.source-maps.json");
        fs::write(&manifest, "{ \"app.js\": ").unwrap();

        let result = read_manifest(&manifest);

        assert!(matches!(result, Err(MapScoutError::ManifestParse { .. })));
    }

    #[test]
    fn test_wrong_value_type_fails() {
        let temp = tempdir().unwrap();
        let manifest = temp.path().join(".source-maps.json");
        fs::write(&manifest, r#"{ "app.js": 42 }"#).unwrap();

        assert!(matches!(
            read_manifest(&manifest),
            Err(MapScoutError::ManifestParse { .. })
        ));
    }

    #[test]
    fn test_find_skips_node_modules() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("out/nested")).unwrap();
        fs::create_dir_all(temp.path().join("node_modules/pkg")).unwrap();
        fs::write(temp.path().join("out/.source-maps.json"), "{}").unwrap();
        fs::write(temp.path().join("out/nested/x.source-maps.json"), "{}").unwrap();
        fs::write(
            temp.path().join("node_modules/pkg/.source-maps.json"),
            "{}",
        )
        .unwrap();

        let found = find_manifests(temp.path()).unwrap();

        assert_eq!(found.len(), 2);
        assert!(!found
            .iter()
            .any(|p| p.to_string_lossy().contains("node_modules")));
    }

    #[test]
    fn test_resolve_manifests_surfaces_broken_file() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join(".source-maps.json"), r#"{"a.js":"a.map"}"#).unwrap();
        fs::write(temp.path().join("bad.source-maps.json"), "not json").unwrap();

        let result = resolve_manifests(temp.path());

        assert!(matches!(result, Err(MapScoutError::ManifestParse { .. })));
    }

    #[test]
    fn test_resolve_manifests_in_order() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("b")).unwrap();
        fs::write(temp.path().join("a.source-maps.json"), r#"{"x.js":"one.map"}"#).unwrap();
        fs::write(temp.path().join("b/.source-maps.json"), r#"{"y.js":"two.map"}"#).unwrap();

        let entries = resolve_manifests(temp.path()).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].source_map_url, "one.map");
        assert_eq!(entries[1].compiled_path, temp.path().join("b/y.js"));
    }
}
