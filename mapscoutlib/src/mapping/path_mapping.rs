//! Directory-correspondence source locations.
//!
//! Some workspaces ship compiled files with no map at all; instead the
//! configuration says "everything under `local` mirrors `remote`". Each
//! matched file gets a `sourceMapUrl` formed by swapping the `local` prefix
//! of its absolute path for `remote`. Modification times are not tracked.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::trace;

use crate::metadata::SourceMapMetadata;
use crate::source::filter::absolute;
use crate::source::{discover_files, relative_slash_path, GlobFilter};
use crate::Result;

/// Local directory prefixes and their replacements, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathMapping {
    entries: Vec<(String, String)>,
}

impl PathMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pair. Re-inserting a directory replaces its value in place.
    pub fn insert(&mut self, local: impl Into<String>, remote: impl Into<String>) {
        let local = local.into();
        let remote = remote.into();
        match self.entries.iter_mut().find(|(l, _)| *l == local) {
            Some(existing) => existing.1 = remote,
            None => self.entries.push((local, remote)),
        }
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, local: impl Into<String>, remote: impl Into<String>) -> Self {
        self.insert(local, remote);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(l, r)| (l.as_str(), r.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve relative local directories against `base`.
    pub fn resolve_against(&self, base: &Path) -> Self {
        let entries = self
            .entries
            .iter()
            .map(|(local, remote)| {
                let local_path = Path::new(local);
                let local = if local_path.is_absolute() {
                    local.clone()
                } else {
                    base.join(local_path).to_string_lossy().into_owned()
                };
                (local, remote.clone())
            })
            .collect();
        Self { entries }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PathMapping {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut mapping = PathMapping::new();
        for (local, remote) in iter {
            mapping.insert(local, remote);
        }
        mapping
    }
}

impl Serialize for PathMapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (local, remote) in &self.entries {
            map.serialize_entry(local, remote)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PathMapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = PathMapping;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of local directories to source roots")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<PathMapping, A::Error> {
                let mut mapping = PathMapping::new();
                while let Some((local, remote)) = access.next_entry::<String, String>()? {
                    mapping.insert(local, remote);
                }
                Ok(mapping)
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

/// Swap the `local` directory prefix of `path` for `remote`.
///
/// Returns `None` when `path` is not below `local`.
pub fn substitute_prefix(path: &Path, local: &Path, remote: &str) -> Option<String> {
    let rest = relative_slash_path(local, path)?;
    if rest.is_empty() {
        return Some(remote.to_string());
    }

    let separator = if remote.contains('\\') && !remote.contains('/') {
        '\\'
    } else {
        '/'
    };
    let base = remote.trim_end_matches(['/', '\\']);
    let rest = if separator == '\\' {
        rest.replace('/', "\\")
    } else {
        rest
    };

    Some(format!("{base}{separator}{rest}"))
}

/// Correlate files below each mapped directory with their source location.
///
/// Directories are walked in parallel. When two pairs cover the same file,
/// the pair inserted first wins.
pub fn find_by_path_mapping(mapping: &PathMapping, pattern: &str) -> Result<Vec<SourceMapMetadata>> {
    let filter = GlobFilter::new().include(pattern)?;
    let pairs: Vec<(&str, &str)> = mapping.iter().collect();

    let batches = pairs
        .par_iter()
        .map(|(local, remote)| correlate_pair(Path::new(local), remote, &filter))
        .collect::<Result<Vec<_>>>()?;

    let mut seen = HashSet::new();
    let mut records = Vec::new();
    for meta in batches.into_iter().flatten() {
        if seen.insert(meta.compiled_path.clone()) {
            records.push(meta);
        }
    }

    Ok(records)
}

fn correlate_pair(local: &Path, remote: &str, filter: &GlobFilter) -> Result<Vec<SourceMapMetadata>> {
    let local: PathBuf = absolute(local)?;
    let files = discover_files(&local, filter)?;

    Ok(files
        .into_iter()
        .filter_map(|file| {
            let url = substitute_prefix(&file, &local, remote)?;
            trace!(compiled = %file.display(), url = %url, "path mapping");
            Some(SourceMapMetadata::untracked(file, url))
        })
        .collect())
}
