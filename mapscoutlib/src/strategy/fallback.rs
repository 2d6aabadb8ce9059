//! Direct filesystem backend.
//!
//! Works everywhere: walk the tree with `walkdir`, read each candidate and
//! pick out its `sourceMappingURL` line locally. Slower than a bulk search
//! on large trees, but exhaustive.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::warn;

use super::merge::MergeBuffer;
use super::SearchStrategy;
use crate::error::MapScoutError;
use crate::mapping::manifest::resolve_manifests;
use crate::mapping::path_mapping::{self, PathMapping};
use crate::metadata::{MetadataBuilder, SourceMapMetadata, SOURCE_MAPPING_URL};
use crate::options::DiscoveryOptions;
use crate::source::{discover_files, GlobFilter, GlobList};
use crate::Result;

/// Strategy that reads every candidate file itself.
#[derive(Clone)]
pub struct FallbackStrategy {
    builder: Arc<dyn MetadataBuilder>,
    options: DiscoveryOptions,
}

impl FallbackStrategy {
    pub fn new(builder: Arc<dyn MetadataBuilder>, options: DiscoveryOptions) -> Self {
        Self { builder, options }
    }

    /// Read one candidate and return its last `sourceMappingURL` line.
    ///
    /// Unreadable files are logged and skipped.
    fn read_reference(path: PathBuf) -> Option<(PathBuf, String)> {
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(source) => {
                let err = MapScoutError::FileRead {
                    path: path.clone(),
                    source,
                };
                warn!(path = %path.display(), error = %err, "skipping unreadable candidate");
                return None;
            }
        };

        let text = String::from_utf8_lossy(&bytes);
        last_reference_line(&text).map(|line| (path, line.to_string()))
    }
}

/// The last line of `text` mentioning `sourceMappingURL`.
pub fn last_reference_line(text: &str) -> Option<&str> {
    let at = text.rfind(SOURCE_MAPPING_URL)?;
    let start = text[..at].rfind('\n').map_or(0, |i| i + 1);
    let end = text[at..].find('\n').map_or(text.len(), |i| at + i);
    Some(text[start..end].trim_end_matches('\r'))
}

impl SearchStrategy for FallbackStrategy {
    fn list_files(&self, files: &GlobList) -> Result<Vec<PathBuf>> {
        let filter = GlobFilter::from_glob_list(files)?;
        discover_files(files.root(), &filter)
    }

    fn find_by_path_mapping(
        &self,
        mapping: &PathMapping,
        pattern: &str,
    ) -> Result<Vec<SourceMapMetadata>> {
        path_mapping::find_by_path_mapping(mapping, pattern)
    }

    fn find_by_source_map_comment(&self, files: &GlobList) -> Result<Vec<SourceMapMetadata>> {
        let candidates = self.list_files(files)?;

        let references = self.options.concurrency.install(|| {
            candidates
                .into_par_iter()
                .filter_map(Self::read_reference)
                .collect::<Vec<_>>()
        })?;

        let mut buffer = MergeBuffer::new();
        for (path, line) in references {
            buffer.record_inline(path, line);
        }
        buffer.overlay_manifest(resolve_manifests(files.root())?);

        buffer
            .freeze()
            .build_all(self.builder.as_ref(), self.options.concurrency)
    }
}
