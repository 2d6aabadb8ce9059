//! Bulk search backend.
//!
//! Content search goes through a single [`HostSearch`] query instead of
//! opening every candidate. Plain enumeration and path mapping still go
//! through the [`FallbackStrategy`]: bulk enumeration APIs are known to
//! return partial listings on large trees, and correctness wins over speed.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use super::fallback::FallbackStrategy;
use super::host::{HostSearch, TextSearchMatch, TextSearchQuery};
use super::merge::MergeBuffer;
use super::SearchStrategy;
use crate::mapping::manifest::resolve_manifests;
use crate::mapping::path_mapping::PathMapping;
use crate::metadata::{MetadataBuilder, SourceMapMetadata};
use crate::options::DiscoveryOptions;
use crate::source::filter::absolute;
use crate::source::GlobList;
use crate::Result;

/// Strategy backed by a host bulk search.
#[derive(Clone)]
pub struct CapableStrategy {
    host: Arc<dyn HostSearch>,
    fallback: FallbackStrategy,
    builder: Arc<dyn MetadataBuilder>,
    options: DiscoveryOptions,
}

impl CapableStrategy {
    pub fn new(
        host: Arc<dyn HostSearch>,
        builder: Arc<dyn MetadataBuilder>,
        options: DiscoveryOptions,
    ) -> Self {
        Self {
            host,
            fallback: FallbackStrategy::new(builder.clone(), options.clone()),
            builder,
            options,
        }
    }
}

impl SearchStrategy for CapableStrategy {
    fn list_files(&self, files: &GlobList) -> Result<Vec<PathBuf>> {
        self.fallback.list_files(files)
    }

    fn find_by_path_mapping(
        &self,
        mapping: &PathMapping,
        pattern: &str,
    ) -> Result<Vec<SourceMapMetadata>> {
        self.fallback.find_by_path_mapping(mapping, pattern)
    }

    fn find_by_source_map_comment(&self, files: &GlobList) -> Result<Vec<SourceMapMetadata>> {
        let root = absolute(files.root())?;
        let mut buffer = MergeBuffer::new();

        self.host.find_text_in_files(
            &TextSearchQuery::source_mapping_url(),
            &files.projection(),
            &mut |found: TextSearchMatch| {
                let path = if found.path.is_absolute() {
                    found.path
                } else {
                    root.join(found.path)
                };
                buffer.record_inline(path, found.line);
            },
        )?;
        debug!(matches = buffer.len(), root = %root.display(), "bulk search complete");

        buffer.overlay_manifest(resolve_manifests(&root)?);

        buffer
            .freeze()
            .build_all(self.builder.as_ref(), self.options.concurrency)
    }
}
