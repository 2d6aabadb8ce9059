//! Search strategies: how candidate files are searched.
//!
//! Two interchangeable backends implement [`SearchStrategy`]:
//!
//! - **[`CapableStrategy`]**: content search through a host bulk search
//! - **[`FallbackStrategy`]**: direct filesystem walk and per-file reads
//!
//! Both share the [`merge`] policy (manifest entries beat inline comments,
//! per-file failures are logged and skipped) and path mapping correlation.

pub mod capable;
pub mod fallback;
pub mod host;
pub mod merge;
#[cfg(feature = "host-search")]
pub mod parallel_search;

use std::path::PathBuf;

use crate::mapping::path_mapping::PathMapping;
use crate::metadata::SourceMapMetadata;
use crate::source::GlobList;
use crate::Result;

pub use capable::CapableStrategy;
pub use fallback::FallbackStrategy;
pub use host::{probe_host_search, HostSearch, TextSearchMatch, TextSearchQuery};
pub use merge::{FrozenMerge, MergeBuffer, ReferenceOrigin};
#[cfg(feature = "host-search")]
pub use parallel_search::ParallelTextSearch;

/// The three discovery operations every backend provides.
pub trait SearchStrategy: Send + Sync {
    /// Every file selected by `files`.
    fn list_files(&self, files: &GlobList) -> Result<Vec<PathBuf>>;

    /// Records inferred from directory correspondence, one per file below a
    /// mapped directory that matches `pattern`.
    fn find_by_path_mapping(
        &self,
        mapping: &PathMapping,
        pattern: &str,
    ) -> Result<Vec<SourceMapMetadata>>;

    /// Records for files carrying a `sourceMappingURL` comment or listed in
    /// a lookup manifest below the root of `files`.
    fn find_by_source_map_comment(&self, files: &GlobList) -> Result<Vec<SourceMapMetadata>>;
}
