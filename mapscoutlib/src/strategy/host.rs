//! Bulk text search offered by the host environment.
//!
//! Some environments can search the contents of many files in one request
//! (an indexing service, an editor's workspace search, a bundled parallel
//! scanner). [`HostSearch`] is the seam those backends plug into, and
//! [`probe_host_search`] is the default capability probe.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::metadata::SOURCE_MAPPING_URL;
use crate::source::SearchProjection;
use crate::Result;

/// What to look for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSearchQuery {
    /// Literal text to find
    pub pattern: String,
    pub case_sensitive: bool,
    /// Lines of context around each match (`0` = the matching line only)
    pub context_lines: usize,
}

impl TextSearchQuery {
    /// The query used for inline source map comments.
    pub fn source_mapping_url() -> Self {
        Self {
            pattern: SOURCE_MAPPING_URL.to_string(),
            case_sensitive: true,
            context_lines: 0,
        }
    }
}

/// One matching line reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSearchMatch {
    /// Absolute path of the file
    pub path: PathBuf,
    /// Text of the matching line, without its terminator
    pub line: String,
}

/// A multi-file content search backend.
///
/// Implementations search the files selected by `scope`, call `on_match`
/// once per matching line and return once every match was reported.
/// Backends must honour the projection as given: no ignore files, no
/// default excludes, symlinks followed.
pub trait HostSearch: Send + Sync {
    fn find_text_in_files(
        &self,
        query: &TextSearchQuery,
        scope: &SearchProjection,
        on_match: &mut dyn FnMut(TextSearchMatch),
    ) -> Result<()>;
}

/// Detect the bulk search capability of this build.
///
/// Returns the bundled parallel scanner when the `host-search` feature is
/// compiled in and `enabled` is set. Absence is a normal answer.
pub fn probe_host_search(enabled: bool) -> Option<Arc<dyn HostSearch>> {
    if !enabled {
        debug!("host search disabled by configuration");
        return None;
    }
    bundled()
}

#[cfg(feature = "host-search")]
fn bundled() -> Option<Arc<dyn HostSearch>> {
    Some(Arc::new(super::parallel_search::ParallelTextSearch::new()))
}

#[cfg(not(feature = "host-search"))]
fn bundled() -> Option<Arc<dyn HostSearch>> {
    debug!("built without the host-search feature");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_mapping_query() {
        let query = TextSearchQuery::source_mapping_url();

        assert_eq!(query.pattern, "sourceMappingURL");
        assert!(query.case_sensitive);
        assert_eq!(query.context_lines, 0);
    }

    #[test]
    fn test_probe_respects_disable() {
        assert!(probe_host_search(false).is_none());
    }

    #[cfg(feature = "host-search")]
    #[test]
    fn test_probe_finds_bundled_backend() {
        assert!(probe_host_search(true).is_some());
    }
}
