//! Bundled bulk search backend.
//!
//! Walks the projection root with the `ignore` crate's parallel walker
//! (every standard filter off), selects files with the same [`GlobFilter`]
//! the direct walk uses and scans their bytes with `memchr::memmem`. Matches are funnelled through a
//! channel and reported on the calling thread once the walk completes.

use std::fs;
use std::sync::mpsc;
use std::sync::Arc;

use ignore::{WalkBuilder, WalkState};
use memchr::{memchr, memmem, memrchr};
use tracing::debug;

use super::host::{HostSearch, TextSearchMatch, TextSearchQuery};
use crate::error::MapScoutError;
use crate::source::filter::{absolute, candidate_path};
use crate::source::{relative_slash_path, GlobFilter, SearchProjection};
use crate::Result;

/// Parallel content scanner used when no external host search exists.
#[derive(Debug, Clone, Default)]
pub struct ParallelTextSearch {
    /// Walker threads (`0` lets the walker decide)
    threads: usize,
}

impl ParallelTextSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }
}

impl HostSearch for ParallelTextSearch {
    fn find_text_in_files(
        &self,
        query: &TextSearchQuery,
        scope: &SearchProjection,
        on_match: &mut dyn FnMut(TextSearchMatch),
    ) -> Result<()> {
        let root = absolute(&scope.root)?;
        if !root.exists() {
            return Err(MapScoutError::PathNotFound(root));
        }

        let filter = Arc::new(GlobFilter::from_patterns(&scope.includes, &scope.excludes)?);

        let needle = if query.case_sensitive {
            query.pattern.as_bytes().to_vec()
        } else {
            query.pattern.to_ascii_lowercase().into_bytes()
        };

        let mut builder = WalkBuilder::new(&root);
        builder
            .standard_filters(false)
            .git_ignore(scope.use_ignore_files)
            .ignore(scope.use_ignore_files)
            .hidden(scope.use_default_excludes)
            .follow_links(scope.follow_symlinks)
            .threads(self.threads);

        let prune_root = root.clone();
        let prune = Arc::clone(&filter);
        builder.filter_entry(move |entry| {
            if entry.depth() == 0 || !entry.file_type().is_some_and(|t| t.is_dir()) {
                return true;
            }
            relative_slash_path(&prune_root, entry.path()).is_none_or(|rel| !prune.prunes_dir(&rel))
        });

        let (tx, rx) = mpsc::channel::<Result<TextSearchMatch>>();

        builder.build_parallel().run(|| {
            let tx = tx.clone();
            let root = &root;
            let filter = &filter;
            let needle = &needle;
            let case_sensitive = query.case_sensitive;
            let context = query.context_lines;

            Box::new(move |entry| {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => {
                        let _ = tx.send(Err(MapScoutError::HostSearch(err.to_string())));
                        return WalkState::Quit;
                    }
                };

                if !entry.file_type().is_some_and(|t| t.is_file()) {
                    return WalkState::Continue;
                }

                let Some(rel) = candidate_path(root, entry.path()) else {
                    return WalkState::Continue;
                };
                if !filter.matches(&rel) {
                    return WalkState::Continue;
                }

                match fs::read(entry.path()) {
                    Ok(bytes) => {
                        let lowered;
                        let haystack: &[u8] = if case_sensitive {
                            &bytes
                        } else {
                            lowered = bytes.to_ascii_lowercase();
                            &lowered
                        };
                        for line in matching_lines(haystack, &bytes, needle, context) {
                            let found = TextSearchMatch {
                                path: entry.path().to_path_buf(),
                                line,
                            };
                            if tx.send(Ok(found)).is_err() {
                                return WalkState::Quit;
                            }
                        }
                    }
                    Err(err) => {
                        debug!(path = %entry.path().display(), error = %err, "unreadable during host search");
                    }
                }

                WalkState::Continue
            })
        });
        drop(tx);

        for found in rx {
            on_match(found?);
        }

        Ok(())
    }
}

/// Lines of `original` whose counterpart in `haystack` contains `needle`,
/// each reported once. Both buffers share byte offsets.
fn matching_lines(haystack: &[u8], original: &[u8], needle: &[u8], context: usize) -> Vec<String> {
    let mut lines = Vec::new();
    if needle.is_empty() {
        return lines;
    }

    let mut from = 0;
    while from < haystack.len() {
        let Some(offset) = memmem::find(&haystack[from..], needle) else {
            break;
        };
        let at = from + offset;
        let start = line_start(haystack, at, context);
        let end = line_end(haystack, at, context);

        let text = String::from_utf8_lossy(&original[start..end]);
        lines.push(text.trim_end_matches('\r').to_string());

        from = end + 1;
    }

    lines
}

fn line_start(haystack: &[u8], at: usize, context: usize) -> usize {
    let mut start = memrchr(b'\n', &haystack[..at]).map_or(0, |i| i + 1);
    for _ in 0..context {
        if start == 0 {
            break;
        }
        start = memrchr(b'\n', &haystack[..start - 1]).map_or(0, |i| i + 1);
    }
    start
}

fn line_end(haystack: &[u8], at: usize, context: usize) -> usize {
    let mut end = memchr(b'\n', &haystack[at..]).map_or(haystack.len(), |i| at + i);
    for _ in 0..context {
        if end >= haystack.len() {
            break;
        }
        end = memchr(b'\n', &haystack[end + 1..]).map_or(haystack.len(), |i| end + 1 + i);
    }
    end
}
