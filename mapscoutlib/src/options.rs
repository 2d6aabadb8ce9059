//! Input options for discovery operations.
//!
//! This module contains the configuration types that control how a
//! discovery call runs, as opposed to *what* it searches (see
//! [`GlobList`](crate::GlobList) and [`PathMapping`](crate::PathMapping)).

use std::num::NonZeroUsize;

use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};

use crate::error::MapScoutError;
use crate::source::MATCH_ALL;
use crate::Result;

/// How many metadata build tasks may run at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Concurrency {
    /// Use the global rayon pool
    #[default]
    Unbounded,
    /// Use a dedicated pool with this many threads
    Limited(NonZeroUsize),
}

impl Concurrency {
    /// `0` means unbounded.
    pub fn from_count(count: usize) -> Self {
        NonZeroUsize::new(count).map_or(Self::Unbounded, Self::Limited)
    }

    /// Run `op` inside a pool honouring this limit.
    pub fn install<R, F>(self, op: F) -> Result<R>
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        match self {
            Concurrency::Unbounded => Ok(op()),
            Concurrency::Limited(threads) => {
                let pool = ThreadPoolBuilder::new()
                    .num_threads(threads.get())
                    .thread_name(|i| format!("mapscout-build-{i}"))
                    .build()
                    .map_err(|e| MapScoutError::ThreadPool(e.to_string()))?;
                Ok(pool.install(op))
            }
        }
    }
}

/// Options for discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// Cap on concurrent metadata build tasks
    pub concurrency: Concurrency,
    /// Allow the capability probe to select a bulk search backend
    pub host_search: bool,
    /// Glob applied below each path mapping directory
    pub path_mapping_glob: String,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            concurrency: Concurrency::Unbounded,
            host_search: true,
            path_mapping_glob: MATCH_ALL.to_string(),
        }
    }
}

impl DiscoveryOptions {
    /// Create new default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the build fan-out limit.
    pub fn concurrency(mut self, concurrency: Concurrency) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Limit the build fan-out to `threads` workers (`0` = unbounded).
    pub fn max_concurrency(mut self, threads: usize) -> Self {
        self.concurrency = Concurrency::from_count(threads);
        self
    }

    /// Enable or disable bulk search selection.
    pub fn host_search(mut self, enabled: bool) -> Self {
        self.host_search = enabled;
        self
    }

    /// Always use the direct filesystem backend.
    pub fn without_host_search(self) -> Self {
        self.host_search(false)
    }

    /// Set the glob used for path mapping correlation.
    pub fn path_mapping_glob(mut self, glob: impl Into<String>) -> Self {
        self.path_mapping_glob = glob.into();
        self
    }
}
