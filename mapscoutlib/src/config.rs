//! `mapscout.json` project configuration.
//!
//! ```json
//! {
//!   "rootPath": "dist",
//!   "outFiles": ["**/*.js", "!**/node_modules/**"],
//!   "pathMapping": { "dist/vendor": "/remote/vendor" },
//!   "pathMappingGlob": "**/*.js",
//!   "maxConcurrency": 8,
//!   "hostSearch": true
//! }
//! ```
//!
//! Every field is optional. Relative `rootPath` and `pathMapping` keys are
//! resolved against the directory holding the file.

use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::discovery::DiscoveryRequest;
use crate::error::MapScoutError;
use crate::mapping::path_mapping::PathMapping;
use crate::options::{Concurrency, DiscoveryOptions};
use crate::source::{GlobList, MATCH_ALL};
use crate::Result;

/// Default configuration file name.
pub const FILE_NAME: &str = "mapscout.json";

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_out_files() -> Vec<String> {
    ["**/*.js", "**/*.mjs", "**/*.cjs", "!**/node_modules/**"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn default_glob() -> String {
    MATCH_ALL.to_string()
}

fn default_true() -> bool {
    true
}

/// Deserialized configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DiscoveryConfig {
    #[serde(default = "default_root")]
    pub root_path: PathBuf,
    #[serde(default = "default_out_files")]
    pub out_files: Vec<String>,
    #[serde(default)]
    pub path_mapping: PathMapping,
    #[serde(default = "default_glob")]
    pub path_mapping_glob: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<NonZeroUsize>,
    #[serde(default = "default_true")]
    pub host_search: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            root_path: default_root(),
            out_files: default_out_files(),
            path_mapping: PathMapping::default(),
            path_mapping_glob: default_glob(),
            max_concurrency: None,
            host_search: true,
        }
    }
}

impl DiscoveryConfig {
    /// Read and parse a configuration file, resolving relative paths.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| MapScoutError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_json(&content).map_err(|source| MapScoutError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        debug!(config = %path.display(), "loaded configuration");
        Ok(config.resolve_against(base))
    }

    pub fn from_json(content: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Make the root and mapping directories absolute against `base`.
    pub fn resolve_against(mut self, base: &Path) -> Self {
        if self.root_path.is_relative() {
            self.root_path = base.join(&self.root_path);
        }
        self.path_mapping = self.path_mapping.resolve_against(base);
        self
    }

    pub fn glob_list(&self) -> GlobList {
        GlobList::new(self.root_path.clone(), self.out_files.iter().cloned())
    }

    pub fn options(&self) -> DiscoveryOptions {
        let concurrency = self
            .max_concurrency
            .map_or(Concurrency::Unbounded, Concurrency::Limited);

        DiscoveryOptions::new()
            .concurrency(concurrency)
            .host_search(self.host_search)
            .path_mapping_glob(self.path_mapping_glob.clone())
    }

    pub fn request(&self) -> DiscoveryRequest {
        let request = DiscoveryRequest::new(self.glob_list());
        if self.path_mapping.is_empty() {
            request
        } else {
            request.path_mapping(self.path_mapping.clone())
        }
    }
}
