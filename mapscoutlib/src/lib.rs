//! # mapscoutlib
//!
//! A discovery engine that locates the source maps belonging to build
//! output and reports them as normalized metadata records.
//!
//! ## Overview
//!
//! Compiled files can point at their source maps in three structurally
//! different ways, and this library reconciles all of them:
//!
//! - **Inline comments**: `//# sourceMappingURL=app.js.map` inside the file
//! - **Lookup manifests**: `*.source-maps.json` files declaring maps out of band
//! - **Path mapping**: a configured local directory to remote root correspondence
//!
//! ## Features
//!
//! - **Two backends**: a bulk content search when the host offers one, and a
//!   direct filesystem walk that works everywhere
//! - **Glob filtering**: include and `!`exclude patterns with `**` support
//! - **Fault tolerance**: a broken reference is logged and skipped, never fatal
//! - **Bounded parallelism**: metadata is built on a `rayon` pool with an
//!   optional thread cap
//!
//! ## Example
//!
//! ```rust
//! use mapscoutlib::{DiscoveryOptions, DiscoveryRequest, GlobList, PathMapping, SourceMapDiscovery};
//! use std::fs;
//! use tempfile::tempdir;
//!
//! let dir = tempdir().unwrap();
//! let out = dir.path().join("out");
//! fs::create_dir(&out).unwrap();
//! fs::write(out.join("app.js"), "app();\n//# sourceMappingURL=app.js.map\n").unwrap();
//! fs::write(out.join("lib.js"), "lib();\n").unwrap();
//!
//! let discovery = SourceMapDiscovery::new(DiscoveryOptions::new());
//!
//! // Inline comments only
//! let files = GlobList::new(dir.path(), ["**/*.js", "!**/node_modules/**"]);
//! let found = discovery.find_by_source_map_comment(&files).unwrap();
//! assert_eq!(found.len(), 1);
//!
//! // Comments plus directory correspondence for the rest
//! let mapping = PathMapping::new().with(out.to_string_lossy(), "/srv/app");
//! let all = discovery
//!     .discover(&DiscoveryRequest::new(files).path_mapping(mapping))
//!     .unwrap();
//! assert_eq!(all.len(), 2);
//! assert_eq!(all[1].source_map_url, "/srv/app/lib.js");
//! ```

pub mod config;
pub mod discovery;
pub mod error;
pub mod mapping;
pub mod metadata;
pub mod options;
pub mod source;
pub mod strategy;

pub use config::DiscoveryConfig;
pub use discovery::{DiscoveryRequest, DiscoveryStrategy, SourceMapDiscovery};
pub use error::MapScoutError;
pub use mapping::{ManifestEntry, PathMapping};
pub use metadata::{CommentMetadataBuilder, MetadataBuilder, SourceMapMetadata, UNTRACKED_MTIME};
pub use options::{Concurrency, DiscoveryOptions};
pub use source::{GlobFilter, GlobList, SearchProjection};
pub use strategy::{HostSearch, SearchStrategy, TextSearchMatch, TextSearchQuery};

/// Result type for mapscoutlib operations
pub type Result<T> = std::result::Result<T, MapScoutError>;
