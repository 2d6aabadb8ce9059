//! Correlating compiled files with source maps without reading comments:
//! lookup manifests and directory correspondence.

pub mod manifest;
pub mod path_mapping;

pub use manifest::{resolve_manifests, ManifestEntry, MANIFEST_SUFFIX};
pub use path_mapping::{find_by_path_mapping, substitute_prefix, PathMapping};
