//! Candidate discovery: decide which files are worth inspecting.
//!
//! - **Glob lists**: a root plus include/`!`exclude patterns, and the
//!   projection handed to bulk search backends
//! - **File filtering**: compiled glob matching and directory walking
//!
//! ## Example
//!
//! ```rust,ignore
//! use mapscoutlib::source::{discover_files, GlobFilter, GlobList};
//!
//! let list = GlobList::new("/work/dist", ["**/*.js", "!**/node_modules/**"]);
//! let files = discover_files(list.root(), &GlobFilter::from_glob_list(&list)?)?;
//! ```

pub mod filter;
pub mod glob_list;

pub use filter::{discover_files, relative_slash_path, GlobFilter};
pub use glob_list::{normalize_separators, GlobList, SearchProjection, MATCH_ALL};
