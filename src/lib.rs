//! shed manages Go tool dependencies for a project.
//!
//! Tools are pinned in a `shed.lock` lockfile committed with the project, so
//! every contributor runs byte-identical versions of linters, code
//! generators, and other build-time helpers. Installed tools live in a
//! per-user content-addressed cache shared across projects; installing a
//! tool resolves its module, compiles it once, and re-serves the binary from
//! the cache after that.

pub mod cache;
pub mod cli;
pub mod client;
pub mod driver;
pub mod error;
pub mod gomod;
pub mod lockfile;
pub mod tool;
pub mod ui;
pub mod version;

pub use client::{
    resolve_lockfile_path, GetOptions, InstallSet, ListOptions, Shed, ToolInfo, LOCKFILE_NAME,
};
pub use error::{Kind, ShedError, ShedResult};
pub use tool::Tool;
