//! The toolchain driver: the seam through which shed reaches the go command.
//!
//! The cache engine never fetches modules or invokes the compiler itself; it
//! delegates to a [`GoDriver`]. The real implementation is [`GoToolchain`],
//! which shells out to `go`. Tests use [`mock::MockGo`].

pub mod mock;
mod toolchain;

pub use toolchain::GoToolchain;

use crate::error::ShedResult;
use async_trait::async_trait;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Information about a module reported by the toolchain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    /// The module path.
    pub path: String,
    /// The currently selected version of the module.
    pub version: String,
    /// A newer available version, when one exists.
    pub update: Option<String>,
}

/// Abstract interface to the go toolchain.
///
/// All downloads, version resolution, and builds go through this trait so
/// the cache can be tested with a deterministic in-memory implementation.
/// Every method takes a cancellation token and must return promptly once it
/// is cancelled.
#[async_trait]
pub trait GoDriver: Send + Sync {
    /// Download the source for `module` (of the form `path` or
    /// `path@version_or_query`) into the module scratch directory at
    /// `work_dir`. As a side effect the directory's go.mod gains a require
    /// for the resolved module.
    async fn get(
        &self,
        cancel: &CancellationToken,
        module: &str,
        work_dir: &Path,
    ) -> ShedResult<()>;

    /// Compile `import_path` to the binary at `output`, using the module
    /// resolution rooted at `work_dir`.
    async fn build(
        &self,
        cancel: &CancellationToken,
        import_path: &str,
        output: &Path,
        work_dir: &Path,
    ) -> ShedResult<()>;

    /// Report the module at `module_path`, along with a newer version if one
    /// is available.
    async fn list_update(
        &self,
        cancel: &CancellationToken,
        module_path: &str,
        work_dir: &Path,
    ) -> ShedResult<ModuleInfo>;

    /// Write an initial go.mod for a module named `name` in `work_dir`.
    async fn mod_init(
        &self,
        cancel: &CancellationToken,
        name: &str,
        work_dir: &Path,
    ) -> ShedResult<()>;
}
