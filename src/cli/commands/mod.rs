//! Implementations of the shed subcommands.

mod cache;
mod get;
mod init;
mod list;
mod run;

pub use cache::cache;
pub use get::get;
pub use init::init;
pub use list::list;
pub use run::run;

use crate::cache::Cache;
use crate::cli::args::ProgressMode;
use crate::client::{self, Shed};
use crate::driver::GoToolchain;
use crate::error::{ShedError, ShedResult};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Global flags shared by every subcommand.
pub struct Globals {
    pub progress: ProgressMode,
    pub lockfile: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
}

// Build a Shed from the global flags, resolving the nearest lockfile when
// none is given explicitly.
fn new_shed(globals: &Globals) -> ShedResult<Shed> {
    const OP: &str = "cli::new_shed";

    let mut builder = Shed::builder();
    let lockfile_path = match &globals.lockfile {
        Some(path) => Some(path.clone()),
        None => {
            let cwd = std::env::current_dir()
                .map_err(|e| ShedError::io(OP, "unable to get current working directory", e))?;
            client::resolve_lockfile_path(&cwd)
        }
    };
    if let Some(path) = lockfile_path {
        debug!("found lockfile: {}", path.display());
        builder = builder.lockfile_path(path);
    }
    if let Some(dir) = &globals.cache_dir {
        builder = builder.cache(Cache::new(dir.clone(), Arc::new(GoToolchain::new())));
    }
    builder.build()
}
