//! shed list: print the tools specified in the lockfile.

use super::{new_shed, Globals};
use crate::cli::args::ListArgs;
use crate::client::ListOptions;
use crate::driver::GoToolchain;
use crate::error::ShedResult;
use tokio_util::sync::CancellationToken;

pub async fn list(globals: &Globals, args: ListArgs, cancel: &CancellationToken) -> ShedResult<()> {
    let shed = new_shed(globals)?;
    if args.updates {
        GoToolchain::new().ensure_ready(cancel).await?;
    }

    let tools = shed
        .list(
            cancel,
            ListOptions {
                show_updates: args.updates,
                concurrency: 0,
            },
        )
        .await?;
    for info in tools {
        let version = info.tool.version.unwrap_or_default();
        match info.latest_version {
            Some(latest) => println!("{} {} [{}]", info.tool.import_path, version, latest),
            None => println!("{} {}", info.tool.import_path, version),
        }
    }
    Ok(())
}
