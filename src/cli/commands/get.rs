//! shed get: install tools and update the lockfile.

use super::{new_shed, Globals};
use crate::cli::args::GetArgs;
use crate::client::GetOptions;
use crate::driver::GoToolchain;
use crate::error::{Kind, ShedResult};
use crate::ui::progress::TaskSpinner;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub async fn get(globals: &Globals, args: GetArgs, cancel: &CancellationToken) -> ShedResult<()> {
    let mut shed = new_shed(globals)?;
    let mut install_set = shed.get(GetOptions {
        tool_names: args.tools,
        update: args.update,
    })?;
    if let Some(concurrency) = args.concurrency {
        install_set.concurrency(concurrency);
    }

    if !install_set.is_empty() {
        // Installing anything requires the go toolchain.
        GoToolchain::new().ensure_ready(cancel).await?;
    }

    let total = install_set.len();
    let (tx, mut rx) = mpsc::channel(total.max(1));
    install_set.notify(tx);

    let mut spinner = TaskSpinner::new(globals.progress.interactive(), "Installing tools", total);
    spinner.start();
    // Drain progress on a separate task; apply blocks until every install
    // finishes and the channel closes with the install set's sender.
    let progress = tokio::spawn(async move {
        while rx.recv().await.is_some() {
            spinner.inc();
        }
        spinner
    });

    let result = install_set.apply(cancel).await;
    let mut spinner = match progress.await {
        Ok(spinner) => spinner,
        Err(_) => TaskSpinner::new(false, "Installing tools", 0),
    };
    match result {
        Ok(()) => {
            spinner.stop("Finished installing tools");
            Ok(())
        }
        Err(e) if e.root().kind() == Kind::Canceled => {
            spinner.stop_error("Install aborted");
            Err(e)
        }
        Err(e) => {
            spinner.stop_error("Failed to install tools");
            Err(e)
        }
    }
}
