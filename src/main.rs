//! shed - CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use shed::cli::{commands, Cli, Commands};
use shed::error::{Kind, ShedResult};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("shed=debug")
    } else {
        EnvFilter::new("shed=info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    // Translate SIGINT into cooperative cancellation so in-flight installs
    // stop promptly and the lockfile is left untouched.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    match run(cli, &cancel).await {
        Ok(code) => code,
        Err(e) if e.root().kind() == Kind::Canceled => {
            eprintln!("\nOperation cancelled");
            ExitCode::from(130)
        }
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, cancel: &CancellationToken) -> ShedResult<ExitCode> {
    let Cli {
        command,
        verbose: _,
        progress,
        lockfile,
        cache_dir,
    } = cli;
    let globals = commands::Globals {
        progress,
        lockfile,
        cache_dir,
    };

    match command {
        Commands::Get(args) => {
            commands::get(&globals, args, cancel).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Init => {
            commands::init(&globals)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::List(args) => {
            commands::list(&globals, args, cancel).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Run(args) => commands::run(&globals, args).await,
        Commands::Cache(args) => {
            commands::cache(&globals, args)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
