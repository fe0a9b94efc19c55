//! shed run: run an installed tool, passing all arguments through.

use super::{new_shed, Globals};
use crate::cli::args::RunArgs;
use crate::error::{Kind, ShedError, ShedResult};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;

pub async fn run(globals: &Globals, args: RunArgs) -> ShedResult<ExitCode> {
    const OP: &str = "cli::run";

    let shed = new_shed(globals)?;
    let bin_path = match shed.tool_path(&args.tool) {
        Ok(path) => path,
        Err(e) => match e.root().kind() {
            Kind::NotFound => {
                eprintln!(
                    "No tool named {} installed. Run 'shed get' first to install the tool.",
                    args.tool
                );
                return Ok(ExitCode::FAILURE);
            }
            Kind::MultipleTools => {
                eprintln!(
                    "Multiple tools named {} found. Specify the full import path of the tool in order to run it.",
                    args.tool
                );
                return Ok(ExitCode::FAILURE);
            }
            _ => return Err(e),
        },
    };
    debug!("found path for tool {}: {}", args.tool, bin_path.display());

    // Run from the lockfile's directory so tools see the project root.
    let dir = shed
        .lockfile_path()
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let status = tokio::process::Command::new(&bin_path)
        .args(&args.args)
        .current_dir(dir)
        .status()
        .await
        .map_err(|e| ShedError::io(OP, format!("failed to run {}", bin_path.display()), e))?;

    let code = status.code().unwrap_or(1);
    Ok(ExitCode::from(code.clamp(0, 255) as u8))
}
