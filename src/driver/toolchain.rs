//! The real toolchain driver that shells out to the go command.

use super::{GoDriver, ModuleInfo};
use crate::error::{Kind, ShedError, ShedResult};
use crate::version;
use async_trait::async_trait;
use serde::Deserialize;
use std::cmp::Ordering;
use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

// Module-aware mode shipped in go 1.11; anything older cannot resolve tools.
const MIN_GO_VERSION: &str = "v1.11";

/// Driver that invokes the go command on the host.
#[derive(Debug, Clone)]
pub struct GoToolchain {
    program: String,
}

impl GoToolchain {
    /// Create a driver that uses the `go` command on PATH.
    pub fn new() -> Self {
        Self {
            program: "go".to_string(),
        }
    }

    /// Create a driver that uses a specific go binary.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Check that the go command is present and recent enough to be used.
    pub async fn ensure_ready(&self, cancel: &CancellationToken) -> ShedResult<()> {
        const OP: &str = "GoToolchain::ensure_ready";

        let stdout = self
            .exec(cancel, OP, Path::new("."), &["version".as_ref()])
            .await?;
        let text = String::from_utf8_lossy(&stdout);
        let Some(go_version) = parse_go_version(&text) else {
            return Err(ShedError::new(
                Kind::Go,
                OP,
                format!("unexpected go version format {:?}", text.trim()),
            ));
        };
        if version::compare(&go_version, MIN_GO_VERSION) == Ordering::Less {
            return Err(ShedError::new(
                Kind::Go,
                OP,
                format!("shed requires go {MIN_GO_VERSION} or later, found {go_version}"),
            ));
        }
        Ok(())
    }

    async fn exec(
        &self,
        cancel: &CancellationToken,
        op: &'static str,
        dir: &Path,
        args: &[&OsStr],
    ) -> ShedResult<Vec<u8>> {
        debug!("executing: go {:?}", args);

        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::select! {
            _ = cancel.cancelled() => return Err(ShedError::canceled(op)),
            output = cmd.output() => output.map_err(|e| {
                ShedError::with_source(Kind::Go, op, format!("failed to run go {args:?}"), e)
            })?,
        };
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ShedError::new(
                Kind::Go,
                op,
                format!("go {:?} failed: {}", args, stderr.trim()),
            ));
        }
        Ok(output.stdout)
    }
}

impl Default for GoToolchain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GoDriver for GoToolchain {
    async fn get(
        &self,
        cancel: &CancellationToken,
        module: &str,
        work_dir: &Path,
    ) -> ShedResult<()> {
        self.exec(
            cancel,
            "GoToolchain::get",
            work_dir,
            &["get".as_ref(), module.as_ref()],
        )
        .await?;
        Ok(())
    }

    async fn build(
        &self,
        cancel: &CancellationToken,
        import_path: &str,
        output: &Path,
        work_dir: &Path,
    ) -> ShedResult<()> {
        self.exec(
            cancel,
            "GoToolchain::build",
            work_dir,
            &[
                "build".as_ref(),
                "-o".as_ref(),
                output.as_os_str(),
                import_path.as_ref(),
            ],
        )
        .await?;
        Ok(())
    }

    async fn list_update(
        &self,
        cancel: &CancellationToken,
        module_path: &str,
        work_dir: &Path,
    ) -> ShedResult<ModuleInfo> {
        const OP: &str = "GoToolchain::list_update";

        let stdout = self
            .exec(
                cancel,
                OP,
                work_dir,
                &[
                    "list".as_ref(),
                    "-m".as_ref(),
                    "-u".as_ref(),
                    "-json".as_ref(),
                    module_path.as_ref(),
                ],
            )
            .await?;
        let module: ListModule = serde_json::from_slice(&stdout).map_err(|e| {
            ShedError::with_source(Kind::Go, OP, "failed to parse go list output", e)
        })?;
        Ok(ModuleInfo {
            path: module.path,
            version: module.version.unwrap_or_default(),
            update: module.update.map(|u| u.version),
        })
    }

    async fn mod_init(
        &self,
        cancel: &CancellationToken,
        name: &str,
        work_dir: &Path,
    ) -> ShedResult<()> {
        self.exec(
            cancel,
            "GoToolchain::mod_init",
            work_dir,
            &["mod".as_ref(), "init".as_ref(), name.as_ref()],
        )
        .await?;
        Ok(())
    }
}

// Output shape of 'go list -m -u -json'.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListModule {
    path: String,
    version: Option<String>,
    update: Option<ListUpdate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListUpdate {
    version: String,
}

// Extracts the canonical version out of 'go version' output, e.g.
// "go version go1.21.3 linux/amd64" yields "v1.21.3".
fn parse_go_version(text: &str) -> Option<String> {
    let raw = text.split_whitespace().nth(2)?.strip_prefix("go")?;
    version::canonical(&format!("v{raw}"))
}
