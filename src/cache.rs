//! The tool cache: download and build orchestration.
//!
//! Tools are stored in a content-addressed directory layout under the cache
//! root so they can be shared by every project on the machine:
//! `<root>/tools/<escaped-import-path>@<escaped-version>/`. Each directory
//! holds a module scratch manifest and, once built, the tool binary. A tool
//! counts as built iff its binary exists, so retrieval is a stat and
//! repeated installs converge on identical artefacts.
//!
//! The engine is defensive about whatever it finds on disk: pre-existing
//! directories are tolerated, and a manifest that does not describe the
//! requested tool is discarded and re-downloaded. An aborted install heals
//! itself on the next run without manual intervention.

use crate::driver::GoDriver;
use crate::error::{Kind, ShedError, ShedResult};
use crate::gomod::{self, Manifest};
use crate::tool::Tool;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Manages tools in an OS filesystem directory.
pub struct Cache {
    root_dir: PathBuf,
    driver: Arc<dyn GoDriver>,
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("root_dir", &self.root_dir)
            .finish()
    }
}

impl Cache {
    /// Create a new cache rooted at `dir` that performs downloads and builds
    /// through `driver`.
    pub fn new(dir: impl Into<PathBuf>, driver: Arc<dyn GoDriver>) -> Self {
        Self {
            root_dir: dir.into(),
            driver,
        }
    }

    /// The OS filesystem directory used by this cache.
    pub fn dir(&self) -> &Path {
        &self.root_dir
    }

    /// Remove the cache directory and all contents from the filesystem.
    pub fn clean(&self) -> ShedResult<()> {
        const OP: &str = "Cache::clean";
        match std::fs::remove_dir_all(&self.root_dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ShedError::io(OP, "clean failed", e)),
        }
    }

    // The directory where tools are installed.
    fn tools_dir(&self) -> PathBuf {
        self.root_dir.join("tools")
    }

    /// Install the given tool. The tool must have an import path. If it has
    /// no version, the latest version is resolved and installed. The
    /// returned tool carries the version that was actually installed.
    pub async fn install(&self, cancel: &CancellationToken, tool: Tool) -> ShedResult<Tool> {
        const OP: &str = "Cache::install";

        if tool.import_path.is_empty() {
            return Err(ShedError::internal(OP, "import path is required on tool"));
        }
        if cancel.is_cancelled() {
            return Err(ShedError::canceled(OP));
        }

        let tool = self.download(cancel, tool).await?;

        let bin_path = self.tools_dir().join(tool.binary_filepath()?);
        if path_exists(&bin_path).await {
            debug!("tool binary already exists, skipping build: {}", bin_path.display());
            return Ok(tool);
        }
        let work_dir = self.tools_dir().join(tool.filepath()?);
        self.driver
            .build(cancel, &tool.import_path, &bin_path, &work_dir)
            .await
            .map_err(|e| ShedError::wrap(OP, format!("failed to build tool {tool}"), e))?;
        debug!("built tool {} at {}", tool, bin_path.display());
        Ok(tool)
    }

    // The download half of install: resolve the module for the tool into a
    // scratch directory whose go.mod requires exactly the tool's module.
    async fn download(&self, cancel: &CancellationToken, mut tool: Tool) -> ShedResult<Tool> {
        const OP: &str = "Cache::download";

        let mod_dir = self.tools_dir().join(tool.filepath()?);
        let manifest_path = mod_dir.join(gomod::MANIFEST_NAME);

        if tool.has_semver() {
            // With an exact version the directory is already content
            // addressed. A usable manifest means a prior install resolved
            // this exact tool; anything else is leftover state to discard.
            if path_exists(&manifest_path).await {
                if self.manifest_valid(&manifest_path, &tool).await {
                    debug!("tool {} already downloaded, skipping", tool);
                    return Ok(tool);
                }
                debug!("existing manifest for {} is unusable, re-downloading", tool);
                remove_file_if_exists(OP, &manifest_path).await?;
            }

            create_dir_all(OP, &mod_dir).await?;
            self.driver.mod_init(cancel, "_", &mod_dir).await?;
            self.driver.get(cancel, &tool.module(), &mod_dir).await?;

            let mut manifest = self.read_manifest(OP, &manifest_path).await?;
            let Some(require) = manifest.find_require(&tool.import_path) else {
                return Err(ShedError::internal(
                    OP,
                    format!("no require in go.mod provides {}", tool.import_path),
                ));
            };
            if Some(require.version.as_str()) != tool.version.as_deref() {
                return Err(ShedError::internal(
                    OP,
                    format!(
                        "expected version {} in go.mod, found {}",
                        tool.version.as_deref().unwrap_or_default(),
                        require.version
                    ),
                ));
            }
            // The tool's module is what this scratch module exists for;
            // record it as a direct requirement.
            let require_path = require.path.clone();
            if manifest.set_direct(&require_path) {
                fs::write(&manifest_path, manifest.to_string())
                    .await
                    .map_err(|e| {
                        ShedError::io(
                            OP,
                            format!("failed to write {}", manifest_path.display()),
                            e,
                        )
                    })?;
            }
            debug!("downloaded tool {} to {}", tool, mod_dir.display());
            return Ok(tool);
        }

        // No exact version. Resolve the query first, then move the scratch
        // directory to its version-addressed home.
        create_dir_all(OP, &mod_dir).await?;
        // A leftover manifest is likely from an aborted install; start fresh.
        remove_file_if_exists(OP, &manifest_path).await?;
        self.driver.mod_init(cancel, "_", &mod_dir).await?;
        self.driver.get(cancel, &tool.module(), &mod_dir).await?;

        let manifest = self.read_manifest(OP, &manifest_path).await?;
        let Some(require) = manifest.find_require(&tool.import_path) else {
            return Err(ShedError::internal(
                OP,
                format!("no require in go.mod provides {}", tool.import_path),
            ));
        };
        tool.version = Some(require.version.clone());

        let versioned_dir = self.tools_dir().join(tool.filepath()?);
        if path_exists(&versioned_dir).await {
            // This version was already installed. Leave both directories in
            // place; future installs will keep using the existing one.
            return Ok(tool);
        }
        fs::rename(&mod_dir, &versioned_dir).await.map_err(|e| {
            ShedError::io(
                OP,
                format!(
                    "failed to rename {} to {}",
                    mod_dir.display(),
                    versioned_dir.display()
                ),
                e,
            )
        })?;
        debug!("downloaded module for {} to {}", tool, versioned_dir.display());
        Ok(tool)
    }

    // Reports whether the manifest at manifest_path already pins the exact
    // tool: some require must provide the tool's import path at its version.
    async fn manifest_valid(&self, manifest_path: &Path, tool: &Tool) -> bool {
        let data = match fs::read_to_string(manifest_path).await {
            Ok(data) => data,
            Err(_) => return false,
        };
        let manifest = match Manifest::parse(&data) {
            Ok(manifest) => manifest,
            Err(e) => {
                debug!("failed to parse existing go.mod: {}", e);
                return false;
            }
        };
        match manifest.find_require(&tool.import_path) {
            Some(require) if Some(require.version.as_str()) == tool.version.as_deref() => true,
            Some(require) => {
                debug!(
                    "incorrect dependency version in go.mod: expected {:?}, found {}",
                    tool.version, require.version
                );
                false
            }
            None => {
                debug!("no require in go.mod provides {}", tool.import_path);
                false
            }
        }
    }

    async fn read_manifest(&self, op: &'static str, manifest_path: &Path) -> ShedResult<Manifest> {
        let data = fs::read_to_string(manifest_path).await.map_err(|e| {
            ShedError::io(op, format!("failed to read {}", manifest_path.display()), e)
        })?;
        Manifest::parse(&data)
    }

    /// The absolute path to the installed binary for the given tool.
    /// Fails with [`Kind::NotInstalled`] if the binary does not exist.
    pub fn tool_path(&self, tool: &Tool) -> ShedResult<PathBuf> {
        const OP: &str = "Cache::tool_path";
        let bin_path = self.tools_dir().join(tool.binary_filepath()?);
        if !bin_path.exists() {
            return Err(ShedError::new(
                Kind::NotInstalled,
                OP,
                format!("binary for tool {tool} does not exist"),
            ));
        }
        Ok(bin_path)
    }

    /// Check whether a newer version of the tool's module is available.
    /// Returns `None` when the tool is already up to date.
    pub async fn find_update(
        &self,
        cancel: &CancellationToken,
        tool: &Tool,
    ) -> ShedResult<Option<String>> {
        const OP: &str = "Cache::find_update";

        let mod_dir = self.tools_dir().join(tool.filepath()?);
        let manifest_path = mod_dir.join(gomod::MANIFEST_NAME);
        if !path_exists(&manifest_path).await {
            return Err(ShedError::new(
                Kind::NotInstalled,
                OP,
                format!("tool {tool} is not installed"),
            ));
        }
        let manifest = self.read_manifest(OP, &manifest_path).await?;
        let Some(require) = manifest.find_require(&tool.import_path) else {
            return Err(ShedError::internal(
                OP,
                format!("no require in go.mod provides {}", tool.import_path),
            ));
        };
        let info = self
            .driver
            .list_update(cancel, &require.path, &mod_dir)
            .await?;
        Ok(info.update)
    }
}

async fn path_exists(path: &Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}

async fn create_dir_all(op: &'static str, dir: &Path) -> ShedResult<()> {
    fs::create_dir_all(dir)
        .await
        .map_err(|e| ShedError::io(op, format!("failed to create directory {}", dir.display()), e))
}

async fn remove_file_if_exists(op: &'static str, path: &Path) -> ShedResult<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ShedError::io(
            op,
            format!("failed to remove {}", path.display()),
            e,
        )),
    }
}
