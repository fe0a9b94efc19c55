//! The high level API for using shed.
//!
//! A [`Shed`] owns the project lockfile and the shared tool cache.
//! [`Shed::get`] computes the set of tools to install by unioning a request
//! with the lockfile and returns an [`InstallSet`]; nothing changes until
//! [`InstallSet::apply`] runs. Apply installs tools concurrently through the
//! cache, then commits the lockfile in one step.

use crate::cache::Cache;
use crate::driver::GoToolchain;
use crate::error::{ErrorList, Kind, ShedError, ShedResult};
use crate::lockfile::Lockfile;
use crate::tool::Tool;
use crate::version;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Name of the lockfile read and written by shed.
pub const LOCKFILE_NAME: &str = "shed.lock";

// Special module versions understood by go get. '@none' removes a module,
// '@latest' resolves to the newest available version.
const NONE_VERSION: &str = "none";
const LATEST_VERSION: &str = "latest";

/// Resolve the path to the nearest shed lockfile, starting at `dir` and
/// walking parent directories until the filesystem root. Sibling directories
/// are never inspected. An empty `dir` means the current directory.
/// Returns `None` if no lockfile is found.
pub fn resolve_lockfile_path(dir: &Path) -> Option<PathBuf> {
    let mut dir = if dir.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        dir.to_path_buf()
    };
    let mut prev = PathBuf::new();
    while dir != prev {
        let path = dir.join(LOCKFILE_NAME);
        if path.exists() {
            return Some(path);
        }
        let next = match dir.parent() {
            None => break,
            Some(parent) if parent.as_os_str().is_empty() => PathBuf::from("."),
            Some(parent) => parent.to_path_buf(),
        };
        prev = dir;
        dir = next;
    }
    None
}

/// Provides the API for managing tool dependencies with shed.
pub struct Shed {
    cache: Arc<Cache>,
    lockfile: Lockfile,
    lockfile_path: PathBuf,
}

impl std::fmt::Debug for Shed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shed")
            .field("lockfile", &self.lockfile)
            .field("lockfile_path", &self.lockfile_path)
            .finish()
    }
}

/// Builder for [`Shed`].
///
/// By default the lockfile path is `./shed.lock` and the cache lives in
/// `<user cache dir>/shed`, driven by the go command on PATH.
#[derive(Default)]
pub struct ShedBuilder {
    lockfile_path: Option<PathBuf>,
    cache: Option<Cache>,
}

impl ShedBuilder {
    /// Set the path to the lockfile.
    pub fn lockfile_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.lockfile_path = Some(path.into());
        self
    }

    /// Set the cache to use for installing tools.
    pub fn cache(mut self, cache: Cache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Build the [`Shed`], reading the lockfile if it exists.
    pub fn build(self) -> ShedResult<Shed> {
        const OP: &str = "ShedBuilder::build";

        let lockfile_path = self
            .lockfile_path
            .unwrap_or_else(|| PathBuf::from(LOCKFILE_NAME));
        let cache = match self.cache {
            Some(cache) => cache,
            None => {
                let Some(user_cache_dir) = dirs::cache_dir() else {
                    return Err(ShedError::new(
                        Kind::Invalid,
                        OP,
                        "unable to find user cache directory",
                    ));
                };
                Cache::new(user_cache_dir.join("shed"), Arc::new(GoToolchain::new()))
            }
        };
        std::fs::create_dir_all(cache.dir()).map_err(|e| {
            ShedError::io(
                OP,
                format!("failed to create cache directory {}", cache.dir().display()),
                e,
            )
        })?;

        let lockfile = match File::open(&lockfile_path) {
            Ok(file) => Lockfile::parse(io::BufReader::new(file)).map_err(|e| {
                ShedError::wrap(
                    OP,
                    format!("failed to parse lockfile {}", lockfile_path.display()),
                    e,
                )
            })?,
            // No lockfile yet; start from an empty one.
            Err(e) if e.kind() == io::ErrorKind::NotFound => Lockfile::new(),
            Err(e) => {
                return Err(ShedError::io(
                    OP,
                    format!("failed to open {}", lockfile_path.display()),
                    e,
                ));
            }
        };
        Ok(Shed {
            cache: Arc::new(cache),
            lockfile,
            lockfile_path,
        })
    }
}

/// Options for [`Shed::get`].
#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    /// Tools to install, unioned with the tools in the lockfile. Each name
    /// must be a full import path, optionally with an `@version` suffix.
    pub tool_names: Vec<String>,
    /// Update tools to the latest available version. If `tool_names` is not
    /// empty, only those tools are updated; otherwise every tool in the
    /// lockfile is.
    pub update: bool,
}

/// Options for [`Shed::list`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ListOptions {
    /// Check whether a newer version of each tool is available.
    pub show_updates: bool,
    /// The number of update checks to run concurrently when `show_updates`
    /// is set. Zero means the number of CPUs.
    pub concurrency: usize,
}

/// Information about a tool returned by [`Shed::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInfo {
    /// The installed tool.
    pub tool: Tool,
    /// The latest available version, when `show_updates` was set and a newer
    /// version was found.
    pub latest_version: Option<String>,
}

impl Shed {
    /// Create a builder for configuring a new `Shed`.
    pub fn builder() -> ShedBuilder {
        ShedBuilder::default()
    }

    /// The OS filesystem directory where the shed cache is located.
    pub fn cache_dir(&self) -> &Path {
        self.cache.dir()
    }

    /// Remove the cache directory and all contents from the filesystem.
    pub fn clean_cache(&self) -> ShedResult<()> {
        self.cache.clean()
    }

    /// The path of the lockfile this shed reads and writes.
    pub fn lockfile_path(&self) -> &Path {
        &self.lockfile_path
    }

    /// Compute the set of tools that should be installed: the requested
    /// tools unioned with the tools in the lockfile.
    ///
    /// Nothing is modified; discard the returned [`InstallSet`] to abort.
    /// With `update` set, tool names must not carry a version suffix since
    /// the latest version will be installed.
    pub fn get(&mut self, opts: GetOptions) -> ShedResult<InstallSet<'_>> {
        const OP: &str = "Shed::get";

        let mut seen = HashSet::new();
        let mut tools = Vec::new();
        let mut errs = ErrorList::new();
        for tool_name in &opts.tool_names {
            // Parsing doubles as validation of the given name. Lax, since
            // the version may be a query meant for the toolchain.
            let mut tool = match Tool::parse_lax(tool_name) {
                Ok(tool) => tool,
                Err(e) => {
                    errs.push(ShedError::wrap(OP, format!("invalid tool name {tool_name}"), e));
                    continue;
                }
            };
            if opts.update {
                let has_pinned_version = tool
                    .version
                    .as_deref()
                    .is_some_and(|v| v != NONE_VERSION && v != LATEST_VERSION);
                if has_pinned_version {
                    errs.push(ShedError::new(
                        Kind::Invalid,
                        OP,
                        format!("tool {tool} must not have a version when updating"),
                    ));
                    continue;
                }
                tool.version = Some(LATEST_VERSION.to_string());
            }
            seen.insert(tool.import_path.clone());
            tools.push(tool);
        }
        if !errs.is_empty() {
            return Err(ShedError::aggregate(OP, "invalid tool names", errs));
        }

        // Update with no explicit tools means update everything.
        let update_all = opts.update && opts.tool_names.is_empty();
        for stored in self.lockfile.iter() {
            if seen.contains(&stored.import_path) {
                continue;
            }
            let mut tool = stored.clone();
            // Skip tools pinned to a prerelease: the latest release might
            // actually be older than what was explicitly installed.
            if update_all
                && tool
                    .version
                    .as_deref()
                    .is_some_and(|v| version::prerelease(v).is_none())
            {
                tool.version = Some(LATEST_VERSION.to_string());
            }
            tools.push(tool);
        }
        Ok(InstallSet {
            shed: self,
            tools,
            concurrency: 0,
            notify: None,
        })
    }

    /// The absolute path to the binary of the named tool, if installed.
    /// The name can be a short binary name or a full import path.
    pub fn tool_path(&self, tool_name: &str) -> ShedResult<PathBuf> {
        let tool = self.lockfile.get_tool(tool_name)?;
        self.cache.tool_path(&tool)
    }

    /// List the tools specified in the lockfile, sorted by import path.
    ///
    /// With `show_updates`, every tool is probed for a newer version
    /// concurrently; the first failed probe cancels the rest and fails the
    /// whole listing.
    pub async fn list(
        &self,
        cancel: &CancellationToken,
        opts: ListOptions,
    ) -> ShedResult<Vec<ToolInfo>> {
        const OP: &str = "Shed::list";

        if !opts.show_updates {
            let mut tools: Vec<ToolInfo> = self
                .lockfile
                .iter()
                .map(|tool| ToolInfo {
                    tool: tool.clone(),
                    latest_version: None,
                })
                .collect();
            tools.sort_by(|a, b| a.tool.import_path.cmp(&b.tool.import_path));
            return Ok(tools);
        }

        // Child token so one failed probe can stop the in-flight rest.
        let probe_cancel = cancel.child_token();
        let concurrency = get_concurrency(opts.concurrency);
        debug!("using concurrency {}", concurrency);
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let mut join_set = JoinSet::new();
        for tool in self.lockfile.iter().cloned() {
            let cache = Arc::clone(&self.cache);
            let cancel = probe_cancel.clone();
            let semaphore = Arc::clone(&semaphore);
            join_set.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| ShedError::internal(OP, "semaphore closed"))?;
                let latest = cache.find_update(&cancel, &tool).await?;
                Ok(ToolInfo {
                    tool,
                    latest_version: latest,
                })
            });
        }

        let mut tools = Vec::new();
        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    probe_cancel.cancel();
                    return Err(ShedError::canceled(OP));
                }
                result = join_set.join_next() => match result {
                    None => break,
                    Some(result) => result,
                },
            };
            match result {
                Ok(Ok(info)) => tools.push(info),
                Ok(Err(e)) => {
                    probe_cancel.cancel();
                    return Err(e);
                }
                Err(e) => {
                    probe_cancel.cancel();
                    return Err(ShedError::with_source(
                        Kind::Internal,
                        OP,
                        "update check task failed",
                        e,
                    ));
                }
            }
        }
        tools.sort_by(|a, b| a.tool.import_path.cmp(&b.tool.import_path));
        Ok(tools)
    }

    fn write_lockfile(&self, op: &'static str) -> ShedResult<()> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o644);
        }
        let mut file = options.open(&self.lockfile_path).map_err(|e| {
            ShedError::io(
                op,
                format!("failed to create/open file {}", self.lockfile_path.display()),
                e,
            )
        })?;
        self.lockfile.write_to(&mut file).map_err(|e| {
            ShedError::wrap(
                op,
                format!("failed to write lockfile to {}", self.lockfile_path.display()),
                e,
            )
        })?;
        Ok(())
    }
}

/// A set of tools to be installed, created by [`Shed::get`].
///
/// Call [`InstallSet::apply`] to perform the installation. Dropping the set
/// without applying leaves all on-disk and in-memory state unchanged.
#[derive(Debug)]
pub struct InstallSet<'a> {
    shed: &'a mut Shed,
    tools: Vec<Tool>,
    concurrency: usize,
    notify: Option<mpsc::Sender<Tool>>,
}

impl InstallSet<'_> {
    /// The number of tools in the install set.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Set the number of installs that run concurrently.
    /// Zero means the number of CPUs.
    pub fn concurrency(&mut self, concurrency: usize) {
        self.concurrency = concurrency;
    }

    /// Relay each successfully installed tool to `tx`, in completion order.
    /// Receive on a separate task from the one awaiting [`InstallSet::apply`],
    /// since apply blocks until all tools are installed.
    pub fn notify(&mut self, tx: mpsc::Sender<Tool>) {
        self.notify = Some(tx);
    }

    /// Install every tool in the set and commit the result to the lockfile.
    ///
    /// Installs run concurrently. A failing install does not abort its
    /// peers; per-tool errors are aggregated and, if any occurred, the
    /// lockfile is left untouched. Cancelling `cancel` aborts promptly
    /// without modifying the lockfile.
    pub async fn apply(self, cancel: &CancellationToken) -> ShedResult<()> {
        const OP: &str = "InstallSet::apply";

        let InstallSet {
            shed,
            tools,
            concurrency,
            notify,
        } = self;

        let concurrency = get_concurrency(concurrency);
        debug!("using concurrency {}", concurrency);
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let mut join_set = JoinSet::new();
        for tool in tools {
            let cache = Arc::clone(&shed.cache);
            let cancel = cancel.clone();
            let semaphore = Arc::clone(&semaphore);
            join_set.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| ShedError::internal(OP, "semaphore closed"))?;
                // go get supports the special version '@none' meaning remove
                // the module. There is nothing to install; the removal
                // happens at lockfile commit.
                if tool.version.as_deref() == Some(NONE_VERSION) {
                    debug!("uninstalling tool: {}", tool.import_path);
                    return Ok(tool);
                }
                debug!("installing tool: {}", tool);
                cache
                    .install(&cancel, tool.clone())
                    .await
                    .map_err(|e| ShedError::wrap(OP, format!("failed to install tool {tool}"), e))
            });
        }

        let mut completed = Vec::new();
        let mut errs = ErrorList::new();
        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => return Err(ShedError::canceled(OP)),
                result = join_set.join_next() => match result {
                    None => break,
                    Some(result) => result,
                },
            };
            match result {
                Ok(Ok(tool)) => {
                    if let Some(tx) = &notify {
                        // A hung-up receiver only affects progress reporting.
                        let _ = tx.send(tool.clone()).await;
                    }
                    completed.push(tool);
                }
                // Keep going when a single tool fails. Artefacts are cached,
                // so a re-run picks up where this one left off.
                Ok(Err(e)) => errs.push(e),
                Err(e) => errs.push(ShedError::with_source(
                    Kind::Internal,
                    OP,
                    "install task failed",
                    e,
                )),
            }
        }
        if !errs.is_empty() {
            return Err(ShedError::aggregate(OP, "failed to install tools", errs));
        }

        for mut tool in completed {
            if tool.version.as_deref() == Some(NONE_VERSION) {
                // Uninstall by removing the tool from the lockfile. Tools
                // that were never in the lockfile are silently ignored.
                tool.version = None;
                shed.lockfile.delete_tool(&tool);
                continue;
            }
            let display = tool.to_string();
            if let Err(e) = shed.lockfile.put_tool(tool) {
                return Err(ShedError::with_source(
                    Kind::Internal,
                    OP,
                    format!("failed to add tool {display} to lockfile"),
                    e,
                ));
            }
        }
        shed.write_lockfile(OP)
    }
}

// Returns concurrency, or the number of CPUs when it is zero, with a floor
// of one.
fn get_concurrency(concurrency: usize) -> usize {
    if concurrency > 0 {
        return concurrency;
    }
    num_cpus::get().max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::mock;
    use tempfile::TempDir;

    fn tool(import_path: &str, version: &str) -> Tool {
        Tool {
            import_path: import_path.to_string(),
            version: if version.is_empty() {
                None
            } else {
                Some(version.to_string())
            },
        }
    }

    fn create_lockfile(path: &Path, tools: &[Tool]) {
        let mut lockfile = Lockfile::new();
        for t in tools {
            lockfile.put_tool(t.clone()).expect("tool should be valid");
        }
        let mut file = File::create(path).unwrap();
        lockfile.write_to(&mut file).unwrap();
    }

    fn read_lockfile(path: &Path) -> Lockfile {
        Lockfile::parse(File::open(path).unwrap()).unwrap()
    }

    // A shed over a mock driver in its own temp directory. Passing None
    // means no lockfile exists yet.
    fn new_shed(dir: &TempDir, lockfile_tools: Option<&[Tool]>) -> Shed {
        let lockfile_path = dir.path().join(LOCKFILE_NAME);
        if let Some(tools) = lockfile_tools {
            create_lockfile(&lockfile_path, tools);
        }
        Shed::builder()
            .lockfile_path(&lockfile_path)
            .cache(Cache::new(
                dir.path().join("cache"),
                Arc::new(mock::fixture()),
            ))
            .build()
            .unwrap()
    }

    #[test]
    fn resolve_lockfile_path_walks_parents() {
        struct Case {
            name: &'static str,
            cwd: &'static str,
            location: Option<&'static str>,
            want: Option<&'static str>,
        }
        let cases = [
            Case {
                name: "current directory",
                cwd: "a/b",
                location: Some("a/b/shed.lock"),
                want: Some("a/b/shed.lock"),
            },
            Case {
                name: "parent directory",
                cwd: "a/b",
                location: Some("a/shed.lock"),
                want: Some("a/shed.lock"),
            },
            Case {
                name: "ancestor directory",
                cwd: "a/b/c/d",
                location: Some("a/shed.lock"),
                want: Some("a/shed.lock"),
            },
            Case {
                name: "does not look in sibling directory",
                cwd: "a/b",
                location: Some("a/c/shed.lock"),
                want: None,
            },
            Case {
                name: "does not exist",
                cwd: "a/b",
                location: None,
                want: None,
            },
        ];

        for case in cases {
            let td = TempDir::new().unwrap();
            if let Some(location) = case.location {
                let path = td.path().join(location);
                std::fs::create_dir_all(path.parent().unwrap()).unwrap();
                create_lockfile(&path, &[]);
            }
            let cwd = td.path().join(case.cwd);
            std::fs::create_dir_all(&cwd).unwrap();

            let got = resolve_lockfile_path(&cwd);
            let want = case.want.map(|w| td.path().join(w));
            assert_eq!(got, want, "case: {}", case.name);
        }
    }

    #[tokio::test]
    async fn install_latest() {
        let dir = TempDir::new().unwrap();
        let mut shed = new_shed(&dir, None);
        let cancel = CancellationToken::new();

        let install_set = shed
            .get(GetOptions {
                tool_names: vec![
                    "example.org/a/go-fish".to_string(),
                    "example.org/b/cmd/golint".to_string(),
                    "example.org/Org/ejson/cmd/ejson".to_string(),
                ],
                update: false,
            })
            .unwrap();
        assert_eq!(install_set.len(), 3);
        install_set.apply(&cancel).await.unwrap();

        let lockfile = read_lockfile(&dir.path().join(LOCKFILE_NAME));
        assert_eq!(lockfile.len_tools(), 3);
        for want in [
            tool("example.org/a/go-fish", "v0.1.0"),
            tool("example.org/b/cmd/golint", "v1.33.0"),
            tool("example.org/Org/ejson/cmd/ejson", "v1.2.2"),
        ] {
            assert_eq!(lockfile.get_tool(&want.import_path).unwrap(), want);
            let bin_path = shed.tool_path(&want.import_path).unwrap();
            assert!(bin_path.exists(), "binary for {want} should exist");
        }
    }

    #[tokio::test]
    async fn install_specific_versions() {
        let dir = TempDir::new().unwrap();
        let mut shed = new_shed(&dir, None);
        let cancel = CancellationToken::new();
        let names = vec![
            "example.org/a/go-fish@22d10c9b658df297b17b33c836a60fb943ef5a5f".to_string(),
            "example.org/b/cmd/golint@v1.28.3".to_string(),
            "example.org/Org/ejson/cmd/ejson@v1.1.0".to_string(),
        ];

        let install_set = shed
            .get(GetOptions {
                tool_names: names.clone(),
                update: false,
            })
            .unwrap();
        assert_eq!(install_set.len(), 3);
        install_set.apply(&cancel).await.unwrap();

        let lockfile_path = dir.path().join(LOCKFILE_NAME);
        let lockfile = read_lockfile(&lockfile_path);
        for want in [
            tool("example.org/a/go-fish", "v0.0.0-20201203230243-22d10c9b658d"),
            tool("example.org/b/cmd/golint", "v1.28.3"),
            tool("example.org/Org/ejson/cmd/ejson", "v1.1.0"),
        ] {
            assert_eq!(lockfile.get_tool(&want.import_path).unwrap(), want);
            assert!(shed.tool_path(&want.import_path).is_ok());
        }

        // Re-running the same request is a no-op.
        let before = std::fs::read(&lockfile_path).unwrap();
        let install_set = shed
            .get(GetOptions {
                tool_names: names,
                update: false,
            })
            .unwrap();
        assert_eq!(install_set.len(), 3);
        install_set.apply(&cancel).await.unwrap();
        assert_eq!(std::fs::read(&lockfile_path).unwrap(), before);
    }

    #[tokio::test]
    async fn install_from_lockfile() {
        let dir = TempDir::new().unwrap();
        let pinned = [
            tool("example.org/a/go-fish", "v0.1.0"),
            tool("example.org/b/cmd/golint", "v1.28.3"),
            tool("example.org/Org/ejson/cmd/ejson", "v1.1.0"),
        ];
        let mut shed = new_shed(&dir, Some(&pinned));
        let cancel = CancellationToken::new();

        let install_set = shed.get(GetOptions::default()).unwrap();
        assert_eq!(install_set.len(), 3);
        install_set.apply(&cancel).await.unwrap();

        let lockfile = read_lockfile(&dir.path().join(LOCKFILE_NAME));
        assert_eq!(lockfile.len_tools(), 3);
        for want in pinned {
            assert_eq!(lockfile.get_tool(&want.import_path).unwrap(), want);
            assert!(shed.tool_path(&want.import_path).is_ok());
        }
    }

    #[tokio::test]
    async fn update_single_tool() {
        let dir = TempDir::new().unwrap();
        let mut shed = new_shed(
            &dir,
            Some(&[
                tool("example.org/a/go-fish", "v0.1.0"),
                tool("example.org/b/cmd/golint", "v1.28.3"),
            ]),
        );
        let cancel = CancellationToken::new();

        let install_set = shed
            .get(GetOptions {
                tool_names: vec!["example.org/b/cmd/golint@v1.33.0".to_string()],
                update: false,
            })
            .unwrap();
        assert_eq!(install_set.len(), 2);
        install_set.apply(&cancel).await.unwrap();

        let lockfile = read_lockfile(&dir.path().join(LOCKFILE_NAME));
        assert_eq!(
            lockfile.get_tool("example.org/b/cmd/golint").unwrap(),
            tool("example.org/b/cmd/golint", "v1.33.0")
        );
        assert_eq!(
            lockfile.get_tool("example.org/a/go-fish").unwrap(),
            tool("example.org/a/go-fish", "v0.1.0")
        );
    }

    #[tokio::test]
    async fn remove_tools_via_none() {
        let dir = TempDir::new().unwrap();
        let mut shed = new_shed(
            &dir,
            Some(&[
                tool("example.org/a/go-fish", "v0.1.0"),
                tool("example.org/b/cmd/golint", "v1.28.3"),
                tool("example.org/Org/ejson/cmd/ejson", "v1.1.0"),
            ]),
        );
        let cancel = CancellationToken::new();

        let install_set = shed
            .get(GetOptions {
                tool_names: vec![
                    "example.org/b/cmd/golint@none".to_string(),
                    // Not in the lockfile; removing it is silently ignored.
                    "example.org/x/tools/cmd/stringer@none".to_string(),
                ],
                update: false,
            })
            .unwrap();
        assert_eq!(install_set.len(), 4);
        install_set.apply(&cancel).await.unwrap();

        let lockfile = read_lockfile(&dir.path().join(LOCKFILE_NAME));
        assert_eq!(lockfile.len_tools(), 2);
        assert!(lockfile.get_tool("example.org/a/go-fish").is_ok());
        assert!(lockfile.get_tool("example.org/Org/ejson/cmd/ejson").is_ok());
        assert_eq!(
            lockfile.get_tool("example.org/b/cmd/golint").unwrap_err().kind(),
            Kind::NotFound
        );
    }

    #[tokio::test]
    async fn get_collects_invalid_names() {
        let dir = TempDir::new().unwrap();
        let mut shed = new_shed(
            &dir,
            Some(&[tool("example.org/Org/ejson/cmd/ejson", "v1.1.0")]),
        );

        let err = shed
            .get(GetOptions {
                tool_names: vec![
                    "example.org/a/go-fish".to_string(),
                    // A short name is not a valid import path.
                    "golint".to_string(),
                    "example.org/Org/ejson/cmd/ejson@v1.2.2".to_string(),
                ],
                update: false,
            })
            .unwrap_err();
        assert_eq!(err.kind(), Kind::Invalid);
        assert_eq!(err.errors().map(ErrorList::len), Some(1));
    }

    #[test]
    fn get_update_rejects_pinned_version() {
        let dir = TempDir::new().unwrap();
        let mut shed = new_shed(&dir, None);

        let err = shed
            .get(GetOptions {
                tool_names: vec!["example.org/a/go-fish@v0.1.0".to_string()],
                update: true,
            })
            .unwrap_err();
        assert_eq!(err.kind(), Kind::Invalid);
    }

    #[test]
    fn get_update_all_skips_prereleases() {
        let dir = TempDir::new().unwrap();
        let mut shed = new_shed(
            &dir,
            Some(&[
                tool("example.org/b/cmd/golint", "v1.28.3"),
                tool(
                    "example.org/x/tools/cmd/stringer",
                    "v0.0.0-20201211185031-d93e913c1a58",
                ),
            ]),
        );

        let install_set = shed
            .get(GetOptions {
                tool_names: Vec::new(),
                update: true,
            })
            .unwrap();

        let find = |path: &str| {
            install_set
                .tools
                .iter()
                .find(|t| t.import_path == path)
                .unwrap()
                .clone()
        };
        assert_eq!(
            find("example.org/b/cmd/golint").version.as_deref(),
            Some("latest")
        );
        // The pseudo-version is a prerelease and is left pinned.
        assert_eq!(
            find("example.org/x/tools/cmd/stringer").version.as_deref(),
            Some("v0.0.0-20201211185031-d93e913c1a58")
        );
    }

    #[tokio::test]
    async fn apply_canceled_leaves_lockfile_untouched() {
        let dir = TempDir::new().unwrap();
        let mut shed = new_shed(
            &dir,
            Some(&[tool("example.org/a/go-fish", "v0.1.0")]),
        );
        let lockfile_path = dir.path().join(LOCKFILE_NAME);
        let before = std::fs::read(&lockfile_path).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();

        let install_set = shed
            .get(GetOptions {
                tool_names: vec!["example.org/b/cmd/golint".to_string()],
                update: false,
            })
            .unwrap();
        let err = install_set.apply(&cancel).await.unwrap_err();
        assert_eq!(err.kind(), Kind::Canceled);
        assert_eq!(std::fs::read(&lockfile_path).unwrap(), before);
    }

    #[tokio::test]
    async fn apply_notifies_completed_tools() {
        let dir = TempDir::new().unwrap();
        let mut shed = new_shed(&dir, None);
        let cancel = CancellationToken::new();

        let mut install_set = shed
            .get(GetOptions {
                tool_names: vec![
                    "example.org/a/go-fish".to_string(),
                    "example.org/b/cmd/golint".to_string(),
                ],
                update: false,
            })
            .unwrap();
        let (tx, mut rx) = mpsc::channel(install_set.len());
        install_set.notify(tx);
        install_set.apply(&cancel).await.unwrap();

        let mut notified = Vec::new();
        while let Ok(t) = rx.try_recv() {
            notified.push(t.import_path);
        }
        notified.sort_unstable();
        assert_eq!(
            notified,
            vec![
                "example.org/a/go-fish".to_string(),
                "example.org/b/cmd/golint".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn apply_aggregates_tool_failures() {
        let dir = TempDir::new().unwrap();
        let lockfile_path = dir.path().join(LOCKFILE_NAME);
        let mut shed = new_shed(&dir, None);
        let cancel = CancellationToken::new();

        // The mock catalogue has no such module, so this install fails while
        // the other succeeds.
        let install_set = shed
            .get(GetOptions {
                tool_names: vec![
                    "example.org/a/go-fish".to_string(),
                    "example.org/missing/cmd/nope".to_string(),
                ],
                update: false,
            })
            .unwrap();
        let err = install_set.apply(&cancel).await.unwrap_err();
        assert_eq!(err.errors().map(ErrorList::len), Some(1));
        // No lockfile was written.
        assert!(!lockfile_path.exists());
    }

    #[tokio::test]
    async fn list_tools() {
        let dir = TempDir::new().unwrap();
        let mut shed = new_shed(
            &dir,
            Some(&[
                tool("example.org/b/cmd/golint", "v1.33.0"),
                tool("example.org/a/go-fish", "v0.1.0"),
                tool("example.org/Org/ejson/cmd/ejson", "v1.2.2"),
            ]),
        );
        let cancel = CancellationToken::new();
        shed.get(GetOptions::default())
            .unwrap()
            .apply(&cancel)
            .await
            .unwrap();

        let got = shed.list(&cancel, ListOptions::default()).await.unwrap();
        let want = vec![
            ToolInfo {
                tool: tool("example.org/Org/ejson/cmd/ejson", "v1.2.2"),
                latest_version: None,
            },
            ToolInfo {
                tool: tool("example.org/a/go-fish", "v0.1.0"),
                latest_version: None,
            },
            ToolInfo {
                tool: tool("example.org/b/cmd/golint", "v1.33.0"),
                latest_version: None,
            },
        ];
        assert_eq!(got, want);
    }

    #[tokio::test]
    async fn list_tools_with_updates() {
        let dir = TempDir::new().unwrap();
        let mut shed = new_shed(
            &dir,
            Some(&[
                tool("example.org/b/cmd/golint", "v1.28.3"),
                tool("example.org/a/go-fish", "v0.1.0"),
                tool("example.org/Org/ejson/cmd/ejson", "v1.1.0"),
            ]),
        );
        let cancel = CancellationToken::new();
        shed.get(GetOptions::default())
            .unwrap()
            .apply(&cancel)
            .await
            .unwrap();

        let got = shed
            .list(
                &cancel,
                ListOptions {
                    show_updates: true,
                    concurrency: 0,
                },
            )
            .await
            .unwrap();
        let want = vec![
            ToolInfo {
                tool: tool("example.org/Org/ejson/cmd/ejson", "v1.1.0"),
                latest_version: Some("v1.2.2".to_string()),
            },
            ToolInfo {
                tool: tool("example.org/a/go-fish", "v0.1.0"),
                latest_version: None,
            },
            ToolInfo {
                tool: tool("example.org/b/cmd/golint", "v1.28.3"),
                latest_version: Some("v1.33.0".to_string()),
            },
        ];
        assert_eq!(got, want);
    }

    #[tokio::test]
    async fn list_updates_fails_for_uninstalled_tool() {
        let dir = TempDir::new().unwrap();
        // In the lockfile but never installed, so the update probe fails.
        let shed = new_shed(
            &dir,
            Some(&[tool("example.org/a/go-fish", "v0.1.0")]),
        );
        let cancel = CancellationToken::new();

        let err = shed
            .list(
                &cancel,
                ListOptions {
                    show_updates: true,
                    concurrency: 0,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Kind::NotInstalled);
    }

    #[tokio::test]
    async fn tool_path_by_short_name() {
        let dir = TempDir::new().unwrap();
        let mut shed = new_shed(&dir, None);
        let cancel = CancellationToken::new();
        shed.get(GetOptions {
            tool_names: vec!["example.org/a/go-fish".to_string()],
            update: false,
        })
        .unwrap()
        .apply(&cancel)
        .await
        .unwrap();

        assert!(shed.tool_path("go-fish").is_ok());
        assert_eq!(
            shed.tool_path("stress").unwrap_err().kind(),
            Kind::NotFound
        );
    }

    #[test]
    fn builder_creates_cache_dir() {
        let dir = TempDir::new().unwrap();
        let shed = new_shed(&dir, None);
        assert!(shed.cache_dir().exists());

        shed.clean_cache().unwrap();
        assert!(!shed.cache_dir().exists());
    }
}
