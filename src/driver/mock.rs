//! A deterministic in-memory toolchain driver for tests.

use super::{GoDriver, ModuleInfo};
use crate::error::{Kind, ShedError, ShedResult};
use crate::gomod::{self, Manifest, Require};
use crate::tool::Tool;
use crate::version;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;
use tokio_util::sync::CancellationToken;

/// Catalogue of available tools: import path to a map of version queries to
/// the resolved canonical version.
pub type Catalogue = HashMap<String, HashMap<String, String>>;

/// A toolchain driver backed by a fixed in-memory catalogue.
///
/// `MockGo` mimics just enough of the go command for the cache engine:
/// `mod_init` writes a bare manifest, `get` resolves a query against the
/// catalogue and rewrites the manifest's require, and `build` writes a small
/// deterministic placeholder binary. Tools whose import path contains a
/// `cmd/` element resolve to the module rooted above it, like real module
/// layouts do.
#[derive(Debug, Clone)]
pub struct MockGo {
    tools: Catalogue,
}

impl MockGo {
    /// Create a mock driver over the given catalogue. Every resolved version
    /// must be a canonical semantic version.
    pub fn new(tools: Catalogue) -> ShedResult<Self> {
        const OP: &str = "MockGo::new";
        for (path, versions) in &tools {
            for resolved in versions.values() {
                if !version::is_canonical(resolved) {
                    return Err(ShedError::new(
                        Kind::Invalid,
                        OP,
                        format!("resolved version {resolved:?} for {path} is not a canonical semver"),
                    ));
                }
            }
        }
        Ok(Self { tools })
    }

    fn module_path(import_path: &str) -> &str {
        match import_path.find("/cmd/") {
            Some(i) => &import_path[..i],
            None => import_path,
        }
    }

    // The highest resolved version the catalogue offers for a module.
    fn latest_for_module(&self, module_path: &str) -> Option<&str> {
        self.tools
            .iter()
            .filter(|(import_path, _)| Self::module_path(import_path) == module_path)
            .flat_map(|(_, versions)| versions.values())
            .map(String::as_str)
            .max_by(|a, b| version::compare(a, b))
    }

    async fn read_manifest(op: &'static str, work_dir: &Path) -> ShedResult<Manifest> {
        let path = work_dir.join(gomod::MANIFEST_NAME);
        let data = fs::read_to_string(&path)
            .await
            .map_err(|e| ShedError::io(op, format!("failed to read {}", path.display()), e))?;
        Manifest::parse(&data)
    }
}

#[async_trait]
impl GoDriver for MockGo {
    async fn get(
        &self,
        cancel: &CancellationToken,
        module: &str,
        work_dir: &Path,
    ) -> ShedResult<()> {
        const OP: &str = "MockGo::get";
        if cancel.is_cancelled() {
            return Err(ShedError::canceled(OP));
        }

        let tool = Tool::parse_lax(module)?;
        let Some(versions) = self.tools.get(&tool.import_path) else {
            return Err(ShedError::new(
                Kind::Go,
                OP,
                format!("module not found: {}", tool.import_path),
            ));
        };
        let query = tool.version.as_deref().unwrap_or("latest");
        let resolved = if query == "latest" {
            versions
                .values()
                .map(String::as_str)
                .max_by(|a, b| version::compare(a, b))
        } else {
            versions.get(query).map(String::as_str)
        };
        let Some(resolved) = resolved else {
            return Err(ShedError::new(
                Kind::Go,
                OP,
                format!("no matching versions for query {query:?}: {}", tool.import_path),
            ));
        };

        let mut manifest = Self::read_manifest(OP, work_dir).await?;
        // go get marks requirements of unimported packages as indirect.
        manifest.requires = vec![Require {
            path: Self::module_path(&tool.import_path).to_string(),
            version: resolved.to_string(),
            indirect: true,
        }];
        let path = work_dir.join(gomod::MANIFEST_NAME);
        fs::write(&path, manifest.to_string())
            .await
            .map_err(|e| ShedError::io(OP, format!("failed to write {}", path.display()), e))?;
        Ok(())
    }

    async fn build(
        &self,
        cancel: &CancellationToken,
        import_path: &str,
        output: &Path,
        work_dir: &Path,
    ) -> ShedResult<()> {
        const OP: &str = "MockGo::build";
        if cancel.is_cancelled() {
            return Err(ShedError::canceled(OP));
        }

        let manifest = Self::read_manifest(OP, work_dir).await?;
        let Some(require) = manifest.find_require(import_path) else {
            return Err(ShedError::new(
                Kind::Go,
                OP,
                format!("no required module provides package {import_path}"),
            ));
        };

        let name = import_path.rsplit('/').next().unwrap_or(import_path);
        let contents = format!("#!/bin/sh\necho {} {}\n", name, require.version);
        fs::write(output, contents)
            .await
            .map_err(|e| ShedError::io(OP, format!("failed to write {}", output.display()), e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(output, std::fs::Permissions::from_mode(0o755))
                .await
                .map_err(|e| {
                    ShedError::io(OP, format!("failed to chmod {}", output.display()), e)
                })?;
        }
        Ok(())
    }

    async fn list_update(
        &self,
        cancel: &CancellationToken,
        module_path: &str,
        work_dir: &Path,
    ) -> ShedResult<ModuleInfo> {
        const OP: &str = "MockGo::list_update";
        if cancel.is_cancelled() {
            return Err(ShedError::canceled(OP));
        }

        let manifest = Self::read_manifest(OP, work_dir).await?;
        let Some(require) = manifest.requires.iter().find(|r| r.path == module_path) else {
            return Err(ShedError::new(
                Kind::Go,
                OP,
                format!("module {module_path} is not required by go.mod"),
            ));
        };
        let update = self
            .latest_for_module(module_path)
            .filter(|latest| {
                version::compare(latest, &require.version) == std::cmp::Ordering::Greater
            })
            .map(str::to_string);
        Ok(ModuleInfo {
            path: module_path.to_string(),
            version: require.version.clone(),
            update,
        })
    }

    async fn mod_init(
        &self,
        cancel: &CancellationToken,
        name: &str,
        work_dir: &Path,
    ) -> ShedResult<()> {
        const OP: &str = "MockGo::mod_init";
        if cancel.is_cancelled() {
            return Err(ShedError::canceled(OP));
        }

        let path = work_dir.join(gomod::MANIFEST_NAME);
        fs::write(&path, Manifest::new(name).to_string())
            .await
            .map_err(|e| ShedError::io(OP, format!("failed to write {}", path.display()), e))?;
        Ok(())
    }
}

// Shared catalogue for the end-to-end tests in cache and client.
#[cfg(test)]
pub(crate) fn fixture() -> MockGo {
    let mut tools = Catalogue::new();
    tools.insert(
        "example.org/a/go-fish".to_string(),
        HashMap::from([
            ("v0.1.0".to_string(), "v0.1.0".to_string()),
            (
                "22d10c9b658df297b17b33c836a60fb943ef5a5f".to_string(),
                "v0.0.0-20201203230243-22d10c9b658d".to_string(),
            ),
        ]),
    );
    tools.insert(
        "example.org/b/cmd/golint".to_string(),
        HashMap::from([
            ("v1.33.0".to_string(), "v1.33.0".to_string()),
            ("v1.28.3".to_string(), "v1.28.3".to_string()),
        ]),
    );
    tools.insert(
        "example.org/x/tools/cmd/stringer".to_string(),
        HashMap::from([(
            "v0.0.0-20201211185031-d93e913c1a58".to_string(),
            "v0.0.0-20201211185031-d93e913c1a58".to_string(),
        )]),
    );
    tools.insert(
        "example.org/Org/ejson/cmd/ejson".to_string(),
        HashMap::from([
            ("v1.2.2".to_string(), "v1.2.2".to_string()),
            ("v1.1.0".to_string(), "v1.1.0".to_string()),
        ]),
    );
    tools.insert(
        "example.org/z/stringer/v2/cmd/stringer".to_string(),
        HashMap::from([("v2.1.0".to_string(), "v2.1.0".to_string())]),
    );
    MockGo::new(tools).expect("fixture catalogue is valid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn new_rejects_non_canonical_versions() {
        let mut tools = Catalogue::new();
        tools.insert(
            "example.org/a/go-fish".to_string(),
            HashMap::from([("latest".to_string(), "v1".to_string())]),
        );
        let err = MockGo::new(tools).unwrap_err();
        assert_eq!(err.kind(), Kind::Invalid);
    }

    #[tokio::test]
    async fn get_resolves_latest() {
        let mock = fixture();
        let cancel = CancellationToken::new();
        let dir = TempDir::new().unwrap();

        mock.mod_init(&cancel, "_", dir.path()).await.unwrap();
        mock.get(&cancel, "example.org/b/cmd/golint", dir.path())
            .await
            .unwrap();

        let manifest = MockGo::read_manifest("test", dir.path()).await.unwrap();
        assert_eq!(manifest.requires.len(), 1);
        assert_eq!(manifest.requires[0].path, "example.org/b");
        assert_eq!(manifest.requires[0].version, "v1.33.0");
    }

    #[tokio::test]
    async fn get_resolves_query() {
        let mock = fixture();
        let cancel = CancellationToken::new();
        let dir = TempDir::new().unwrap();

        mock.mod_init(&cancel, "_", dir.path()).await.unwrap();
        mock.get(
            &cancel,
            "example.org/a/go-fish@22d10c9b658df297b17b33c836a60fb943ef5a5f",
            dir.path(),
        )
        .await
        .unwrap();

        let manifest = MockGo::read_manifest("test", dir.path()).await.unwrap();
        assert_eq!(
            manifest.requires[0].version,
            "v0.0.0-20201203230243-22d10c9b658d"
        );
    }

    #[tokio::test]
    async fn get_unknown_module() {
        let mock = fixture();
        let cancel = CancellationToken::new();
        let dir = TempDir::new().unwrap();

        mock.mod_init(&cancel, "_", dir.path()).await.unwrap();
        let err = mock
            .get(&cancel, "example.org/nope/cmd/nope", dir.path())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Kind::Go);
    }

    #[tokio::test]
    async fn list_update_reports_newer_version() {
        let mock = fixture();
        let cancel = CancellationToken::new();
        let dir = TempDir::new().unwrap();

        mock.mod_init(&cancel, "_", dir.path()).await.unwrap();
        mock.get(&cancel, "example.org/Org/ejson/cmd/ejson@v1.1.0", dir.path())
            .await
            .unwrap();

        let info = mock
            .list_update(&cancel, "example.org/Org/ejson", dir.path())
            .await
            .unwrap();
        assert_eq!(info.version, "v1.1.0");
        assert_eq!(info.update.as_deref(), Some("v1.2.2"));
    }

    #[tokio::test]
    async fn list_update_no_newer_version() {
        let mock = fixture();
        let cancel = CancellationToken::new();
        let dir = TempDir::new().unwrap();

        mock.mod_init(&cancel, "_", dir.path()).await.unwrap();
        mock.get(&cancel, "example.org/a/go-fish@v0.1.0", dir.path())
            .await
            .unwrap();

        let info = mock
            .list_update(&cancel, "example.org/a/go-fish", dir.path())
            .await
            .unwrap();
        assert_eq!(info.update, None);
    }

    #[tokio::test]
    async fn cancelled_token_aborts() {
        let mock = fixture();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let dir = TempDir::new().unwrap();

        let err = mock.mod_init(&cancel, "_", dir.path()).await.unwrap_err();
        assert_eq!(err.kind(), Kind::Canceled);
    }
}
