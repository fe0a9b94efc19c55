//! The shed lockfile: a catalogue of installed tools and their versions.
//!
//! The lockfile keeps track of installed tools so shed can always re-install
//! the same version of each tool. Tools are stored in a vector with a
//! secondary index from short name to positions, which gives O(1) lookup by
//! binary name and O(1) detection of name collisions. When multiple tools
//! share a name, the full import path is required to pick one.

use crate::error::{ErrorList, Kind, ShedError, ShedResult};
use crate::tool::Tool;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::io;

/// An in-memory shed lockfile.
///
/// A default `Lockfile` is a valid empty lockfile ready for use.
#[derive(Debug, Default)]
pub struct Lockfile {
    tools: Vec<Tool>,
    // Short name to positions in tools. Kept in lockstep with the vector;
    // buckets hold positions only, never tools.
    index: HashMap<String, Vec<usize>>,
}

impl Lockfile {
    /// Create an empty lockfile.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of tools in the lockfile.
    pub fn len_tools(&self) -> usize {
        self.tools.len()
    }

    /// Retrieve the tool with the given name from the lockfile.
    ///
    /// `name` can either be the name of the binary itself or the full import
    /// path, optionally with an `@version` suffix. If the name is a full
    /// import path with a version and the stored version differs,
    /// [`Kind::IncorrectVersion`] is returned and the error carries the
    /// stored tool.
    pub fn get_tool(&self, name: &str) -> ShedResult<Tool> {
        const OP: &str = "Lockfile::get_tool";

        // Fast path: assume the name is a short name and look it up directly.
        if let Some(bucket) = self.index.get(name) {
            if bucket.len() > 1 {
                return Err(ShedError::new(
                    Kind::MultipleTools,
                    OP,
                    format!("{} tools named {} found", bucket.len(), name),
                ));
            }
            return Ok(self.tools[bucket[0]].clone());
        }

        // Without a slash it can only have been a short name, so report not
        // found instead of trying to parse it.
        if !name.contains('/') {
            return Err(ShedError::new(Kind::NotFound, OP, name));
        }

        let query = Tool::parse_lax(name)?;
        let tool_name = query.name();
        let Some(bucket) = self.index.get(tool_name) else {
            return Err(ShedError::new(Kind::NotFound, OP, tool_name));
        };
        for &i in bucket {
            let stored = &self.tools[i];
            if stored.import_path != query.import_path {
                continue;
            }
            if let Some(wanted) = &query.version {
                if stored.version.as_deref() != Some(wanted.as_str()) {
                    return Err(ShedError::new(
                        Kind::IncorrectVersion,
                        OP,
                        format!("wanted {wanted}"),
                    )
                    .with_tool(stored.clone()));
                }
            }
            return Ok(stored.clone());
        }
        Err(ShedError::new(Kind::NotFound, OP, tool_name))
    }

    /// Add or replace the given tool in the lockfile.
    ///
    /// The tool must have an exact semantic version, otherwise it would
    /// defeat the purpose of a lockfile; [`Kind::InvalidVersion`] is
    /// returned if it does not.
    pub fn put_tool(&mut self, tool: Tool) -> ShedResult<()> {
        const OP: &str = "Lockfile::put_tool";

        if !tool.has_semver() {
            return Err(ShedError::new(Kind::InvalidVersion, OP, tool.to_string()));
        }

        let bucket = self.index.entry(tool.name().to_string()).or_default();
        for &i in bucket.iter() {
            if self.tools[i].import_path == tool.import_path {
                self.tools[i] = tool;
                return Ok(());
            }
        }
        bucket.push(self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Remove the given tool from the lockfile if it exists.
    ///
    /// If the tool has a version, it is only deleted when the stored version
    /// matches. Deleting an absent tool is a no-op.
    pub fn delete_tool(&mut self, tool: &Tool) {
        let name = tool.name();
        let Some(bucket) = self.index.get(name) else {
            return;
        };
        let Some(bucket_idx) = bucket.iter().position(|&i| {
            let stored = &self.tools[i];
            stored.import_path == tool.import_path
                && tool
                    .version
                    .as_ref()
                    .is_none_or(|v| stored.version.as_deref() == Some(v.as_str()))
        }) else {
            return;
        };
        let pos = bucket[bucket_idx];

        self.tools.swap_remove(pos);
        // The former last element now lives at pos; repoint its index entry.
        if pos < self.tools.len() {
            let moved_old = self.tools.len();
            let moved_name = self.tools[pos].name().to_string();
            if let Some(moved_bucket) = self.index.get_mut(&moved_name) {
                for slot in moved_bucket.iter_mut() {
                    if *slot == moved_old {
                        *slot = pos;
                    }
                }
            }
        }

        if let Some(bucket) = self.index.get_mut(name) {
            bucket.swap_remove(bucket_idx);
            if bucket.is_empty() {
                self.index.remove(name);
            }
        }
    }

    /// Iterate over the tools in the lockfile. Each tool is produced exactly
    /// once; the order is unspecified.
    pub fn iter(&self) -> std::slice::Iter<'_, Tool> {
        self.tools.iter()
    }

    /// Serialize and write the lockfile to `w`, returning the number of
    /// bytes written.
    pub fn write_to(&self, w: &mut impl io::Write) -> ShedResult<u64> {
        const OP: &str = "Lockfile::write_to";

        let mut schema = LockfileSchema {
            tools: BTreeMap::new(),
        };
        for tool in &self.tools {
            schema.tools.insert(
                tool.import_path.clone(),
                ToolSchema {
                    version: tool.version.clone().unwrap_or_default(),
                },
            );
        }

        let data = serde_json::to_vec_pretty(&schema).map_err(|e| {
            ShedError::with_source(Kind::Internal, OP, "failed to serialize as JSON", e)
        })?;
        w.write_all(&data)
            .map_err(|e| ShedError::io(OP, "failed to write lockfile", e))?;
        Ok(data.len() as u64)
    }

    /// Read and parse a lockfile from `r`.
    ///
    /// Errors are collected across all entries and returned together; a
    /// lockfile with any invalid entry fails to parse as a whole.
    pub fn parse(r: impl io::Read) -> ShedResult<Lockfile> {
        const OP: &str = "Lockfile::parse";

        let schema: LockfileSchema = serde_json::from_reader(r).map_err(|e| {
            ShedError::with_source(Kind::BadState, OP, "failed to deserialize JSON", e)
        })?;

        let mut lockfile = Lockfile::new();
        let mut errs = ErrorList::new();
        for (import_path, tool_schema) in schema.tools {
            match Tool::parse(&format!("{}@{}", import_path, tool_schema.version)) {
                Ok(tool) => {
                    if let Err(e) = lockfile.put_tool(tool) {
                        errs.push(e);
                    }
                }
                Err(e) => errs.push(e),
            }
        }
        if !errs.is_empty() {
            return Err(ShedError::aggregate(OP, "failed to parse lockfile", errs));
        }
        Ok(lockfile)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LockfileSchema {
    #[serde(default)]
    tools: BTreeMap<String, ToolSchema>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ToolSchema {
    version: String,
}
