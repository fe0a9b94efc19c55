//! The [`Tool`] type, the identity of a tool managed by shed.
//!
//! A tool is named by the import path of its executable package plus an
//! optional module version. Tools map onto the cache filesystem through the
//! escaping rules for module paths: an uppercase letter `X` is stored as
//! `!x` so that paths stay unambiguous on case-insensitive filesystems.

use crate::error::{Kind, ShedError, ShedResult};
use crate::version;
use std::fmt;
use std::path::PathBuf;

/// A tool managed by shed. In most cases this corresponds to a Go module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Tool {
    /// The import path for the tool. This is the full path to the package
    /// containing the executable, not just the module. For the stringer tool
    /// this is `golang.org/x/tools/cmd/stringer`, not `golang.org/x/tools`.
    pub import_path: String,
    /// The version of the module the tool belongs to. `None` means the
    /// latest version is desired where allowed.
    pub version: Option<String>,
}

impl Tool {
    /// The name of the tool, i.e. the name of the binary produced.
    /// It is the last component of the import path.
    pub fn name(&self) -> &str {
        self.import_path.rsplit('/').next().unwrap_or("")
    }

    /// The module string suitable for commands like `go get`:
    /// `import_path@version`, or just the import path if there is no version.
    pub fn module(&self) -> String {
        match &self.version {
            Some(v) => format!("{}@{}", self.import_path, v),
            None => self.import_path.clone(),
        }
    }

    /// Reports whether the version is a full semantic version.
    /// Shorthands like `v1` or `v1.2` do not count.
    pub fn has_semver(&self) -> bool {
        self.version.as_deref().is_some_and(version::is_canonical)
    }

    /// The relative OS filesystem path represented by this tool, following
    /// the escape rules for module paths.
    pub fn filepath(&self) -> ShedResult<PathBuf> {
        const OP: &str = "Tool::filepath";
        check_path(&self.import_path).map_err(|reason| {
            ShedError::new(
                Kind::Invalid,
                OP,
                format!("failed to escape path {:?}: {}", self.import_path, reason),
            )
        })?;

        let version_part = match &self.version {
            Some(v) => {
                check_version(v).map_err(|reason| {
                    ShedError::new(
                        Kind::Invalid,
                        OP,
                        format!("failed to escape version {v:?}: {reason}"),
                    )
                })?;
                Some(escape(v))
            }
            None => None,
        };

        let mut path = PathBuf::new();
        let escaped = escape(&self.import_path);
        let mut segments = escaped.split('/').peekable();
        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                match &version_part {
                    Some(v) => path.push(format!("{segment}@{v}")),
                    None => path.push(segment),
                }
            } else {
                path.push(segment);
            }
        }
        Ok(path)
    }

    /// The relative OS filesystem path to the tool binary:
    /// [`Tool::filepath`] joined with [`Tool::name`].
    pub fn binary_filepath(&self) -> ShedResult<PathBuf> {
        Ok(self.filepath()?.join(self.name()))
    }

    /// Parse a tool from `IMPORT_PATH[@VERSION]`, the same format passed to
    /// `go get`. The version, when present, must be a semantic version;
    /// shorthands are canonicalised (`v1` becomes `v1.0.0`).
    pub fn parse(name: &str) -> ShedResult<Tool> {
        parse_tool(name, true)
    }

    /// Like [`Tool::parse`] but without validating the version, so module
    /// queries (a branch name, commit SHA, or version range) pass through
    /// verbatim for the toolchain to resolve. Shorthand versions are not
    /// canonicalised. Omitting the version means the latest version.
    pub fn parse_lax(name: &str) -> ShedResult<Tool> {
        parse_tool(name, false)
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.module())
    }
}

fn parse_tool(name: &str, strict: bool) -> ShedResult<Tool> {
    const OP: &str = "Tool::parse";

    let (path, version) = match name.find('@') {
        Some(i) => (&name[..i], Some(&name[i + 1..])),
        None => (name, None),
    };
    // A dangling '@' is an error in both modes.
    if version == Some("") {
        return Err(ShedError::new(Kind::Invalid, OP, "missing version after '@'"));
    }

    check_path(path).map_err(|reason| {
        ShedError::new(Kind::Invalid, OP, format!("invalid import path {path:?}: {reason}"))
    })?;

    let mut tool = Tool {
        import_path: path.to_string(),
        version: version.map(str::to_string),
    };
    if strict {
        if let Some(v) = &tool.version {
            match version::canonical(v) {
                Some(canonical) => tool.version = Some(canonical),
                None => {
                    return Err(ShedError::new(
                        Kind::Invalid,
                        OP,
                        format!("invalid version {v:?}: not a semantic version"),
                    ));
                }
            }
        }
    }
    Ok(tool)
}

// Validates an import path against the module path grammar: slash-separated
// non-empty elements of letters, digits and `-._~`, with at least one dot in
// the first element (the registry domain).
fn check_path(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("path is empty".to_string());
    }
    for c in path.chars() {
        if !c.is_ascii_alphanumeric() && !matches!(c, '-' | '.' | '_' | '~' | '/') {
            return Err(format!("invalid char {c:?}"));
        }
    }
    if path.starts_with('/') || path.ends_with('/') {
        return Err("leading or trailing slash".to_string());
    }
    for (i, element) in path.split('/').enumerate() {
        if element.is_empty() {
            return Err("empty path element".to_string());
        }
        if element.starts_with('.') || element.ends_with('.') {
            return Err("path element starts or ends with a dot".to_string());
        }
        if i == 0 && !element.contains('.') {
            return Err("missing dot in first path element".to_string());
        }
    }
    Ok(())
}

// Versions additionally allow '+' for build metadata but no slashes.
fn check_version(v: &str) -> Result<(), String> {
    if v.is_empty() {
        return Err("version is empty".to_string());
    }
    for c in v.chars() {
        if !c.is_ascii_alphanumeric() && !matches!(c, '-' | '.' | '_' | '~' | '+') {
            return Err(format!("invalid char {c:?}"));
        }
    }
    Ok(())
}

// Escape a path or version for the filesystem: each uppercase letter is
// replaced by '!' followed by its lowercase form.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_ascii_uppercase() {
            out.push('!');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
