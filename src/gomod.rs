//! A minimal model of `go.mod` module manifests.
//!
//! The cache engine creates throwaway manifests to resolve tools and needs
//! to read back the require directives the toolchain writes into them. Only
//! the `module`, `go`, and `require` directives are modelled; other
//! directives are skipped.

use crate::error::{Kind, ShedError, ShedResult};
use std::fmt;

/// Name of the module manifest file.
pub const MANIFEST_NAME: &str = "go.mod";

/// A require directive in a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Require {
    /// The required module path.
    pub path: String,
    /// The required module version.
    pub version: String,
    /// Whether the requirement is marked `// indirect`.
    pub indirect: bool,
}

impl Require {
    /// Reports whether this require provides the package at `import_path`,
    /// i.e. whether the require path is a path prefix of it. The module
    /// `example.org/x/tools` provides `example.org/x/tools/cmd/stringer`.
    pub fn provides(&self, import_path: &str) -> bool {
        import_path == self.path
            || import_path
                .strip_prefix(&self.path)
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

impl fmt::Display for Require {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.path, self.version)?;
        if self.indirect {
            write!(f, " // indirect")?;
        }
        Ok(())
    }
}

/// An in-memory module manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// The module path declared by the manifest.
    pub module: String,
    /// The declared go language version, if any.
    pub go_version: Option<String>,
    /// The require directives, in order of appearance.
    pub requires: Vec<Require>,
}

impl Manifest {
    /// Create an empty manifest for the given module.
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            go_version: None,
            requires: Vec::new(),
        }
    }

    /// Parse manifest text.
    pub fn parse(data: &str) -> ShedResult<Self> {
        const OP: &str = "Manifest::parse";

        let mut module = None;
        let mut go_version = None;
        let mut requires = Vec::new();
        // Some(true) inside a require block, Some(false) inside a block that
        // is skipped.
        let mut block: Option<bool> = None;

        for (i, raw) in data.lines().enumerate() {
            let lineno = i + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with("//") {
                continue;
            }

            if let Some(is_require) = block {
                if line == ")" {
                    block = None;
                } else if is_require {
                    requires.push(parse_require(line, lineno)?);
                }
                continue;
            }

            let mut fields = line.split_whitespace();
            match fields.next() {
                Some("module") => {
                    module = fields.next().map(|s| s.trim_matches('"').to_string());
                }
                Some("go") => {
                    go_version = fields.next().map(str::to_string);
                }
                Some("require") => {
                    let rest = line["require".len()..].trim();
                    if rest == "(" {
                        block = Some(true);
                    } else {
                        requires.push(parse_require(rest, lineno)?);
                    }
                }
                _ => {
                    // exclude, replace, retract and anything else.
                    if line.ends_with('(') {
                        block = Some(false);
                    }
                }
            }
        }

        let Some(module) = module else {
            return Err(ShedError::new(Kind::BadState, OP, "missing module directive"));
        };
        Ok(Self {
            module,
            go_version,
            requires,
        })
    }

    /// Find the require directive that provides the package at `import_path`.
    pub fn find_require(&self, import_path: &str) -> Option<&Require> {
        self.requires.iter().find(|r| r.provides(import_path))
    }

    /// Mark the require for the exact module `path` as a direct dependency.
    /// Returns whether the manifest changed.
    pub fn set_direct(&mut self, path: &str) -> bool {
        for require in &mut self.requires {
            if require.path == path && require.indirect {
                require.indirect = false;
                return true;
            }
        }
        false
    }
}

impl fmt::Display for Manifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "module {}", self.module)?;
        if let Some(go) = &self.go_version {
            writeln!(f)?;
            writeln!(f, "go {go}")?;
        }
        match self.requires.as_slice() {
            [] => {}
            [require] => {
                writeln!(f)?;
                writeln!(f, "require {require}")?;
            }
            requires => {
                writeln!(f)?;
                writeln!(f, "require (")?;
                for require in requires {
                    writeln!(f, "\t{require}")?;
                }
                writeln!(f, ")")?;
            }
        }
        Ok(())
    }
}

fn parse_require(line: &str, lineno: usize) -> ShedResult<Require> {
    const OP: &str = "Manifest::parse";

    let indirect = line.contains("// indirect");
    let entry = line.split("//").next().unwrap_or(line).trim();
    let mut fields = entry.split_whitespace();
    let (Some(path), Some(version)) = (fields.next(), fields.next()) else {
        return Err(ShedError::new(
            Kind::BadState,
            OP,
            format!("malformed require directive on line {lineno}"),
        ));
    };
    if fields.next().is_some() {
        return Err(ShedError::new(
            Kind::BadState,
            OP,
            format!("malformed require directive on line {lineno}"),
        ));
    }
    Ok(Require {
        path: path.trim_matches('"').to_string(),
        version: version.to_string(),
        indirect,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_single_require() {
        let m = Manifest::parse("module _\n\ngo 1.16\n\nrequire example.org/x/tools v0.1.0\n")
            .unwrap();
        assert_eq!(m.module, "_");
        assert_eq!(m.go_version.as_deref(), Some("1.16"));
        assert_eq!(
            m.requires,
            vec![Require {
                path: "example.org/x/tools".to_string(),
                version: "v0.1.0".to_string(),
                indirect: false,
            }]
        );
    }

    #[test]
    fn parse_require_block() {
        let data = "\
module _

require (
\texample.org/x/tools v0.1.0 // indirect
\texample.org/a/go-fish v0.2.0
)

exclude (
\texample.org/broken v0.0.1
)
";
        let m = Manifest::parse(data).unwrap();
        assert_eq!(m.requires.len(), 2);
        assert!(m.requires[0].indirect);
        assert!(!m.requires[1].indirect);
        assert_eq!(m.requires[1].path, "example.org/a/go-fish");
    }

    #[test]
    fn parse_missing_module() {
        let err = Manifest::parse("require example.org/x/tools v0.1.0\n").unwrap_err();
        assert_eq!(err.kind(), Kind::BadState);
    }

    #[test]
    fn parse_malformed_require() {
        assert!(Manifest::parse("module _\nrequire example.org/x/tools\n").is_err());
        assert!(Manifest::parse("module _\nrequire a b c\n").is_err());
    }

    #[test]
    fn require_provides() {
        let require = Require {
            path: "example.org/x/tools".to_string(),
            version: "v0.1.0".to_string(),
            indirect: false,
        };
        assert!(require.provides("example.org/x/tools"));
        assert!(require.provides("example.org/x/tools/cmd/stringer"));
        // Prefix matching is per path element, not per character.
        assert!(!require.provides("example.org/x/toolsextra"));
        assert!(!require.provides("example.org/x"));
    }

    #[test]
    fn find_require() {
        let m = Manifest::parse(
            "module _\n\nrequire (\n\texample.org/a/go-fish v0.1.0\n\texample.org/x/tools v0.2.0\n)\n",
        )
        .unwrap();
        let require = m.find_require("example.org/x/tools/cmd/stringer").unwrap();
        assert_eq!(require.path, "example.org/x/tools");
        assert!(m.find_require("example.org/z/stringer").is_none());
    }

    #[test]
    fn set_direct() {
        let mut m =
            Manifest::parse("module _\n\nrequire example.org/x/tools v0.1.0 // indirect\n")
                .unwrap();
        assert!(m.set_direct("example.org/x/tools"));
        assert!(!m.requires[0].indirect);
        // Already direct, nothing to change.
        assert!(!m.set_direct("example.org/x/tools"));
    }

    #[test]
    fn render_round_trip() {
        let m = Manifest {
            module: "_".to_string(),
            go_version: Some("1.16".to_string()),
            requires: vec![
                Require {
                    path: "example.org/a/go-fish".to_string(),
                    version: "v0.1.0".to_string(),
                    indirect: false,
                },
                Require {
                    path: "example.org/x/tools".to_string(),
                    version: "v0.2.0".to_string(),
                    indirect: true,
                },
            ],
        };
        assert_eq!(Manifest::parse(&m.to_string()).unwrap(), m);

        let single = Manifest {
            module: "_".to_string(),
            go_version: None,
            requires: vec![Require {
                path: "example.org/a/go-fish".to_string(),
                version: "v0.1.0".to_string(),
                indirect: false,
            }],
        };
        assert_eq!(Manifest::parse(&single.to_string()).unwrap(), single);
    }
}
