//! Error types for shed.
//!
//! All modules use [`ShedResult<T>`] as their return type. Every error
//! carries a [`Kind`] so callers can decide how to react, the operation that
//! produced it, and the underlying cause chain.

use crate::tool::Tool;
use std::error;
use std::fmt;
use thiserror::Error;

/// Result type alias for shed operations.
pub type ShedResult<T> = Result<T, ShedError>;

/// Category of a [`ShedError`].
///
/// Kinds group errors based on how they can be actioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Kind {
    /// Invalid operation on an item.
    #[error("invalid operation")]
    Invalid,
    /// The requested tool is not in the lockfile.
    #[error("tool not found")]
    NotFound,
    /// A tool needs to be installed for the operation to work.
    #[error("tool not installed")]
    NotInstalled,
    /// A short name matched more than one tool.
    #[error("multiple tools found with the same name")]
    MultipleTools,
    /// The stored version of a tool disagrees with the requested one.
    #[error("incorrect version of tool")]
    IncorrectVersion,
    /// The tool does not have an exact semantic version.
    #[error("tool has invalid version")]
    InvalidVersion,
    /// Shed is in a bad state, but it can be fixed.
    #[error("bad state")]
    BadState,
    /// Internal error or inconsistency.
    #[error("internal error")]
    Internal,
    /// An OS level I/O error.
    #[error("I/O error")]
    Io,
    /// An error returned from the go command.
    #[error("go error")]
    Go,
    /// The operation was aborted by cancellation.
    #[error("operation canceled")]
    Canceled,
}

/// A shed error: a kind, the operation that was being performed, a
/// human-readable reason, and the error that triggered this one, if any.
#[derive(Debug)]
pub struct ShedError {
    kind: Kind,
    op: &'static str,
    reason: String,
    source: Option<Box<dyn error::Error + Send + Sync + 'static>>,
    // Some lookups return the stored tool alongside the error so callers
    // can still inspect what the lockfile holds.
    tool: Option<Tool>,
}

impl ShedError {
    /// Create a new error with no underlying cause.
    pub fn new(kind: Kind, op: &'static str, reason: impl Into<String>) -> Self {
        Self {
            kind,
            op,
            reason: reason.into(),
            source: None,
            tool: None,
        }
    }

    /// Create a new error wrapping an underlying cause.
    pub fn with_source(
        kind: Kind,
        op: &'static str,
        reason: impl Into<String>,
        source: impl Into<Box<dyn error::Error + Send + Sync + 'static>>,
    ) -> Self {
        Self {
            kind,
            op,
            reason: reason.into(),
            source: Some(source.into()),
            tool: None,
        }
    }

    /// Create an I/O error with context.
    pub fn io(op: &'static str, reason: impl Into<String>, source: std::io::Error) -> Self {
        Self::with_source(Kind::Io, op, reason, source)
    }

    /// Create an internal error.
    pub fn internal(op: &'static str, reason: impl Into<String>) -> Self {
        Self::new(Kind::Internal, op, reason)
    }

    /// Create a cancellation error.
    pub fn canceled(op: &'static str) -> Self {
        Self::new(Kind::Canceled, op, "")
    }

    /// Wrap another shed error, inheriting its kind.
    pub fn wrap(op: &'static str, reason: impl Into<String>, source: ShedError) -> Self {
        Self::with_source(source.kind, op, reason, source)
    }

    /// Collect multiple errors into a single error. The kind is taken from
    /// the first error in the list.
    pub fn aggregate(op: &'static str, reason: impl Into<String>, errs: ErrorList) -> Self {
        let kind = errs.0.first().map_or(Kind::Internal, ShedError::kind);
        Self::with_source(kind, op, reason, errs)
    }

    /// The category of this error.
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// The tool the lockfile holds, for lookups that report a mismatch.
    pub fn tool(&self) -> Option<&Tool> {
        self.tool.as_ref()
    }

    pub(crate) fn with_tool(mut self, tool: Tool) -> Self {
        self.tool = Some(tool);
        self
    }

    /// Find the innermost [`ShedError`] in the cause chain.
    pub fn root(&self) -> &ShedError {
        let mut cur = self;
        while let Some(next) = cur
            .source
            .as_deref()
            .and_then(|s| s.downcast_ref::<ShedError>())
        {
            cur = next;
        }
        cur
    }

    /// The aggregated errors, if this error wraps an [`ErrorList`].
    pub fn errors(&self) -> Option<&ErrorList> {
        self.source.as_deref()?.downcast_ref()
    }

    /// Get an actionable hint for this error, based on the root kind.
    pub fn hint(&self) -> Option<&'static str> {
        match self.root().kind() {
            Kind::NotInstalled => Some("Run 'shed get' to install missing tools."),
            Kind::MultipleTools => {
                Some("Use the full import path to pick one of the matching tools.")
            }
            Kind::Go => Some("Make sure Go 1.11 or later is installed and on your PATH."),
            Kind::BadState => Some("Run 'shed cache clean' to reset the tool cache."),
            _ => None,
        }
    }
}

impl fmt::Display for ShedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.op, self.kind)?;
        if !self.reason.is_empty() {
            write!(f, ": {}", self.reason)?;
        }
        if let Some(source) = &self.source {
            write!(f, ": {}", source)?;
        }
        Ok(())
    }
}

impl error::Error for ShedError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|s| s as &(dyn error::Error + 'static))
    }
}

/// Multiple errors that occurred while performing an operation.
#[derive(Debug, Default)]
pub struct ErrorList(Vec<ShedError>);

impl ErrorList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, err: ShedError) {
        self.0.push(err);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShedError> {
        self.0.iter()
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl error::Error for ErrorList {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ShedError::new(Kind::NotFound, "Lockfile::get_tool", "stringer");
        assert_eq!(
            err.to_string(),
            "Lockfile::get_tool: tool not found: stringer"
        );
    }

    #[test]
    fn error_display_with_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = ShedError::io("Cache::install", "failed to read go.mod", io);
        assert_eq!(
            err.to_string(),
            "Cache::install: I/O error: failed to read go.mod: no such file"
        );
    }

    #[test]
    fn error_root() {
        let inner = ShedError::new(Kind::NotInstalled, "Cache::tool_path", "no binary");
        let outer = ShedError::wrap("Shed::tool_path", "failed to locate tool", inner);
        assert_eq!(outer.kind(), Kind::NotInstalled);
        assert_eq!(
            outer.root().to_string(),
            "Cache::tool_path: tool not installed: no binary"
        );
    }

    #[test]
    fn error_hint() {
        let err = ShedError::new(Kind::NotInstalled, "Cache::tool_path", "no binary");
        assert_eq!(err.hint(), Some("Run 'shed get' to install missing tools."));
        let err = ShedError::new(Kind::NotFound, "Lockfile::get_tool", "stringer");
        assert_eq!(err.hint(), None);
    }

    #[test]
    fn error_aggregate() {
        let mut errs = ErrorList::new();
        errs.push(ShedError::new(Kind::Invalid, "Shed::get", "bad name"));
        errs.push(ShedError::new(Kind::Invalid, "Shed::get", "worse name"));
        let err = ShedError::aggregate("Shed::get", "invalid tool names", errs);
        assert_eq!(err.kind(), Kind::Invalid);
        assert_eq!(err.errors().map(ErrorList::len), Some(2));
        let s = err.to_string();
        assert!(s.contains("bad name"));
        assert!(s.contains("worse name"));
    }
}
