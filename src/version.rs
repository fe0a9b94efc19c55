//! Go-style semantic version helpers.
//!
//! Go module versions are semantic versions prefixed with `v`. The shorthands
//! `vMAJOR` and `vMAJOR.MINOR` are accepted and canonicalise to `vMAJOR.0.0`
//! and `vMAJOR.MINOR.0`. Canonical versions may carry a prerelease suffix and
//! build metadata.

use semver::Version;
use std::cmp::Ordering;

/// Reports whether `v` is a valid version, shorthands included.
pub fn is_valid(v: &str) -> bool {
    canonical(v).is_some()
}

/// Reports whether `v` is a canonical version: `vMAJOR.MINOR.PATCH` with
/// optional `-prerelease` and `+build`, no shorthands.
pub fn is_canonical(v: &str) -> bool {
    canonical(v).as_deref() == Some(v)
}

/// Canonicalise a version, padding shorthands with zeros: `v1` becomes
/// `v1.0.0` and `v1.2` becomes `v1.2.0`. Returns `None` if `v` is not a
/// valid version.
pub fn canonical(v: &str) -> Option<String> {
    let rest = v.strip_prefix('v')?;
    let (rest, build) = match rest.split_once('+') {
        Some((r, b)) => (r, Some(b)),
        None => (rest, None),
    };
    let (core, pre) = match rest.split_once('-') {
        Some((c, p)) => (c, Some(p)),
        None => (rest, None),
    };

    let mut parts: Vec<&str> = core.split('.').collect();
    if parts.len() > 3 {
        return None;
    }
    for part in &parts {
        check_numeric(part)?;
    }
    while parts.len() < 3 {
        parts.push("0");
    }

    let mut out = format!("v{}.{}.{}", parts[0], parts[1], parts[2]);
    if let Some(pre) = pre {
        out.push('-');
        out.push_str(pre);
    }
    if let Some(build) = build {
        out.push('+');
        out.push_str(build);
    }
    // Defer prerelease and build grammar checks to the semver crate.
    Version::parse(&out[1..]).ok()?;
    Some(out)
}

/// The prerelease portion of `v`, if `v` is valid and has one.
pub fn prerelease(v: &str) -> Option<String> {
    let ver = parse(v)?;
    if ver.pre.is_empty() {
        None
    } else {
        Some(ver.pre.to_string())
    }
}

/// Compare two versions in semver precedence order.
/// An invalid version sorts before every valid version.
pub fn compare(a: &str, b: &str) -> Ordering {
    match (parse(a), parse(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

fn parse(v: &str) -> Option<Version> {
    let c = canonical(v)?;
    Version::parse(&c[1..]).ok()
}

// Semver numeric identifiers are digits with no leading zeros.
fn check_numeric(s: &str) -> Option<()> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if s.len() > 1 && s.starts_with('0') {
        return None;
    }
    Some(())
}
