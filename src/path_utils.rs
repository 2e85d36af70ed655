//! Path-string normalization helpers shared by the lock manager, baseline store, and CLI.
//!
//! Paths here are opaque strings handed to and received from the transport tool - we never
//! canonicalize case, since the transport may be case-sensitive.

/// Replaces characters that aren't safe in a filename (`:`, `/`, `\`) with `_`.
/// Deterministic across platforms - this must not depend on the local filesystem's rules.
fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| if c == ':' || c == '/' || c == '\\' { '_' } else { c })
        .collect()
}

/// Builds the deterministic fingerprint used to name baseline/lock files for a given path pair,
/// so that multiple independent pairs can coexist in the same working directory.
pub fn pair_fingerprint(path1: &str, path2: &str) -> String {
    format!("{}_{}", sanitize(path1), sanitize(path2))
}

/// A single `:`-split in the second position on platforms with drive letters (e.g. `C:`) denotes
/// a drive letter, not a `<remote>:<subpath>` split. We treat any single-character prefix before
/// the colon as a drive letter rather than a remote name.
fn looks_like_drive_letter(prefix: &str) -> bool {
    prefix.len() == 1 && prefix.chars().next().unwrap().is_ascii_alphabetic()
}

/// A resolved Path1/Path2 argument: either a local filesystem path, or `<remote>:<subpath>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootSpec {
    Local(String),
    Remote { remote: String, subpath: String },
}

impl RootSpec {
    /// The raw string as it should be passed to the transport tool.
    pub fn as_transport_arg(&self) -> String {
        match self {
            RootSpec::Local(p) => p.clone(),
            RootSpec::Remote { remote, subpath } => format!("{remote}:{subpath}"),
        }
    }
}

/// Parses a `Path1`/`Path2` CLI argument into a [`RootSpec`].
pub fn parse_root_spec(s: &str) -> RootSpec {
    match s.split_once(':') {
        Some((prefix, rest)) if !looks_like_drive_letter(prefix) => {
            RootSpec::Remote { remote: prefix.to_string(), subpath: rest.to_string() }
        }
        _ => RootSpec::Local(s.to_string()),
    }
}
