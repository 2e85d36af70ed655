//! Filter & Check-File Policy.
//!
//! Filter rules are carried opaquely to the transport - we never interpret the patterns
//! ourselves (the transport does). Our job is limited to: fingerprinting the filter file so we
//! can detect when it changes, and deriving a restricted "probe" filter set used by the
//! access-health check (C9).

use std::path::Path;

/// One filter rule as it will be passed straight through to the transport's `--filter` flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterRule {
    pub include: bool,
    pub pattern: String,
}
impl FilterRule {
    pub fn include(pattern: impl Into<String>) -> FilterRule {
        FilterRule { include: true, pattern: pattern.into() }
    }
    pub fn exclude(pattern: impl Into<String>) -> FilterRule {
        FilterRule { include: false, pattern: pattern.into() }
    }

    /// Renders as `"+ pattern"` / `"- pattern"`, the form most transport filter files use.
    pub fn to_filter_line(&self) -> String {
        format!("{} {}", if self.include { "+" } else { "-" }, self.pattern)
    }
}

/// An ordered sequence of filter rules, opaque to everything except their own ordering and the
/// directory/wildcard shape used to derive the probe set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    pub rules: Vec<FilterRule>,
}
impl FilterSet {
    pub fn new(rules: Vec<FilterRule>) -> FilterSet {
        FilterSet { rules }
    }

    /// Rule ends in a directory separator or a wildcard - these need an analogous rule in the
    /// probe set so that check-files nested under filtered directories are still reachable.
    fn is_directory_like(pattern: &str) -> bool {
        pattern.ends_with('/') || pattern.contains('*')
    }

    /// Derives the restricted filter set used by the access-health probe: propagate any
    /// directory-like rule, then include the check-file basename, then catch-all exclude.
    pub fn derive_probe_filters(&self, check_filename: &str) -> FilterSet {
        let mut rules: Vec<FilterRule> = self
            .rules
            .iter()
            .filter(|r| Self::is_directory_like(&r.pattern))
            .cloned()
            .collect();
        rules.push(FilterRule::include(check_filename.to_string()));
        rules.push(FilterRule::exclude("**".to_string()));
        FilterSet::new(rules)
    }

    /// The default probe filter set used when no filter file is configured at all: just the
    /// check-file, with test directories excluded unless we're running in test mode.
    pub fn default_probe_filters(check_filename: &str, test_mode: bool) -> FilterSet {
        let mut rules = Vec::new();
        if !test_mode {
            rules.push(FilterRule::exclude("test/**".to_string()));
        }
        rules.push(FilterRule::include(check_filename.to_string()));
        rules.push(FilterRule::exclude("**".to_string()));
        FilterSet::new(rules)
    }

    /// Flattens to the repeated `--filter "<line>"` argument pairs the transport expects.
    pub fn to_transport_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        for rule in &self.rules {
            args.push("--filter".to_string());
            args.push(rule.to_filter_line());
        }
        args
    }
}

/// Computes the MD5 fingerprint of a filter file's bytes, normalizing line endings (stripping
/// CR) so the same logical content fingerprints identically regardless of which platform wrote
/// the file.
pub fn fingerprint_file(path: &Path) -> std::io::Result<String> {
    let raw = std::fs::read(path)?;
    let normalized: Vec<u8> = raw.into_iter().filter(|&b| b != b'\r').collect();
    let digest = md5::compute(&normalized);
    Ok(format!("{digest:x}"))
}

/// Parses a filter file's textual content into a [`FilterSet`]. Lines are `+ pattern` /
/// `- pattern`; blank lines and `#`-comments are skipped.
pub fn parse_filter_file(contents: &str) -> FilterSet {
    let mut rules = Vec::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(rest) = line.strip_prefix('+') {
            rules.push(FilterRule::include(rest.trim().to_string()));
        } else if let Some(rest) = line.strip_prefix('-') {
            rules.push(FilterRule::exclude(rest.trim().to_string()));
        }
    }
    FilterSet::new(rules)
}
