//! Access-Health Probe - an optional pre-flight that confirms both sides still present a
//! matching set of check-files before the engine trusts their listings for reconciliation.

use crate::error::EngineError;
use crate::filters::FilterSet;
use crate::listing::Listing;
use crate::transport::{TransportAdapter, TransportOptions};

/// Runs the probe: lists both sides restricted to `probe_filters`, and fails unless both sides
/// have at least one check-file and the two check-file sets have identical membership.
///
/// Listing failures here are reported as [`EngineError::AccessHealthListingFailed`] (recoverable),
/// distinct from a probe that runs successfully but finds a mismatch
/// ([`EngineError::AccessHealthProbeFailed`], fatal: a mismatch means the access path itself is
/// untrustworthy, so baselines are renamed to their error-sentinel form rather than left in place).
pub fn probe(
    transport: &TransportAdapter,
    options: &TransportOptions,
    path1_root: &str,
    path2_root: &str,
    probe_filters: &FilterSet,
) -> Result<(), EngineError> {
    let mut probe_options = options.clone();
    probe_options.filter_args = probe_filters.to_transport_args();

    let path1_listing = transport
        .list(path1_root, &probe_options)
        .map_err(|source| EngineError::AccessHealthListingFailed { source })?;
    let path2_listing = transport
        .list(path2_root, &probe_options)
        .map_err(|source| EngineError::AccessHealthListingFailed { source })?;

    check_listings(&path1_listing, &path2_listing)
}

fn check_listings(path1: &Listing, path2: &Listing) -> Result<(), EngineError> {
    if path1.is_empty() {
        return Err(EngineError::AccessHealthProbeFailed { reason: "Path1 has no check-files".to_string() });
    }
    if path2.is_empty() {
        return Err(EngineError::AccessHealthProbeFailed { reason: "Path2 has no check-files".to_string() });
    }
    if path1.len() != path2.len() {
        return Err(EngineError::AccessHealthProbeFailed {
            reason: format!("check-file counts differ: Path1 has {}, Path2 has {}", path1.len(), path2.len()),
        });
    }
    for path in path1.paths() {
        if !path2.contains(path) {
            return Err(EngineError::AccessHealthProbeFailed {
                reason: format!("check-file {path:?} present on Path1 but missing on Path2"),
            });
        }
    }
    Ok(())
}
