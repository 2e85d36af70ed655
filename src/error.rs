//! Typed errors for the reconciliation engine (C10/C11 ambient error-handling layer).
//!
//! Every fallible phase returns `Result<T, EngineError>`. Each [`EngineError`] variant carries
//! its own [`Severity`], so the top-level dispatcher in [`crate::engine`] doesn't need a second
//! classification step - it just asks the error how to handle itself.

use std::fmt;

/// Whether an error should abort the run recoverably (exit 1, baselines untouched) or fatally
/// (exit 2, baselines renamed to their error-sentinel form).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Recoverable,
    Fatal,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to acquire lock for this path pair within the poll budget")]
    LockUnavailable,

    #[error("missing or unreadable baseline for {side}; run with --first-sync")]
    MissingBaseline { side: &'static str },

    #[error("filter file fingerprint changed since the last successful run; run with --first-sync")]
    FilterFingerprintChanged,

    #[error("first-sync is required but was not requested")]
    FirstSyncRequired,

    #[error("listing failed for {side}: {source}")]
    ListingFailed { side: &'static str, source: TransportError },

    #[error("current listing for {side} returned zero entries")]
    EmptyCurrentListing { side: &'static str },

    #[error("mutation failed: {source}")]
    MutationFailed { source: TransportError },

    #[error("excessive deletes on {side}: {deleted}/{prior} exceeds the {threshold_percent}% threshold")]
    ExcessiveDeletes { side: &'static str, deleted: usize, prior: usize, threshold_percent: u32 },

    #[error("all entries appear changed on {side}; this usually indicates a bulk timestamp shift (e.g. DST)")]
    AllChangedGuardTripped { side: &'static str },

    #[error("access-health probe failed: {reason}")]
    AccessHealthProbeFailed { reason: String },

    #[error("access-health probe listing failed: {source}")]
    AccessHealthListingFailed { source: TransportError },

    #[error("interrupted")]
    Interrupted,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn severity(&self) -> Severity {
        use EngineError::*;
        match self {
            LockUnavailable
            | AccessHealthListingFailed { .. }
            | ExcessiveDeletes { .. }
            | AllChangedGuardTripped { .. }
            | EmptyCurrentListing { .. } => Severity::Recoverable,

            MissingBaseline { .. }
            | FilterFingerprintChanged
            | FirstSyncRequired
            | ListingFailed { .. }
            | MutationFailed { .. }
            | AccessHealthProbeFailed { .. }
            | Interrupted
            | Io(_) => Severity::Fatal,
        }
    }
}

/// Error raised by [`crate::transport::TransportAdapter`] after exhausting its retry budget.
#[derive(Debug, Clone)]
pub struct TransportError {
    pub verb: String,
    pub attempts: u32,
    pub last_exit_code: Option<i32>,
    pub last_stderr: String,
}
impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "transport command {:?} failed after {} attempt(s), last exit code {:?}: {}",
            self.verb, self.attempts, self.last_exit_code, self.last_stderr.trim()
        )
    }
}
impl std::error::Error for TransportError {}

/// The outcome of a full run, used by `main` to pick the process exit code.
#[derive(Debug)]
pub enum RunOutcome {
    Success,
    Recoverable(EngineError),
    Fatal(EngineError),
}

impl RunOutcome {
    pub fn from_result(result: Result<(), EngineError>) -> RunOutcome {
        match result {
            Ok(()) => RunOutcome::Success,
            Err(e) => match e.severity() {
                Severity::Recoverable => RunOutcome::Recoverable(e),
                Severity::Fatal => RunOutcome::Fatal(e),
            },
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            RunOutcome::Success => 0,
            RunOutcome::Recoverable(_) => 1,
            RunOutcome::Fatal(_) => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_matches_spec_categories() {
        assert_eq!(EngineError::LockUnavailable.severity(), Severity::Recoverable);
        assert_eq!(EngineError::FirstSyncRequired.severity(), Severity::Fatal);
        assert_eq!(
            EngineError::ExcessiveDeletes { side: "Path1", deleted: 6, prior: 10, threshold_percent: 50 }.severity(),
            Severity::Recoverable
        );
        assert_eq!(EngineError::Interrupted.severity(), Severity::Fatal);
    }

    #[test]
    fn exit_codes_match_spec() {
        assert_eq!(RunOutcome::Success.exit_code(), 0);
        assert_eq!(RunOutcome::Recoverable(EngineError::LockUnavailable).exit_code(), 1);
        assert_eq!(RunOutcome::Fatal(EngineError::FirstSyncRequired).exit_code(), 2);
    }
}
