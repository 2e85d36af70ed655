//! `RunContext` carries every per-invocation value the engine and the interrupt
//! handler both need, avoiding module-level mutable globals for that state.

use std::sync::{Arc, Mutex};

use crate::baseline::BaselineStore;
use crate::lock::Lock;

/// Immutable configuration resolved once at startup from [`crate::cli::CliArgs`].
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub path1_root: String,
    pub path2_root: String,
    pub first_sync: bool,
    pub check_access: bool,
    pub check_filename: String,
    pub max_deletes_percent: u32,
    pub force: bool,
    pub remove_empty_directories: bool,
    pub dry_run: bool,
    pub keep_chkfiles: bool,
    pub test_mode: bool,
}

/// Mutable state that accrues over the course of one run: whether the lock is held, and whether
/// the baseline store has reached a point where it should be preserved (success) or moved aside
/// (fatal abort triggered from the interrupt handler, which runs concurrently with the engine on
/// a different "thread" of control - the Ctrl+C signal).
pub struct RunState {
    pub lock: Option<Lock>,
}

/// Everything the interrupt handler needs to perform its own cleanup (rename baselines to their
/// error-sentinel form, release the lock) without reaching into process-wide statics. Shared via
/// `Arc<Mutex<_>>` between `main` and the signal handler registered with `ctrlc`.
pub struct RunContext {
    pub config: RunConfig,
    pub baseline_store: BaselineStore,
    pub state: Mutex<RunState>,
}

impl RunContext {
    pub fn new(config: RunConfig, baseline_store: BaselineStore) -> Arc<RunContext> {
        Arc::new(RunContext { config, baseline_store, state: Mutex::new(RunState { lock: None }) })
    }

    /// Called once the lock has been acquired, so the interrupt handler can release it.
    pub fn adopt_lock(&self, lock: Lock) {
        self.state.lock().unwrap().lock = Some(lock);
    }

    /// Invoked from the `ctrlc` signal handler and from the engine's own fatal-error path: moves
    /// both baselines to their error-sentinel form and releases the lock, so the next invocation
    /// refuses to proceed without `--first-sync`.
    pub fn abort_to_error_sentinel(&self) {
        self.baseline_store.rename_to_error();
        let mut state = self.state.lock().unwrap();
        if let Some(lock) = state.lock.as_mut() {
            lock.release();
        }
        state.lock = None;
    }

    /// Releases the lock cleanly at the end of a successful or recoverably-aborted run (neither
    /// of which touches the baselines).
    pub fn release_lock(&self) {
        let mut state = self.state.lock().unwrap();
        if let Some(lock) = state.lock.as_mut() {
            lock.release();
        }
        state.lock = None;
    }
}
