//! Transport Adapter - shells out to the external transport CLI (`rclone` by default) for
//! both listing and mutating operations, treating it as a black box: the sole signal is stdout
//! (for listings) or the exit code (for mutations).

use std::process::{Command, Stdio};

use log::{debug, warn};

use crate::error::TransportError;
use crate::listing::{parse_listing, Listing};

const MAX_ATTEMPTS: u32 = 3;

/// A mutating verb supported by the transport. `copyto`/`moveto` take exactly two paths;
/// `delete` and `rmdirs` take one; `sync` takes two (source, dest).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    CopyTo,
    MoveTo,
    Delete,
    Sync,
    Rmdirs,
}
impl Verb {
    fn as_str(&self) -> &'static str {
        match self {
            Verb::CopyTo => "copyto",
            Verb::MoveTo => "moveto",
            Verb::Delete => "delete",
            Verb::Sync => "sync",
            Verb::Rmdirs => "rmdirs",
        }
    }
}

/// Options threaded through every transport invocation: the config-file location, active
/// filter flags, and any pass-through args the operator supplied on our own command line.
#[derive(Debug, Clone, Default)]
pub struct TransportOptions {
    pub config_path: Option<String>,
    pub filter_args: Vec<String>,
    pub extra_args: Vec<String>,
    /// Forces a comparison that ignores the transport's cached modification times, used for
    /// the `newer` force-copy rule in the reconciliation planner (`--ignore-times`).
    pub ignore_times: bool,
    /// Enforces a minimum transfer size of zero, to avoid overwriting provider-specific
    /// placeholder objects whose reported size is negative.
    pub min_size_zero: bool,
    /// Number of `-v` flags to forward to the transport binary itself, independent of this
    /// process's own log level (set via `--verbose` and consumed by `logging::init`).
    pub rc_verbose_count: u32,
}

/// Thin wrapper around invoking the configured transport binary. Retries up to
/// [`MAX_ATTEMPTS`] times on non-zero exit before surfacing failure.
#[derive(Debug, Clone)]
pub struct TransportAdapter {
    binary: String,
}

impl TransportAdapter {
    pub fn new(binary: impl Into<String>) -> TransportAdapter {
        TransportAdapter { binary: binary.into() }
    }

    /// Lists `path` (a `RootSpec::as_transport_arg()`-formatted string) via the transport's
    /// `lsl`-equivalent command, retrying up to three times on failure.
    pub fn list(&self, path: &str, options: &TransportOptions) -> Result<Listing, TransportError> {
        let mut last_stderr = String::new();
        let mut last_exit_code = None;
        for attempt in 1..=MAX_ATTEMPTS {
            let mut cmd = self.build_command("lsl", options);
            cmd.arg(path);
            debug!("Transport list attempt {}/{}: {:?}", attempt, MAX_ATTEMPTS, cmd);

            match cmd.output() {
                Ok(output) if output.status.success() => {
                    return parse_listing(output.stdout.as_slice()).map_err(|e| TransportError {
                        verb: "lsl".to_string(),
                        attempts: attempt,
                        last_exit_code: output.status.code(),
                        last_stderr: e.to_string(),
                    });
                }
                Ok(output) => {
                    last_exit_code = output.status.code();
                    last_stderr = String::from_utf8_lossy(&output.stderr).to_string();
                    warn!("Transport list attempt {} failed (exit {:?}): {}", attempt, last_exit_code, last_stderr);
                }
                Err(e) => {
                    last_stderr = e.to_string();
                    warn!("Transport list attempt {} failed to launch: {}", attempt, last_stderr);
                }
            }
        }
        Err(TransportError { verb: "lsl".to_string(), attempts: MAX_ATTEMPTS, last_exit_code, last_stderr })
    }

    /// Issues a mutating command (`copyto`, `moveto`, `delete`, `sync`, `rmdirs`), retrying up
    /// to three times on non-zero exit.
    pub fn cmd(&self, verb: Verb, paths: &[&str], options: &TransportOptions) -> Result<(), TransportError> {
        let mut last_stderr = String::new();
        let mut last_exit_code = None;
        for attempt in 1..=MAX_ATTEMPTS {
            let mut cmd = self.build_command(verb.as_str(), options);
            for p in paths {
                cmd.arg(p);
            }
            debug!("Transport {} attempt {}/{}: {:?}", verb.as_str(), attempt, MAX_ATTEMPTS, cmd);

            match cmd.status() {
                Ok(status) if status.success() => return Ok(()),
                Ok(status) => {
                    last_exit_code = status.code();
                    warn!("Transport {} attempt {} failed (exit {:?})", verb.as_str(), attempt, last_exit_code);
                }
                Err(e) => {
                    last_stderr = e.to_string();
                    warn!("Transport {} attempt {} failed to launch: {}", verb.as_str(), attempt, last_stderr);
                }
            }
        }
        Err(TransportError { verb: verb.as_str().to_string(), attempts: MAX_ATTEMPTS, last_exit_code, last_stderr })
    }

    fn build_command(&self, verb: &str, options: &TransportOptions) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg(verb);
        if let Some(config) = &options.config_path {
            cmd.arg("--config").arg(config);
        }
        for f in &options.filter_args {
            cmd.arg(f);
        }
        if options.ignore_times {
            cmd.arg("--ignore-times");
        }
        if options.min_size_zero {
            cmd.arg("--min-size").arg("0");
        }
        for _ in 0..options.rc_verbose_count {
            cmd.arg("-v");
        }
        for arg in &options.extra_args {
            cmd.arg(arg);
        }
        cmd.stdin(Stdio::null());
        cmd
    }
}
