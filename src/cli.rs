//! Command-line surface: `CliArgs` binds every documented flag via `clap`'s derive API.

use std::path::PathBuf;

use clap::Parser;

use crate::safety::default_max_deletes_percent;

fn default_workdir() -> PathBuf {
    match dirs_home() {
        Some(home) => home.join(".rclonesyncwd"),
        None => PathBuf::from(".rclonesyncwd"),
    }
}

// Deliberately tiny - avoids pulling in the `dirs` crate for a single lookup the platform
// already exposes via environment variables the same way the shell does.
fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")).map(PathBuf::from)
}

/// Bidirectional reconciliation between two file trees via an external transport CLI.
#[derive(Parser, Debug)]
#[command(name = "rcbisync", version, about)]
pub struct CliArgs {
    /// First root: a local path, or `<remote>:<subpath>`.
    pub path1: String,
    /// Second root: a local path, or `<remote>:<subpath>`.
    pub path2: String,

    /// Initialize baselines: copy Path2-only files to Path1, then write fresh baselines.
    #[arg(long = "first-sync")]
    pub first_sync: bool,

    /// Enable the access-health pre-flight probe.
    #[arg(long = "check-access")]
    pub check_access: bool,

    /// Check-file basename used by the access-health probe.
    #[arg(long = "check-filename", default_value = "RCLONE_TEST")]
    pub check_filename: String,

    /// Maximum percentage of prior files that may be deleted before the run aborts.
    #[arg(long = "max-deletes", default_value_t = default_max_deletes_percent())]
    pub max_deletes_percent: u32,

    /// Bypass the excessive-delete and all-changed safety guards.
    #[arg(long)]
    pub force: bool,

    /// Invoke `rmdirs` on both sides after reconciling, to prune empty directories.
    #[arg(long = "remove-empty-directories")]
    pub remove_empty_directories: bool,

    /// Path to a filter-rules file passed through to the transport.
    #[arg(long = "filters-file")]
    pub filters_file: Option<PathBuf>,

    /// Transport binary to invoke.
    #[arg(long = "rclone", default_value = "rclone")]
    pub rclone_binary: String,

    /// Transport config file path.
    #[arg(long = "config")]
    pub config_path: Option<String>,

    /// Extra pass-through arguments forwarded verbatim to every transport invocation.
    #[arg(long = "rclone-args", num_args = 0.., allow_hyphen_values = true)]
    pub rclone_args: Vec<String>,

    /// Preserve baselines: redirect writes to a dry-run-suffixed sibling instead.
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Where baselines and fingerprints live.
    #[arg(long = "workdir", default_value_os_t = default_workdir())]
    pub workdir: PathBuf,

    /// Increase verbosity; repeatable.
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Increase transport-side verbosity (forwarded to the transport); repeatable.
    #[arg(long = "rc-verbose", action = clap::ArgAction::Count)]
    pub rc_verbose: u8,

    /// Omit the date/time prefix from log lines.
    #[arg(long = "no-datetime-log")]
    pub no_datetime_log: bool,

    /// Keep `_CHK` probe listing files even after a successful run.
    #[arg(long = "keep-chkfiles")]
    pub keep_chkfiles: bool,

    /// Run as though under the test harness: does not exclude `test/**` from the default probe
    /// filter set.
    #[arg(long = "test-mode", hide = true)]
    pub test_mode: bool,
}
