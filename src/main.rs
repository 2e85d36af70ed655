mod baseline;
mod cli;
mod context;
mod delta;
mod engine;
mod error;
mod filters;
mod health;
mod listing;
mod lock;
mod logging;
mod ordered_map;
mod path_utils;
mod reconcile;
mod safety;
mod transport;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::error;

use crate::baseline::BaselineStore;
use crate::cli::CliArgs;
use crate::context::{RunConfig, RunContext};
use crate::engine::EngineDeps;
use crate::error::RunOutcome;
use crate::path_utils::{pair_fingerprint, parse_root_spec};
use crate::transport::{TransportAdapter, TransportOptions};

fn main() -> ExitCode {
    let args = CliArgs::parse();
    logging::init(args.verbose, args.no_datetime_log);

    let path1_root = parse_root_spec(&args.path1).as_transport_arg();
    let path2_root = parse_root_spec(&args.path2).as_transport_arg();

    let config = RunConfig {
        path1_root,
        path2_root,
        first_sync: args.first_sync,
        check_access: args.check_access,
        check_filename: args.check_filename.clone(),
        max_deletes_percent: args.max_deletes_percent,
        force: args.force,
        remove_empty_directories: args.remove_empty_directories,
        dry_run: args.dry_run,
        keep_chkfiles: args.keep_chkfiles,
        test_mode: args.test_mode,
    };

    let fingerprint = pair_fingerprint(&config.path1_root, &config.path2_root);
    let baseline_store = BaselineStore::new(args.workdir.clone(), fingerprint, args.dry_run);
    let ctx = RunContext::new(config, baseline_store);

    install_interrupt_handler(Arc::clone(&ctx));

    let transport = TransportAdapter::new(args.rclone_binary.clone());
    let base_options = TransportOptions {
        config_path: args.config_path.clone(),
        filter_args: Vec::new(),
        extra_args: args.rclone_args.clone(),
        ignore_times: false,
        min_size_zero: false,
        rc_verbose_count: args.rc_verbose as u32,
    };
    let deps = EngineDeps { transport, base_options, filters_file: args.filters_file.clone() };

    let outcome = RunOutcome::from_result(engine::run(&ctx, &deps));
    match &outcome {
        RunOutcome::Success => {}
        RunOutcome::Recoverable(e) => error!("Recoverable abort: {e}"),
        RunOutcome::Fatal(e) => error!("Fatal abort: {e}"),
    }

    ExitCode::from(outcome.exit_code())
}

/// Installs a `ctrlc` handler that performs the same cleanup as a fatal abort: rename both
/// baselines to their error-sentinel form and release the lock, so the next invocation refuses
/// to proceed without `--first-sync`. In-flight transport operations
/// are left to complete or fail on their own; we never attempt to roll one back.
fn install_interrupt_handler(ctx: Arc<RunContext>) {
    let result = ctrlc::set_handler(move || {
        error!("Interrupted - renaming baselines to error-sentinel form and releasing the lock");
        ctx.abort_to_error_sentinel();
        std::process::exit(2);
    });
    if let Err(e) = result {
        error!("Failed to install interrupt handler: {e}");
    }
}
