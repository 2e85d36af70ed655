//! The engine orchestrator - sequences every phase of a run: lock → resolve paths → load filter
//! state → (first-sync OR verify baselines) → optional access-health probe → current listings →
//! deltas → safety gate → plan+execute → mirror sync → refresh baselines → release lock.

use log::{info, warn};

use crate::baseline::Side;
use crate::context::RunContext;
use crate::delta::compute_deltas;
use crate::error::EngineError;
use crate::filters::{fingerprint_file, parse_filter_file, FilterSet};
use crate::health;
use crate::lock::Lock;
use crate::path_utils::pair_fingerprint;
use crate::reconcile::{execute_plan, first_sync_plan, mirror_sync, plan, prune_empty_directories};
use crate::safety::{check_all_changed, check_excessive_deletes, check_prerequisites};
use crate::transport::{TransportAdapter, TransportOptions};

/// Pass-through options the engine needs in addition to those carried on `RunConfig` -
/// everything that maps straight from a CLI flag to a `TransportOptions` field.
pub struct EngineDeps {
    pub transport: TransportAdapter,
    pub base_options: TransportOptions,
    pub filters_file: Option<std::path::PathBuf>,
}

/// Runs one full reconciliation. Acquires the lock, delegates to [`run_inner`], and resolves the
/// lock/baseline bookkeeping according to how the run ended: success releases the lock leaving
/// baselines as written by the final phase; any other outcome is handled by its own severity
/// (recoverable leaves baselines untouched and releases the lock; fatal renames them to the
/// error-sentinel form via [`RunContext::abort_to_error_sentinel`]).
pub fn run(ctx: &RunContext, deps: &EngineDeps) -> Result<(), EngineError> {
    let fingerprint = pair_fingerprint(&ctx.config.path1_root, &ctx.config.path2_root);
    let caller_identity = format!(
        "{}@pid:{}",
        std::env::var("USER").or_else(|_| std::env::var("USERNAME")).unwrap_or_else(|_| "unknown".to_string()),
        std::process::id()
    );

    let lock = Lock::acquire(&fingerprint, &caller_identity).ok_or(EngineError::LockUnavailable)?;
    ctx.adopt_lock(lock);

    let result = run_inner(ctx, deps);

    match &result {
        Ok(()) => ctx.release_lock(),
        Err(e) if e.severity() == crate::error::Severity::Fatal => ctx.abort_to_error_sentinel(),
        Err(_) => ctx.release_lock(),
    }

    result
}

fn run_inner(ctx: &RunContext, deps: &EngineDeps) -> Result<(), EngineError> {
    let config = &ctx.config;

    let (active_filters, filter_fingerprint_changed) = resolve_filter_state(ctx, deps)?;

    let mut options = deps.base_options.clone();
    options.filter_args = active_filters.to_transport_args();

    if config.first_sync {
        return run_first_sync(ctx, deps, &options);
    }

    check_prerequisites(
        Side::Path1.label(),
        ctx.baseline_store.load_baseline(Side::Path1).is_some(),
        filter_fingerprint_changed,
        false,
    )?;
    check_prerequisites(
        Side::Path2.label(),
        ctx.baseline_store.load_baseline(Side::Path2).is_some(),
        filter_fingerprint_changed,
        false,
    )?;

    if config.check_access {
        let probe_filters = derive_probe_filters(&active_filters, config);
        let probe_result = health::probe(&deps.transport, &options, &config.path1_root, &config.path2_root, &probe_filters);
        if probe_result.is_err() {
            ctx.baseline_store.cleanup_chk_listings(true);
            return probe_result;
        }
        ctx.baseline_store.cleanup_chk_listings(config.keep_chkfiles);
    }

    let prior1 = ctx.baseline_store.load_baseline(Side::Path1).ok_or(EngineError::MissingBaseline { side: "Path1" })?;
    let prior2 = ctx.baseline_store.load_baseline(Side::Path2).ok_or(EngineError::MissingBaseline { side: "Path2" })?;

    let now1 = deps
        .transport
        .list(&config.path1_root, &options)
        .map_err(|source| EngineError::ListingFailed { side: "Path1", source })?;
    let now2 = deps
        .transport
        .list(&config.path2_root, &options)
        .map_err(|source| EngineError::ListingFailed { side: "Path2", source })?;

    if now1.is_empty() {
        return Err(EngineError::EmptyCurrentListing { side: "Path1" });
    }
    if now2.is_empty() {
        return Err(EngineError::EmptyCurrentListing { side: "Path2" });
    }

    let (deltas1, saw_unchanged1) = compute_deltas(&prior1, &now1);
    let (deltas2, saw_unchanged2) = compute_deltas(&prior2, &now2);

    check_excessive_deletes("Path1", &deltas1, prior1.len(), config.max_deletes_percent, config.force)?;
    check_excessive_deletes("Path2", &deltas2, prior2.len(), config.max_deletes_percent, config.force)?;
    check_all_changed("Path1", prior1.len(), saw_unchanged1, config.force)?;
    check_all_changed("Path2", prior2.len(), saw_unchanged2, config.force)?;

    let actions = plan(&now1, &now2, &deltas1, &deltas2);
    info!("Reconciliation plan has {} per-path action(s)", actions.len());
    let outcome = execute_plan(&deps.transport, &options, &config.path1_root, &config.path2_root, &actions)?;
    if !outcome.conflicts.is_empty() {
        warn!("{} path(s) conflict-preserved: {:?}", outcome.conflicts.len(), outcome.conflicts);
    }

    mirror_sync(&deps.transport, &options, &config.path1_root, &config.path2_root)?;

    if config.remove_empty_directories {
        prune_empty_directories(&deps.transport, &options, &config.path1_root, &config.path2_root)?;
    }

    refresh_baselines(ctx, deps, &options)?;
    ctx.baseline_store.cleanup_new_listings();

    Ok(())
}

fn run_first_sync(ctx: &RunContext, deps: &EngineDeps, options: &TransportOptions) -> Result<(), EngineError> {
    let config = &ctx.config;

    let now1 = deps
        .transport
        .list(&config.path1_root, options)
        .map_err(|source| EngineError::ListingFailed { side: "Path1", source })?;
    let now2 = deps
        .transport
        .list(&config.path2_root, options)
        .map_err(|source| EngineError::ListingFailed { side: "Path2", source })?;

    let actions = first_sync_plan(&now1, &now2);
    info!("First-sync plan copies {} path(s) from Path2 to Path1", actions.len());
    execute_plan(&deps.transport, options, &config.path1_root, &config.path2_root, &actions)?;

    let fresh1 = deps
        .transport
        .list(&config.path1_root, options)
        .map_err(|source| EngineError::ListingFailed { side: "Path1", source })?;

    ctx.baseline_store.write_baseline(Side::Path1, &fresh1)?;
    ctx.baseline_store.write_baseline(Side::Path2, &now2)?;
    write_filter_fingerprint_if_configured(ctx, deps)?;

    Ok(())
}

fn refresh_baselines(ctx: &RunContext, deps: &EngineDeps, options: &TransportOptions) -> Result<(), EngineError> {
    let config = &ctx.config;
    let final1 = deps
        .transport
        .list(&config.path1_root, options)
        .map_err(|source| EngineError::ListingFailed { side: "Path1", source })?;
    let final2 = deps
        .transport
        .list(&config.path2_root, options)
        .map_err(|source| EngineError::ListingFailed { side: "Path2", source })?;

    ctx.baseline_store.write_baseline(Side::Path1, &final1)?;
    ctx.baseline_store.write_baseline(Side::Path2, &final2)?;
    write_filter_fingerprint_if_configured(ctx, deps)?;
    Ok(())
}

/// Loads the configured filter file (if any), builds the active `FilterSet`, and reports whether
/// its fingerprint changed since the last successful run.
fn resolve_filter_state(ctx: &RunContext, deps: &EngineDeps) -> Result<(FilterSet, bool), EngineError> {
    let Some(filters_file) = &deps.filters_file else {
        return Ok((FilterSet::default(), false));
    };

    let contents = std::fs::read_to_string(filters_file)?;
    let filter_set = parse_filter_file(&contents);

    let fingerprint = fingerprint_file(filters_file)?;
    let sidecar = ctx.baseline_store.filter_fingerprint_path(filters_file);
    let changed = match std::fs::read_to_string(&sidecar) {
        Ok(recorded) => recorded.trim() != fingerprint,
        Err(_) => false, // No sidecar yet: only first-sync or a missing-baseline check cares.
    };

    Ok((filter_set, changed))
}

fn write_filter_fingerprint_if_configured(ctx: &RunContext, deps: &EngineDeps) -> Result<(), EngineError> {
    let Some(filters_file) = &deps.filters_file else { return Ok(()) };
    let fingerprint = fingerprint_file(filters_file)?;
    let sidecar = ctx.baseline_store.filter_fingerprint_path(filters_file);
    std::fs::write(sidecar, fingerprint)?;
    Ok(())
}

fn derive_probe_filters(active: &FilterSet, config: &crate::context::RunConfig) -> FilterSet {
    if active.rules.is_empty() {
        FilterSet::default_probe_filters(&config.check_filename, config.test_mode)
    } else {
        active.derive_probe_filters(&config.check_filename)
    }
}
