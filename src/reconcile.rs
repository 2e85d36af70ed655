//! Reconciliation Planner & Executor - the decision table that turns per-side deltas into
//! ordered transport actions, applies them, and drives the final Path1→Path2 mirror sync.

use std::collections::BTreeMap;

use crate::delta::DeltaMap;
use crate::error::EngineError;
use crate::listing::Listing;
use crate::transport::{TransportAdapter, TransportOptions, Verb};

/// Suffixes applied by conflict-preserve; part of the external contract.
pub const CONFLICT_SUFFIX_PATH1: &str = "_Path1";
pub const CONFLICT_SUFFIX_PATH2: &str = "_Path2";

/// One planned Path2→Path1 action, in the order the decision table assigns it. The eventual
/// Path1→Path2 propagation (copies, deletes) is never planned explicitly - it rides along on the
/// single mirror `sync` invoked after all of these complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedAction {
    CopyP2ToP1 { path: String, force_ignore_times: bool },
    DeleteOnP1 { path: String },
    ConflictPreserve { path: String },
}

/// Builds the ordered Path2→Path1 action list for a normal (non-first-sync) run, following the
/// decision table exactly. Paths are visited in the lexicographic order the delta maps
/// already carry, and the result is keyed through a `BTreeMap` so the resurrect pass (driven by
/// `path1_deltas`) merges cleanly with the primary pass (driven by `path2_deltas`) without
/// duplicating or reordering a path that both passes touch.
pub fn plan(
    path1_now: &Listing,
    path2_now: &Listing,
    path1_deltas: &DeltaMap,
    path2_deltas: &DeltaMap,
) -> Vec<PlannedAction> {
    let mut actions: BTreeMap<String, PlannedAction> = BTreeMap::new();

    for (path, d2) in path2_deltas {
        let path1_has_entry = path1_now.contains(path);
        let path1_changed = path1_deltas.get(path).map(|d| !d.is_unchanged()).unwrap_or(false);

        if d2.new {
            if !path1_has_entry {
                actions.insert(path.clone(), PlannedAction::CopyP2ToP1 { path: path.clone(), force_ignore_times: false });
            } else {
                actions.insert(path.clone(), PlannedAction::ConflictPreserve { path: path.clone() });
            }
        } else if d2.newer {
            if !path1_changed {
                actions.insert(path.clone(), PlannedAction::CopyP2ToP1 { path: path.clone(), force_ignore_times: true });
            } else if path1_has_entry {
                actions.insert(path.clone(), PlannedAction::ConflictPreserve { path: path.clone() });
            }
        } else if d2.deleted && !path1_changed && path1_has_entry {
            actions.insert(path.clone(), PlannedAction::DeleteOnP1 { path: path.clone() });
        }
    }

    // Resurrect: Path1 deleted it, but Path2 still has it and it changed there too - the
    // Path1 delete loses to the surviving Path2 copy.
    for (path, d1) in path1_deltas {
        if !d1.deleted {
            continue;
        }
        let Some(d2) = path2_deltas.get(path) else { continue };
        let path2_changed_and_present = (d2.new || d2.newer || d2.older || d2.size_changed) && path2_now.contains(path);
        if path2_changed_and_present {
            actions.entry(path.clone()).or_insert(PlannedAction::CopyP2ToP1 { path: path.clone(), force_ignore_times: true });
        }
    }

    actions.into_values().collect()
}

/// Builds the first-sync action list: every path present on Path2 but absent from Path1 is
/// copied Path2→Path1. Path2 entries Path1 already has are left untouched - first-sync never
/// overwrites.
pub fn first_sync_plan(path1_now: &Listing, path2_now: &Listing) -> Vec<PlannedAction> {
    path2_now
        .iter()
        .filter(|(path, _)| !path1_now.contains(path))
        .map(|(path, _)| PlannedAction::CopyP2ToP1 { path: path.clone(), force_ignore_times: false })
        .collect()
}

/// Result of applying a planned action list: how many actions ran, and which paths ended up
/// conflict-preserved (for the run summary / logs).
#[derive(Debug, Clone, Default)]
pub struct ExecutionOutcome {
    pub actions_applied: usize,
    pub conflicts: Vec<String>,
}

/// Applies the planned Path2→Path1 actions in the order given (callers pass them already
/// lexicographically sorted via `plan`/`first_sync_plan`'s `BTreeMap`/`Listing` backing).
pub fn execute_plan(
    transport: &TransportAdapter,
    options: &TransportOptions,
    path1_root: &str,
    path2_root: &str,
    actions: &[PlannedAction],
) -> Result<ExecutionOutcome, EngineError> {
    let mut outcome = ExecutionOutcome::default();

    for action in actions {
        match action {
            PlannedAction::CopyP2ToP1 { path, force_ignore_times } => {
                let src = join_root(path2_root, path);
                let dst = join_root(path1_root, path);
                let mut opts = options.clone();
                opts.ignore_times = opts.ignore_times || *force_ignore_times;
                transport
                    .cmd(Verb::CopyTo, &[src.as_str(), dst.as_str()], &opts)
                    .map_err(|source| EngineError::MutationFailed { source })?;
            }
            PlannedAction::DeleteOnP1 { path } => {
                let target = join_root(path1_root, path);
                transport
                    .cmd(Verb::Delete, &[target.as_str()], options)
                    .map_err(|source| EngineError::MutationFailed { source })?;
            }
            PlannedAction::ConflictPreserve { path } => {
                let path2_src = join_root(path2_root, path);
                let preserved_path2 = join_root(path1_root, &format!("{path}{CONFLICT_SUFFIX_PATH2}"));
                transport
                    .cmd(Verb::CopyTo, &[path2_src.as_str(), preserved_path2.as_str()], options)
                    .map_err(|source| EngineError::MutationFailed { source })?;

                let path1_src = join_root(path1_root, path);
                let preserved_path1 = join_root(path1_root, &format!("{path}{CONFLICT_SUFFIX_PATH1}"));
                transport
                    .cmd(Verb::MoveTo, &[path1_src.as_str(), preserved_path1.as_str()], options)
                    .map_err(|source| EngineError::MutationFailed { source })?;

                outcome.conflicts.push(path.clone());
            }
        }
        outcome.actions_applied += 1;
    }

    Ok(outcome)
}

/// The single Path1→Path2 mirror invoked after all per-path actions, carrying `--min-size 0` to
/// avoid clobbering provider placeholder objects with a negative reported size.
pub fn mirror_sync(
    transport: &TransportAdapter,
    options: &TransportOptions,
    path1_root: &str,
    path2_root: &str,
) -> Result<(), EngineError> {
    let mut opts = options.clone();
    opts.min_size_zero = true;
    transport
        .cmd(Verb::Sync, &[path1_root, path2_root], &opts)
        .map_err(|source| EngineError::MutationFailed { source })
}

/// Invokes `rmdirs` on both sides to prune empty directories; only called when the operator
/// passed `--remove-empty-directories`.
pub fn prune_empty_directories(
    transport: &TransportAdapter,
    options: &TransportOptions,
    path1_root: &str,
    path2_root: &str,
) -> Result<(), EngineError> {
    transport.cmd(Verb::Rmdirs, &[path1_root], options).map_err(|source| EngineError::MutationFailed { source })?;
    transport.cmd(Verb::Rmdirs, &[path2_root], options).map_err(|source| EngineError::MutationFailed { source })?;
    Ok(())
}

fn join_root(root: &str, path: &str) -> String {
    if root.ends_with('/') || root.ends_with(':') {
        format!("{root}{path}")
    } else {
        format!("{root}/{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::compute_deltas;
    use crate::listing::Entry;

    fn listing_of(entries: &[(&str, i64, f64)]) -> Listing {
        let mut l = Listing::new();
        for (path, size, mtime) in entries {
            l.insert(path.to_string(), Entry { size: *size, mtime: *mtime });
        }
        l
    }

    #[test]
    fn new_on_path2_with_no_path1_entry_copies_over() {
        let prior1 = listing_of(&[("c.txt", 1, 1.0)]);
        let now1 = listing_of(&[("c.txt", 1, 1.0)]);
        let prior2 = listing_of(&[]);
        let now2 = listing_of(&[("b.txt", 2, 2.0)]);

        let (d1, _) = compute_deltas(&prior1, &now1);
        let (d2, _) = compute_deltas(&prior2, &now2);

        let actions = plan(&now1, &now2, &d1, &d2);
        assert_eq!(actions, vec![PlannedAction::CopyP2ToP1 { path: "b.txt".to_string(), force_ignore_times: false }]);
    }

    #[test]
    fn new_on_both_sides_is_a_true_conflict() {
        let prior1 = listing_of(&[]);
        let now1 = listing_of(&[("doc.md", 1, 100.0)]);
        let prior2 = listing_of(&[]);
        let now2 = listing_of(&[("doc.md", 2, 200.0)]);

        let (d1, _) = compute_deltas(&prior1, &now1);
        let (d2, _) = compute_deltas(&prior2, &now2);

        let actions = plan(&now1, &now2, &d1, &d2);
        assert_eq!(actions, vec![PlannedAction::ConflictPreserve { path: "doc.md".to_string() }]);
    }

    #[test]
    fn newer_on_path2_with_path1_unchanged_force_copies() {
        let prior1 = listing_of(&[("doc.md", 1, 100.0)]);
        let now1 = listing_of(&[("doc.md", 1, 100.0)]);
        let prior2 = listing_of(&[("doc.md", 1, 100.0)]);
        let now2 = listing_of(&[("doc.md", 1, 300.0)]);

        let (d1, _) = compute_deltas(&prior1, &now1);
        let (d2, _) = compute_deltas(&prior2, &now2);

        let actions = plan(&now1, &now2, &d1, &d2);
        assert_eq!(actions, vec![PlannedAction::CopyP2ToP1 { path: "doc.md".to_string(), force_ignore_times: true }]);
    }

    #[test]
    fn newer_on_both_sides_is_a_true_conflict() {
        let prior1 = listing_of(&[("doc.md", 1, 100.0)]);
        let now1 = listing_of(&[("doc.md", 1, 150.0)]);
        let prior2 = listing_of(&[("doc.md", 1, 100.0)]);
        let now2 = listing_of(&[("doc.md", 1, 200.0)]);

        let (d1, _) = compute_deltas(&prior1, &now1);
        let (d2, _) = compute_deltas(&prior2, &now2);

        let actions = plan(&now1, &now2, &d1, &d2);
        assert_eq!(actions, vec![PlannedAction::ConflictPreserve { path: "doc.md".to_string() }]);
    }

    #[test]
    fn deleted_on_path2_with_path1_unchanged_deletes_on_path1() {
        let prior1 = listing_of(&[("gone.txt", 1, 1.0)]);
        let now1 = listing_of(&[("gone.txt", 1, 1.0)]);
        let prior2 = listing_of(&[("gone.txt", 1, 1.0)]);
        let now2 = listing_of(&[]);

        let (d1, _) = compute_deltas(&prior1, &now1);
        let (d2, _) = compute_deltas(&prior2, &now2);

        let actions = plan(&now1, &now2, &d1, &d2);
        assert_eq!(actions, vec![PlannedAction::DeleteOnP1 { path: "gone.txt".to_string() }]);
    }

    #[test]
    fn path1_deleted_but_path2_changed_resurrects_from_path2() {
        let prior1 = listing_of(&[("both.txt", 1, 1.0)]);
        let now1 = listing_of(&[]);
        let prior2 = listing_of(&[("both.txt", 1, 1.0)]);
        let now2 = listing_of(&[("both.txt", 1, 500.0)]);

        let (d1, _) = compute_deltas(&prior1, &now1);
        let (d2, _) = compute_deltas(&prior2, &now2);

        let actions = plan(&now1, &now2, &d1, &d2);
        assert_eq!(actions, vec![PlannedAction::CopyP2ToP1 { path: "both.txt".to_string(), force_ignore_times: true }]);
    }

    #[test]
    fn deleted_on_both_sides_is_a_noop_plan() {
        let prior1 = listing_of(&[("both.txt", 1, 1.0)]);
        let now1 = listing_of(&[]);
        let prior2 = listing_of(&[("both.txt", 1, 1.0)]);
        let now2 = listing_of(&[]);

        let (d1, _) = compute_deltas(&prior1, &now1);
        let (d2, _) = compute_deltas(&prior2, &now2);

        let actions = plan(&now1, &now2, &d1, &d2);
        assert!(actions.is_empty());
    }

    #[test]
    fn actions_are_ordered_lexicographically_by_path() {
        let prior1 = listing_of(&[]);
        let now1 = listing_of(&[]);
        let prior2 = listing_of(&[]);
        let now2 = listing_of(&[("zeta.txt", 1, 1.0), ("alpha.txt", 1, 1.0)]);

        let (d1, _) = compute_deltas(&prior1, &now1);
        let (d2, _) = compute_deltas(&prior2, &now2);

        let actions = plan(&now1, &now2, &d1, &d2);
        let paths: Vec<&str> = actions
            .iter()
            .map(|a| match a {
                PlannedAction::CopyP2ToP1 { path, .. } => path.as_str(),
                PlannedAction::DeleteOnP1 { path } => path.as_str(),
                PlannedAction::ConflictPreserve { path } => path.as_str(),
            })
            .collect();
        assert_eq!(paths, vec!["alpha.txt", "zeta.txt"]);
    }

    #[test]
    fn first_sync_copies_only_path2_only_files() {
        let path1 = listing_of(&[("x.txt", 1, 1.0), ("y.txt", 1, 1.0)]);
        let path2 = listing_of(&[("y.txt", 1, 1.0), ("z.txt", 1, 1.0)]);

        let actions = first_sync_plan(&path1, &path2);
        assert_eq!(actions, vec![PlannedAction::CopyP2ToP1 { path: "z.txt".to_string(), force_ignore_times: false }]);
    }

    #[test]
    fn size_changed_alone_does_not_force_a_copy_or_conflict() {
        let prior1 = listing_of(&[("f.txt", 10, 100.0)]);
        let now1 = listing_of(&[("f.txt", 10, 100.0)]);
        let prior2 = listing_of(&[("f.txt", 10, 100.0)]);
        let now2 = listing_of(&[("f.txt", 99, 100.0)]);

        let (d1, _) = compute_deltas(&prior1, &now1);
        let (d2, _) = compute_deltas(&prior2, &now2);
        assert!(d2.get("f.txt").unwrap().size_changed);

        let actions = plan(&now1, &now2, &d1, &d2);
        assert!(actions.is_empty());
    }

    #[test]
    fn join_root_handles_trailing_separators() {
        assert_eq!(join_root("/tmp/a", "f.txt"), "/tmp/a/f.txt");
        assert_eq!(join_root("/tmp/a/", "f.txt"), "/tmp/a/f.txt");
        assert_eq!(join_root("myremote:", "f.txt"), "myremote:f.txt");
    }
}
