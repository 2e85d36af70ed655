//! Safety Gate - the three guards that stand between a freshly computed delta set and the
//! reconciliation planner: excessive deletes, wholesale timestamp shifts ("all-changed"), and
//! the missing-baseline/filter-changed prerequisite.
//!
//! All three are independently bypassable by a force flag, except missing-baseline/filter-change
//! which always requires an explicit first-sync (force only bypasses the *guards*, not the
//! baseline prerequisite).

use crate::delta::DeltaMap;
use crate::error::EngineError;

const DEFAULT_MAX_DELETES_PERCENT: u32 = 50;

pub fn default_max_deletes_percent() -> u32 {
    DEFAULT_MAX_DELETES_PERCENT
}

/// Checks the excessive-delete guard for one side: aborts if the deleted count exceeds
/// `threshold_percent` of the prior baseline's size. A prior size of zero can never trip this
/// guard (nothing to delete a percentage of).
pub fn check_excessive_deletes(
    side: &'static str,
    deltas: &DeltaMap,
    prior_len: usize,
    threshold_percent: u32,
    force: bool,
) -> Result<(), EngineError> {
    if force || prior_len == 0 {
        return Ok(());
    }
    let deleted = deltas.values().filter(|d| d.deleted).count();
    if deleted * 100 > prior_len * threshold_percent as usize {
        return Err(EngineError::ExcessiveDeletes { side, deleted, prior: prior_len, threshold_percent });
    }
    Ok(())
}

/// Checks the all-changed guard for one side: aborts if the prior baseline was non-empty but the
/// delta computation never observed a single unchanged path. Catches wholesale timestamp shifts
/// (DST boundaries, timezone remounts) that would otherwise look like a flood of real changes.
pub fn check_all_changed(
    side: &'static str,
    prior_len: usize,
    saw_unchanged: bool,
    force: bool,
) -> Result<(), EngineError> {
    if force || prior_len == 0 {
        return Ok(());
    }
    if !saw_unchanged {
        return Err(EngineError::AllChangedGuardTripped { side });
    }
    Ok(())
}

/// Requires that a baseline is present and the filter fingerprint (if any) matches the recorded
/// one, unless we're explicitly in first-sync mode. Never bypassable by force: this is a data
/// integrity prerequisite, not a heuristic guard.
pub fn check_prerequisites(
    side: &'static str,
    baseline_present: bool,
    filter_fingerprint_changed: bool,
    first_sync: bool,
) -> Result<(), EngineError> {
    if first_sync {
        return Ok(());
    }
    if !baseline_present {
        return Err(EngineError::MissingBaseline { side });
    }
    if filter_fingerprint_changed {
        return Err(EngineError::FilterFingerprintChanged);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::Delta;
    use std::collections::BTreeMap;

    fn deltas_with_deletes(n: usize) -> DeltaMap {
        let mut m = BTreeMap::new();
        for i in 0..n {
            m.insert(format!("deleted-{i}.txt"), Delta { deleted: true, ..Default::default() });
        }
        m
    }

    #[test]
    fn excessive_deletes_trips_over_threshold() {
        let deltas = deltas_with_deletes(6);
        let result = check_excessive_deletes("Path1", &deltas, 10, 50, false);
        assert!(matches!(result, Err(EngineError::ExcessiveDeletes { deleted: 6, prior: 10, .. })));
    }

    #[test]
    fn excessive_deletes_allows_exactly_at_threshold() {
        let deltas = deltas_with_deletes(5);
        let result = check_excessive_deletes("Path1", &deltas, 10, 50, false);
        assert!(result.is_ok());
    }

    #[test]
    fn excessive_deletes_bypassed_by_force() {
        let deltas = deltas_with_deletes(10);
        let result = check_excessive_deletes("Path1", &deltas, 10, 50, true);
        assert!(result.is_ok());
    }

    #[test]
    fn excessive_deletes_empty_prior_never_trips() {
        let deltas = DeltaMap::new();
        let result = check_excessive_deletes("Path1", &deltas, 0, 50, false);
        assert!(result.is_ok());
    }

    #[test]
    fn all_changed_guard_trips_when_nothing_unchanged() {
        let result = check_all_changed("Path2", 10, false, false);
        assert!(matches!(result, Err(EngineError::AllChangedGuardTripped { side: "Path2" })));
    }

    #[test]
    fn all_changed_guard_passes_with_one_unchanged_path() {
        let result = check_all_changed("Path2", 10, true, false);
        assert!(result.is_ok());
    }

    #[test]
    fn all_changed_guard_bypassed_by_force() {
        let result = check_all_changed("Path2", 10, false, true);
        assert!(result.is_ok());
    }

    #[test]
    fn prerequisites_require_baseline_unless_first_sync() {
        assert!(check_prerequisites("Path1", false, false, false).is_err());
        assert!(check_prerequisites("Path1", false, false, true).is_ok());
    }

    #[test]
    fn prerequisites_fatal_on_filter_fingerprint_change_even_with_baseline() {
        let result = check_prerequisites("Path1", true, true, false);
        assert!(matches!(result, Err(EngineError::FilterFingerprintChanged)));
    }

    #[test]
    fn prerequisites_force_does_not_bypass_missing_baseline() {
        // Force only bypasses the heuristic guards above, never the baseline prerequisite.
        let result = check_prerequisites("Path1", false, false, false);
        assert!(result.is_err());
    }
}
