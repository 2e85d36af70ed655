//! Delta Computer - compares a prior baseline listing against a freshly captured current
//! listing and classifies every path into the boolean flags the reconciliation planner (C8)
//! and the safety gate (C7) key off of.

use std::collections::BTreeMap;

use crate::listing::{Entry, Listing};

/// Per-path change classification relative to the last successful baseline. The flags are
/// mutually exclusive along the `new`/`deleted` axis and the `newer`/`older` axis: a path is
/// never both `new` and `deleted`, and never both `newer` and `older`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Delta {
    pub new: bool,
    pub newer: bool,
    pub older: bool,
    pub size_changed: bool,
    pub deleted: bool,
}
impl Delta {
    pub fn is_unchanged(&self) -> bool {
        !(self.new || self.newer || self.older || self.size_changed || self.deleted)
    }
}

/// Per-path delta results, sorted lexicographically by path (the same ordering `Listing` uses).
pub type DeltaMap = BTreeMap<String, Delta>;

/// Computes the delta set for one side. Returns the per-path deltas alongside whether at least
/// one path was observed completely unchanged - the all-changed guard (C7) needs that second
/// value.
pub fn compute_deltas(prior: &Listing, now: &Listing) -> (DeltaMap, bool) {
    let mut deltas = DeltaMap::new();
    let mut saw_unchanged = false;

    for (path, now_entry) in now.iter() {
        let delta = match prior.get(path) {
            None => Delta { new: true, ..Default::default() },
            Some(prior_entry) => classify(prior_entry, now_entry),
        };
        if delta.is_unchanged() {
            saw_unchanged = true;
        }
        deltas.insert(path.clone(), delta);
    }

    for (path, _) in prior.iter() {
        if !now.contains(path) {
            deltas.insert(path.clone(), Delta { deleted: true, ..Default::default() });
        }
    }

    (deltas, saw_unchanged)
}

fn classify(prior: &Entry, now: &Entry) -> Delta {
    let size_changed = prior.size != now.size;
    let newer = now.mtime > prior.mtime;
    let older = now.mtime < prior.mtime;
    Delta { new: false, newer, older, size_changed, deleted: false }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing_of(entries: &[(&str, i64, f64)]) -> Listing {
        let mut l = Listing::new();
        for (path, size, mtime) in entries {
            l.insert(path.to_string(), Entry { size: *size, mtime: *mtime });
        }
        l
    }

    #[test]
    fn new_path_is_flagged_new_only() {
        let prior = listing_of(&[]);
        let now = listing_of(&[("a.txt", 10, 100.0)]);
        let (deltas, saw_unchanged) = compute_deltas(&prior, &now);
        let d = deltas.get("a.txt").unwrap();
        assert!(d.new);
        assert!(!d.deleted);
        assert!(!d.newer && !d.older);
        assert!(!saw_unchanged);
    }

    #[test]
    fn deleted_path_is_flagged_deleted_only() {
        let prior = listing_of(&[("a.txt", 10, 100.0)]);
        let now = listing_of(&[]);
        let (deltas, _) = compute_deltas(&prior, &now);
        let d = deltas.get("a.txt").unwrap();
        assert!(d.deleted);
        assert!(!d.new);
    }

    #[test]
    fn unchanged_path_has_no_flags_and_is_observed() {
        let prior = listing_of(&[("a.txt", 10, 100.0)]);
        let now = listing_of(&[("a.txt", 10, 100.0)]);
        let (deltas, saw_unchanged) = compute_deltas(&prior, &now);
        let d = deltas.get("a.txt").unwrap();
        assert!(d.is_unchanged());
        assert!(saw_unchanged);
    }

    #[test]
    fn newer_mtime_sets_newer_not_older() {
        let prior = listing_of(&[("a.txt", 10, 100.0)]);
        let now = listing_of(&[("a.txt", 10, 200.0)]);
        let (deltas, _) = compute_deltas(&prior, &now);
        let d = deltas.get("a.txt").unwrap();
        assert!(d.newer);
        assert!(!d.older);
        assert!(!d.size_changed);
    }

    #[test]
    fn older_mtime_sets_older_not_newer() {
        let prior = listing_of(&[("a.txt", 10, 200.0)]);
        let now = listing_of(&[("a.txt", 10, 100.0)]);
        let (deltas, _) = compute_deltas(&prior, &now);
        let d = deltas.get("a.txt").unwrap();
        assert!(d.older);
        assert!(!d.newer);
    }

    #[test]
    fn size_changed_alone_does_not_imply_newer_or_older() {
        let prior = listing_of(&[("a.txt", 10, 100.0)]);
        let now = listing_of(&[("a.txt", 20, 100.0)]);
        let (deltas, _) = compute_deltas(&prior, &now);
        let d = deltas.get("a.txt").unwrap();
        assert!(d.size_changed);
        assert!(!d.newer && !d.older && !d.new && !d.deleted);
    }

    #[test]
    fn deltas_are_sorted_lexicographically() {
        let prior = listing_of(&[]);
        let now = listing_of(&[("zeta.txt", 1, 1.0), ("alpha.txt", 1, 1.0), ("mid.txt", 1, 1.0)]);
        let (deltas, _) = compute_deltas(&prior, &now);
        let paths: Vec<&String> = deltas.iter().map(|(p, _)| p).collect();
        assert_eq!(paths, vec!["alpha.txt", "mid.txt", "zeta.txt"]);
    }

    #[test]
    fn mixed_batch_has_no_unchanged_when_everything_differs() {
        let prior = listing_of(&[("a.txt", 10, 100.0), ("b.txt", 5, 50.0)]);
        let now = listing_of(&[("a.txt", 20, 200.0), ("c.txt", 1, 1.0)]);
        let (_, saw_unchanged) = compute_deltas(&prior, &now);
        assert!(!saw_unchanged);
    }
}
