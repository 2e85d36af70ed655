//! Baseline Store - persists/loads per-side prior listings, the filter fingerprint
//! sidecar, and implements the dry-run and error-sentinel file-naming conventions.

use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::listing::{read_listing_file, write_listing_file, Listing};

/// Which root a baseline/listing file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Path1,
    Path2,
}
impl Side {
    pub fn label(&self) -> &'static str {
        match self {
            Side::Path1 => "Path1",
            Side::Path2 => "Path2",
        }
    }
}

/// Owns the file-naming scheme for one path pair's baselines/transient listings under a
/// working directory, and whether we're in dry-run mode (in which case writes are redirected
/// to a dry-run-suffixed sibling, leaving the real baseline untouched).
#[derive(Debug, Clone)]
pub struct BaselineStore {
    workdir: PathBuf,
    pair_fingerprint: String,
    dry_run: bool,
}

impl BaselineStore {
    pub fn new(workdir: impl Into<PathBuf>, pair_fingerprint: impl Into<String>, dry_run: bool) -> BaselineStore {
        BaselineStore { workdir: workdir.into(), pair_fingerprint: pair_fingerprint.into(), dry_run }
    }

    fn base_name(&self, side: Side) -> String {
        format!("LSL_{}_{}", self.pair_fingerprint, side.label())
    }

    /// The real (non-dry-run) baseline path for `side`.
    pub fn baseline_path(&self, side: Side) -> PathBuf {
        self.workdir.join(self.base_name(side))
    }

    /// The path writes should actually target: in dry-run mode this is a `_DRYRUN`-suffixed
    /// sibling; otherwise it's the real baseline path.
    pub fn write_target_path(&self, side: Side) -> PathBuf {
        if self.dry_run {
            self.workdir.join(format!("{}_DRYRUN", self.base_name(side)))
        } else {
            self.baseline_path(side)
        }
    }

    pub fn new_listing_path(&self, side: Side) -> PathBuf {
        self.workdir.join(format!("{}_NEW", self.base_name(side)))
    }

    pub fn chk_listing_path(&self, side: Side) -> PathBuf {
        self.workdir.join(format!("{}_CHK", self.base_name(side)))
    }

    pub fn error_sentinel_path(&self, side: Side) -> PathBuf {
        self.workdir.join(format!("{}_ERROR", self.base_name(side)))
    }

    pub fn filter_fingerprint_path(&self, filters_file: &Path) -> PathBuf {
        self.workdir.join(format!(
            "{}-MD5",
            filters_file.file_name().and_then(|n| n.to_str()).unwrap_or("filters")
        ))
    }

    /// Loads the prior baseline for `side`, if present and readable.
    pub fn load_baseline(&self, side: Side) -> Option<Listing> {
        let path = self.baseline_path(side);
        if !path.exists() {
            return None;
        }
        read_listing_file(&path).ok()
    }

    /// Writes the new baseline for `side`. In dry-run mode, this first copies the existing
    /// real baseline (if any) to the dry-run sibling so subsequent writes don't start from
    /// nothing, then targets the sibling; in normal mode it overwrites the real baseline
    /// directly. A baseline must only ever be written after a fully successful run.
    pub fn write_baseline(&self, side: Side, listing: &Listing) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.workdir)?;

        if self.dry_run {
            let real = self.baseline_path(side);
            let sibling = self.write_target_path(side);
            if real.exists() && !sibling.exists() {
                std::fs::copy(&real, &sibling)?;
            }
            write_listing_file(&sibling, listing)?;
            debug!("Wrote dry-run baseline sibling {}", sibling.display());
        } else {
            let path = self.baseline_path(side);
            write_listing_file(&path, listing)?;
            debug!("Wrote baseline {}", path.display());
        }
        Ok(())
    }

    /// Renames both sides' baselines to their error-sentinel form, so the next invocation
    /// refuses to proceed without an explicit first-sync. Called only on the fatal-abort path.
    pub fn rename_to_error(&self) {
        for side in [Side::Path1, Side::Path2] {
            let from = self.baseline_path(side);
            let to = self.error_sentinel_path(side);
            if from.exists() {
                if let Err(e) = std::fs::rename(&from, &to) {
                    info!("Failed to rename baseline {} to error sentinel: {}", from.display(), e);
                } else {
                    info!("Renamed baseline {} to {} after fatal abort", from.display(), to.display());
                }
            }
        }
    }

    /// Removes the transient `_NEW` listing files for both sides, called on successful
    /// completion of a run.
    pub fn cleanup_new_listings(&self) {
        for side in [Side::Path1, Side::Path2] {
            let _ = std::fs::remove_file(self.new_listing_path(side));
        }
    }

    /// Removes the `_CHK` probe listing files for both sides, unless the caller asked to keep
    /// them (`--keep-chkfiles`), or a probe failure wants them retained for post-mortem.
    pub fn cleanup_chk_listings(&self, keep: bool) {
        if keep {
            return;
        }
        for side in [Side::Path1, Side::Path2] {
            let _ = std::fs::remove_file(self.chk_listing_path(side));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::Entry;

    fn sample_listing() -> Listing {
        let mut l = Listing::new();
        l.insert("a.txt".to_string(), Entry { size: 1, mtime: 100.0 });
        l
    }

    #[test]
    fn write_then_load_round_trips() {
        let dir = tempdir::TempDir::new("rcbisync-baseline-test").unwrap();
        let store = BaselineStore::new(dir.path(), "fp1", false);

        assert!(store.load_baseline(Side::Path1).is_none());

        store.write_baseline(Side::Path1, &sample_listing()).unwrap();
        let loaded = store.load_baseline(Side::Path1).unwrap();
        assert_eq!(loaded.paths(), vec!["a.txt"]);
    }

    #[test]
    fn dry_run_does_not_touch_real_baseline() {
        let dir = tempdir::TempDir::new("rcbisync-baseline-dryrun-test").unwrap();

        let real_store = BaselineStore::new(dir.path(), "fp2", false);
        real_store.write_baseline(Side::Path1, &sample_listing()).unwrap();
        let real_path = real_store.baseline_path(Side::Path1);
        let real_contents_before = std::fs::read_to_string(&real_path).unwrap();

        let dry_store = BaselineStore::new(dir.path(), "fp2", true);
        let mut changed = sample_listing();
        changed.insert("b.txt".to_string(), Entry { size: 2, mtime: 200.0 });
        dry_store.write_baseline(Side::Path1, &changed).unwrap();

        let real_contents_after = std::fs::read_to_string(&real_path).unwrap();
        assert_eq!(real_contents_before, real_contents_after);

        let sibling = dry_store.write_target_path(Side::Path1);
        assert!(sibling.exists());
        let sibling_loaded = read_listing_file(&sibling).unwrap();
        assert_eq!(sibling_loaded.len(), 2);
    }

    #[test]
    fn rename_to_error_moves_both_sides() {
        let dir = tempdir::TempDir::new("rcbisync-baseline-error-test").unwrap();
        let store = BaselineStore::new(dir.path(), "fp3", false);
        store.write_baseline(Side::Path1, &sample_listing()).unwrap();
        store.write_baseline(Side::Path2, &sample_listing()).unwrap();

        store.rename_to_error();

        assert!(!store.baseline_path(Side::Path1).exists());
        assert!(!store.baseline_path(Side::Path2).exists());
        assert!(store.error_sentinel_path(Side::Path1).exists());
        assert!(store.error_sentinel_path(Side::Path2).exists());
    }

    #[test]
    fn missing_baseline_returns_none_not_error() {
        let dir = tempdir::TempDir::new("rcbisync-baseline-missing-test").unwrap();
        let store = BaselineStore::new(dir.path(), "fp4", false);
        assert!(store.load_baseline(Side::Path2).is_none());
    }
}
