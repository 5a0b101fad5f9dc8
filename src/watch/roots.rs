use std::path::{Path, PathBuf};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;

/// Watch-root consistency manager.
///
/// Responsibility:
/// - Attach the configured root (recursive) at startup
/// - Attach directories of previewed files outside that root (flat)
/// - Re-attach roots that were removed and recreated
pub(super) struct WatchRoots {
    desired: Vec<(PathBuf, RecursiveMode)>,
    attached: FxHashSet<PathBuf>,
}

impl WatchRoots {
    pub(super) fn new(root: PathBuf) -> Self {
        Self {
            desired: vec![(root, RecursiveMode::Recursive)],
            attached: FxHashSet::default(),
        }
    }

    pub(super) fn attach_existing(
        &mut self,
        watcher: &mut RecommendedWatcher,
    ) -> notify::Result<()> {
        for (path, mode) in &self.desired {
            if !path.exists() {
                continue;
            }
            watcher.watch(path, *mode)?;
            self.attached.insert(path.clone());
        }
        Ok(())
    }

    /// Whether saves in `dir` are already observed.
    pub(super) fn covers(&self, dir: &Path) -> bool {
        self.desired.iter().any(|(root, mode)| match mode {
            RecursiveMode::Recursive => dir.starts_with(root),
            RecursiveMode::NonRecursive => dir == root,
        })
    }

    /// Watch `dir` (non-recursively) unless a root already covers it.
    pub(super) fn track(&mut self, dir: PathBuf, watcher: &mut RecommendedWatcher) {
        if self.covers(&dir) {
            return;
        }
        match watcher.watch(&dir, RecursiveMode::NonRecursive) {
            Ok(()) => {
                crate::debug!("watch"; "tracking {}", dir.display());
                self.attached.insert(dir.clone());
            }
            Err(e) => crate::log!("watch"; "cannot watch {}: {}", dir.display(), e),
        }
        // Keep it desired even if attaching failed; `maintain` retries.
        self.desired.push((dir, RecursiveMode::NonRecursive));
    }

    pub(super) fn maintain(&mut self, watcher: &mut RecommendedWatcher) {
        // Drop stale handles for roots that no longer exist.
        self.attached.retain(|path| path.exists());

        for (path, mode) in &self.desired {
            if self.attached.contains(path) || !path.exists() {
                continue;
            }

            if watcher.watch(path, *mode).is_ok() {
                self.attached.insert(path.clone());
                crate::debug!("watch"; "re-attached watch: {}", path.display());
            }
        }
    }
}
