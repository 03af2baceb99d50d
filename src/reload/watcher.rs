//! Recursive directory watchers feeding the reload scheduler.

use std::path::{Path, PathBuf};

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::reload::scheduler::SchedulerHandle;

/// One watched directory tree.
pub struct PathWatcher {
    root: PathBuf,
    watcher: RecommendedWatcher,
}

impl PathWatcher {
    /// Watch `root` recursively, reporting each changed file to `scheduler`
    /// by its name relative to `root`.
    pub fn start(root: &Path, scheduler: SchedulerHandle) -> Result<Self, notify::Error> {
        let bases = {
            let mut bases = vec![root.to_path_buf()];
            if let Ok(canonical) = root.canonicalize() {
                bases.push(canonical);
            }
            bases
        };

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove() {
                        for path in &event.paths {
                            scheduler.file_changed(relative_name(&bases, path));
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default(),
        )?;

        watcher.watch(root, RecursiveMode::Recursive)?;

        tracing::info!(path = ?root, "Watching for changes");
        Ok(Self {
            root: root.to_path_buf(),
            watcher,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stop watching. Failures are logged, never returned.
    pub fn close(mut self) {
        if let Err(e) = self.watcher.unwatch(&self.root) {
            tracing::warn!(path = ?self.root, error = %e, "Failed to close watcher");
        }
    }
}

/// `path` relative to the first matching base; the bare file name otherwise.
fn relative_name(bases: &[PathBuf], path: &Path) -> String {
    bases
        .iter()
        .find_map(|base| path.strip_prefix(base).ok())
        .filter(|rel| !rel.as_os_str().is_empty())
        .or_else(|| path.file_name().map(Path::new))
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}
