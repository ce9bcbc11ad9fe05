//! File watcher — monitors a source file for changes via notify (inotify on Linux).
//!
//! notify::RecommendedWatcher runs callbacks on an internal thread.
//! FileWatcher bridges change notifications to the caller via mpsc::channel,
//! and [`FileWatcher::forward`] turns them into scheduler edits.

use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use log::{debug, warn};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use crate::scheduler::{Invalidation, Invalidator};

pub struct FileWatcher {
    rx: mpsc::Receiver<()>,
    _watcher: RecommendedWatcher, // Drop stops watching
}

impl FileWatcher {
    /// Create a FileWatcher that monitors the given file for changes.
    ///
    /// Linux inotify loses the watch on rename (atomic save), so we watch
    /// the parent directory (NonRecursive) and filter events by path. Editors
    /// that save by rename show up as a create of the target.
    pub fn new(path: &Path) -> Result<Self> {
        let canonical = path.canonicalize()?;
        let target = canonical.clone();
        let (tx, rx) = mpsc::channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    let ours = event.paths.iter().any(|p| p == &target);
                    if ours && (event.kind.is_modify() || event.kind.is_create()) {
                        let _ = tx.send(());
                    }
                }
                Err(e) => warn!("watch: {e}"),
            },
            notify::Config::default(),
        )?;
        let parent = canonical
            .parent()
            .ok_or_else(|| anyhow::anyhow!("cannot watch root path"))?;
        watcher.watch(parent, RecursiveMode::NonRecursive)?;
        debug!("watch: watching {}", canonical.display());

        Ok(Self { rx, _watcher: watcher })
    }

    /// Return true if the file has changed since last check (non-blocking).
    /// Multiple queued notifications are collapsed into a single true.
    pub fn has_changed(&self) -> bool {
        let mut changed = false;
        while self.rx.try_recv().is_ok() {
            changed = true;
        }
        changed
    }

    /// Poll every `interval` and send one [`Invalidation::Edit`] per batch of
    /// changes. Returns when the scheduler stops accepting invalidations.
    pub fn forward(self, invalidator: &Invalidator, interval: Duration) {
        loop {
            thread::sleep(interval);
            if self.has_changed() {
                debug!("watch: file changed");
                if !invalidator.send(Invalidation::Edit) {
                    break;
                }
            }
        }
        debug!("watch: scheduler gone, stopping");
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::Instant;

    use super::*;

    #[test]
    fn reports_writes_once_per_batch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.rs");
        fs::write(&path, "fn main() {}\n").unwrap();

        let watcher = FileWatcher::new(&path).unwrap();
        assert!(!watcher.has_changed());

        fs::write(&path, "fn main() { println!(); }\n").unwrap();
        fs::write(&path, "fn main() {}\n").unwrap();

        let start = Instant::now();
        let mut seen = false;
        while start.elapsed() < Duration::from_secs(5) {
            if watcher.has_changed() {
                seen = true;
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert!(seen, "no change notification");
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FileWatcher::new(&dir.path().join("absent.rs")).is_err());
    }
}
