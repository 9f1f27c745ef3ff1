// SPDX-License-Identifier: MIT OR Apache-2.0

//! One filesystem-change subscription per origin pattern: owns the
//! recursive watch registration, the compiled file-name regex, and the set
//! of currently-registered subpaths.

use crate::error::CollectError;
use crate::path_pattern::{self, PathLayers};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};

/// One per origin pattern.
pub struct WatchEntity {
    static_root: PathBuf,
    layers: PathLayers,
    /// Unanchored file-name regex, used for the "prefix match" tolerance
    /// applied when draining events.
    file_name_prefix_regex: Regex,
    depth_bound: u32,
    watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<notify::Event>>,
    /// Directories currently registered. `notify` identifies a watch by the
    /// path itself, so there is no separate opaque key to track alongside
    /// this set.
    registered: HashSet<PathBuf>,
}

/// What `drain_events` did with a single raw filesystem event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainedEvent {
    File(PathBuf),
    NewDir(PathBuf),
    /// A registered subdirectory was removed; its watch key is no longer
    /// valid and the caller should rebuild the entire watch service.
    SubdirRemoved(PathBuf),
    Overflow,
}

impl WatchEntity {
    pub fn new(origin_pattern: &str, depth_bound: u32) -> Result<Self, CollectError> {
        let layers = path_pattern::split(origin_pattern)?;
        let prefix_src = format!("^{}", path_pattern::file_segment_regex_source(origin_pattern));
        let file_name_prefix_regex =
            Regex::new(&prefix_src).map_err(|e| CollectError::InvalidPattern {
                pattern: origin_pattern.to_string(),
                reason: format!("prefix regex: {e}"),
            })?;

        let (tx, rx) = mpsc::channel();
        let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            // notify's callback is invoked from its own OS-event thread; the
            // core loop only ever polls `rx`, never blocks waiting on it.
            let _ = tx.send(res);
        })?;

        let static_root = PathBuf::from(&layers.static_root);
        let mut entity = WatchEntity {
            static_root,
            layers,
            file_name_prefix_regex,
            depth_bound,
            watcher,
            rx,
            registered: HashSet::new(),
        };
        entity.register_recursively(None);
        Ok(entity)
    }

    pub fn static_root(&self) -> &Path {
        &self.static_root
    }

    pub fn has_date_token(&self) -> bool {
        self.layers.has_date_token
    }

    pub fn total_path_size(&self) -> usize {
        self.registered.len()
    }

    /// Walk from `static_root` (or `root_override`) up to `depth_bound`,
    /// registering every directory found. Already-registered paths are
    /// skipped. I/O errors are logged and simply leave that subtree
    /// unregistered for a later retry.
    pub fn register_recursively(&mut self, root_override: Option<&Path>) {
        let root = root_override.unwrap_or(&self.static_root).to_path_buf();
        self.register_from(&root, 0);
    }

    fn register_from(&mut self, dir: &Path, depth: u32) {
        if depth > self.depth_bound {
            return;
        }
        if !self.registered.contains(dir) {
            match self.watcher.watch(dir, RecursiveMode::NonRecursive) {
                Ok(()) => {
                    self.registered.insert(dir.to_path_buf());
                }
                Err(e) => {
                    let io_err = CollectError::from_io(
                        dir.to_path_buf(),
                        std::io::Error::other(e.to_string()),
                    );
                    log_registration_failure(dir, &io_err);
                    return;
                }
            }
        }
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(_) => return,
        };
        for entry in entries.flatten() {
            if let Ok(file_type) = entry.file_type() {
                if file_type.is_dir() {
                    self.register_from(&entry.path(), depth + 1);
                }
            }
        }
    }

    /// Drop and fully recreate the underlying watch service: close the
    /// handle, clear registration state, open a new handle, and
    /// re-register from `static_root`.
    pub fn rebuild(&mut self) -> Result<(), CollectError> {
        let (tx, rx) = mpsc::channel();
        let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let _ = tx.send(res);
        })?;
        self.watcher = watcher;
        self.rx = rx;
        self.registered.clear();
        self.register_recursively(None);
        Ok(())
    }

    /// Poll pending filesystem events without blocking, at most
    /// `total_path_size()` times. New directories are registered in place;
    /// matched files and overflow sentinels are returned for the caller to
    /// act on (submit to the event map, or trigger a periodic-scan
    /// compensation).
    pub fn drain_events(&mut self) -> Vec<DrainedEvent> {
        let budget = self.total_path_size().max(1);
        let mut drained = Vec::new();
        for _ in 0..budget {
            match self.rx.try_recv() {
                Ok(Ok(event)) => {
                    if matches!(event.kind, notify::EventKind::Other) {
                        tracing::warn!("watch entity: overflow event, deferring to periodic scan");
                        drained.push(DrainedEvent::Overflow);
                        continue;
                    }
                    if matches!(event.kind, notify::EventKind::Remove(_)) {
                        for path in &event.paths {
                            self.handle_removed_path(path, &mut drained);
                        }
                        continue;
                    }
                    for path in event.paths {
                        self.handle_event_path(&path, &mut drained);
                    }
                }
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "watch entity: overflow or backend error, deferring to periodic scan");
                    drained.push(DrainedEvent::Overflow);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => break,
            }
        }
        drained
    }

    fn handle_event_path(&mut self, path: &Path, drained: &mut Vec<DrainedEvent>) {
        if path.is_dir() {
            self.register_recursively(Some(path));
            drained.push(DrainedEvent::NewDir(path.to_path_buf()));
            return;
        }
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
            return;
        };
        let full_match = self.layers.file_name_regex.is_match(&name);
        let prefix_match = self
            .file_name_prefix_regex
            .find(&name)
            .map(|m| m.start() == 0)
            .unwrap_or(false);
        if full_match || prefix_match {
            drained.push(DrainedEvent::File(path.to_path_buf()));
        }
    }

    /// A registered path disappeared: drop its watch key and flag the
    /// entity for a full rebuild (its containing watch service can no
    /// longer be trusted to observe anything rooted under the removed
    /// directory).
    fn handle_removed_path(&mut self, path: &Path, drained: &mut Vec<DrainedEvent>) {
        if !self.registered.remove(path) {
            return;
        }
        let _ = self.watcher.unwatch(path);
        let err = CollectError::WatchKeyInvalid(path.to_path_buf());
        tracing::warn!(path = %path.display(), error = %err, "watch entity: registered directory removed, rebuild required");
        drained.push(DrainedEvent::SubdirRemoved(path.to_path_buf()));
    }

    pub fn close(&mut self) {
        for path in self.registered.drain() {
            let _ = self.watcher.unwatch(&path);
        }
    }
}

impl Drop for WatchEntity {
    fn drop(&mut self) {
        self.close();
    }
}

fn log_registration_failure(dir: &Path, err: &CollectError) {
    match err {
        CollectError::TooManyOpenFiles(_) => {
            tracing::warn!(dir = %dir.display(), "watch entity: too many open files, will retry");
        }
        other => {
            tracing::error!(dir = %dir.display(), error = %other, "watch entity: failed to register directory");
        }
    }
}

#[cfg(test)]
#[path = "watch_entity_tests.rs"]
mod tests;
