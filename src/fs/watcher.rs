use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebouncedEvent, DebouncedEventKind, Debouncer};
use tokio::sync::mpsc;

use crate::event::Event;

/// Default patterns to ignore when watching the filesystem.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    ".git",
    "node_modules",
    "__pycache__",
    ".venv",
    ".mypy_cache",
    "target",
];

/// Default debounce interval in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Default flood threshold (events per debounce window).
pub const DEFAULT_FLOOD_THRESHOLD: usize = 100;

/// Watches the directories that are open in the model, one level deep each.
pub struct FsWatcher {
    /// Whether the watcher is currently forwarding events.
    active: Arc<AtomicBool>,
    debouncer: Debouncer<RecommendedWatcher>,
    watched: HashSet<PathBuf>,
}

impl FsWatcher {
    /// Create a watcher with nothing watched yet.
    ///
    /// Events are debounced by `debounce_duration` and sent via `event_tx`.
    /// Paths matching any of `ignore_patterns` are silently dropped. If more
    /// than `flood_threshold` paths arrive in one window they are collapsed
    /// into their parent directories.
    pub fn new(
        debounce_duration: Duration,
        ignore_patterns: Vec<String>,
        flood_threshold: usize,
        event_tx: mpsc::UnboundedSender<Event>,
    ) -> notify::Result<Self> {
        let active = Arc::new(AtomicBool::new(true));
        let active_clone = active.clone();

        let debouncer = new_debouncer(
            debounce_duration,
            move |result: Result<Vec<DebouncedEvent>, notify::Error>| {
                if !active_clone.load(Ordering::Relaxed) {
                    return;
                }

                match result {
                    Ok(events) => {
                        let paths: Vec<PathBuf> = events
                            .iter()
                            .filter(|e| e.kind == DebouncedEventKind::Any)
                            .map(|e| e.path.clone())
                            .filter(|p| !should_ignore(p, &ignore_patterns))
                            .collect();

                        if paths.is_empty() {
                            return;
                        }

                        let _ = event_tx.send(Event::FsChange(collapse_flood(paths, flood_threshold)));
                    }
                    Err(e) => log::warn!("watcher error: {}", e),
                }
            },
        )?;

        Ok(Self {
            active,
            debouncer,
            watched: HashSet::new(),
        })
    }

    /// Start watching the immediate children of `dir`.
    pub fn watch(&mut self, dir: &Path) -> notify::Result<()> {
        if self.watched.contains(dir) {
            return Ok(());
        }
        self.debouncer
            .watcher()
            .watch(dir, RecursiveMode::NonRecursive)?;
        self.watched.insert(dir.to_path_buf());
        log::debug!("watching {}", dir.display());
        Ok(())
    }

    pub fn unwatch(&mut self, dir: &Path) -> notify::Result<()> {
        if !self.watched.remove(dir) {
            return Ok(());
        }
        log::debug!("unwatching {}", dir.display());
        self.debouncer.watcher().unwatch(dir)
    }

    pub fn is_watching(&self, dir: &Path) -> bool {
        self.watched.contains(dir)
    }

    pub fn watched_count(&self) -> usize {
        self.watched.len()
    }

    /// Pause event forwarding (watches stay registered).
    pub fn pause(&self) {
        self.active.store(false, Ordering::Relaxed);
    }

    pub fn resume(&self) {
        self.active.store(true, Ordering::Relaxed);
    }

    /// Check if the watcher is currently active (forwarding events).
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }
}

/// Check if a path should be ignored based on ignore patterns.
///
/// A path is ignored if any of its components match any ignore pattern exactly.
pub fn should_ignore(path: &Path, patterns: &[String]) -> bool {
    path.components().any(|component| match component {
        std::path::Component::Normal(name) => {
            let name = name.to_string_lossy();
            patterns.iter().any(|pattern| name == pattern.as_str())
        }
        _ => false,
    })
}

/// Replace an oversized batch by the distinct directories it touched.
fn collapse_flood(paths: Vec<PathBuf>, threshold: usize) -> Vec<PathBuf> {
    if paths.len() <= threshold {
        return paths;
    }
    let parents: BTreeSet<PathBuf> = paths
        .iter()
        .filter_map(|p| p.parent().map(Path::to_path_buf))
        .collect();
    parents.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn ignore_git_directory() {
        let patterns = vec![".git".to_string()];
        assert!(should_ignore(Path::new("/home/user/project/.git/HEAD"), &patterns));
        assert!(should_ignore(Path::new("/home/user/project/.git/objects/abc"), &patterns));
    }

    #[test]
    fn do_not_ignore_normal_paths() {
        let patterns = vec![".git".to_string(), "node_modules".to_string()];
        assert!(!should_ignore(Path::new("/home/user/project/src/main.rs"), &patterns));
        assert!(!should_ignore(Path::new("/home/user/project/README.md"), &patterns));
    }

    #[test]
    fn empty_patterns_ignore_nothing() {
        let patterns: Vec<String> = vec![];
        assert!(!should_ignore(Path::new("/project/.git/HEAD"), &patterns));
    }

    #[test]
    fn partial_name_does_not_match() {
        let patterns = vec!["target".to_string()];
        assert!(!should_ignore(Path::new("/project/target2/file.txt"), &patterns));
    }

    #[test]
    fn flood_collapses_to_parent_directories() {
        let mut paths: Vec<PathBuf> = (0..150)
            .map(|i| PathBuf::from(format!("/tmp/a/file_{}", i)))
            .collect();
        paths.extend((0..60).map(|i| PathBuf::from(format!("/tmp/b/file_{}", i))));

        let collapsed = collapse_flood(paths, DEFAULT_FLOOD_THRESHOLD);
        assert_eq!(collapsed, vec![PathBuf::from("/tmp/a"), PathBuf::from("/tmp/b")]);
    }

    #[test]
    fn below_flood_threshold_keeps_individual_paths() {
        let paths: Vec<PathBuf> = (0..50)
            .map(|i| PathBuf::from(format!("/tmp/file_{}", i)))
            .collect();
        assert_eq!(collapse_flood(paths.clone(), DEFAULT_FLOOD_THRESHOLD), paths);
    }

    #[tokio::test]
    async fn watch_and_unwatch_track_directories() {
        let dir = TempDir::new().unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut watcher = FsWatcher::new(
            Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            vec![],
            DEFAULT_FLOOD_THRESHOLD,
            tx,
        )
        .unwrap();

        watcher.watch(dir.path()).unwrap();
        watcher.watch(dir.path()).unwrap();
        assert!(watcher.is_watching(dir.path()));
        assert_eq!(watcher.watched_count(), 1);

        watcher.unwatch(dir.path()).unwrap();
        assert!(!watcher.is_watching(dir.path()));
        watcher.unwatch(dir.path()).unwrap();
    }

    #[tokio::test]
    async fn pause_and_resume() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let watcher = FsWatcher::new(Duration::from_millis(50), vec![], 10, tx).unwrap();
        assert!(watcher.is_active());
        watcher.pause();
        assert!(!watcher.is_active());
        watcher.resume();
        assert!(watcher.is_active());
    }
}
