use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::config::AppConfig;
use crate::error::{ModelError, Result};
use crate::event::{Event, EventHandler};
use crate::fs::file::FileInfo;
use crate::fs::loader::{
    read_directory, DirectoryHandle, DirectoryLoader, FsDirectoryLoader, LoaderEvent,
};
use crate::fs::watcher::{FsWatcher, DEFAULT_FLOOD_THRESHOLD};
use crate::model::{ListModel, ModelEvent, SortSettings, TreeIter, TreeModel, TreePath};

/// Settings the browser is created with.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub sort: SortSettings,
    pub show_hidden: bool,
    pub has_child: bool,
    /// Directory levels to open automatically as scans complete.
    pub expand_depth: usize,
    pub watch: bool,
    pub debounce: Duration,
    pub ignore_patterns: Vec<String>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for BrowserOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            sort: config.sort_settings(),
            show_hidden: config.show_hidden(),
            has_child: config.has_child(),
            expand_depth: config.expand_depth(),
            watch: config.watcher_enabled(),
            debounce: Duration::from_millis(config.debounce_ms()),
            ignore_patterns: config.ignore_patterns(),
        }
    }
}

/// Drives a [`ListModel`] against the real filesystem.
///
/// Owns the model, the scan sessions it opened and the watcher. All model
/// access happens on the thread that calls [`Browser::handle_event`].
pub struct Browser {
    root: Arc<FileInfo>,
    root_handle: DirectoryHandle,
    model: ListModel<FsDirectoryLoader>,
    /// Open subdirectories by location.
    open_dirs: HashMap<PathBuf, DirectoryHandle>,
    /// Scans started but not yet finished.
    pending: HashSet<DirectoryHandle>,
    /// Directories closed with [`Browser::collapse`]; depth expansion skips them.
    collapsed: HashSet<PathBuf>,
    watcher: Option<FsWatcher>,
    model_events: mpsc::UnboundedReceiver<ModelEvent>,
    show_hidden: bool,
    expand_depth: usize,
}

impl Browser {
    /// Create a browser rooted at `root`. Nothing is scanned until
    /// [`Browser::start`].
    pub fn new(root: &Path, options: BrowserOptions, events: &EventHandler) -> Result<Self> {
        let canonical = root
            .canonicalize()
            .map_err(|e| ModelError::InvalidPath(format!("{}: {}", root.display(), e)))?;
        let root = Arc::new(FileInfo::from_path(&canonical)?);
        if !root.is_directory() {
            return Err(ModelError::NotADirectory {
                location: canonical,
            });
        }

        let loader = FsDirectoryLoader::new(events.sender(), options.show_hidden);
        let mut model = ListModel::with_sort(loader, options.sort);
        model.set_has_child(options.has_child);
        let model_events = model.subscribe();
        let root_handle = model.loader_mut().open(&root);

        let watcher = if options.watch {
            match FsWatcher::new(
                options.debounce,
                options.ignore_patterns.clone(),
                DEFAULT_FLOOD_THRESHOLD,
                events.sender(),
            ) {
                Ok(w) => Some(w),
                Err(e) => {
                    log::warn!("filesystem watcher unavailable: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            root,
            root_handle,
            model,
            open_dirs: HashMap::new(),
            pending: HashSet::new(),
            collapsed: HashSet::new(),
            watcher,
            model_events,
            show_hidden: options.show_hidden,
            expand_depth: options.expand_depth,
        })
    }

    pub fn root(&self) -> &FileInfo {
        &self.root
    }

    pub fn model(&self) -> &ListModel<FsDirectoryLoader> {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut ListModel<FsDirectoryLoader> {
        &mut self.model
    }

    /// Begin the top-level scan.
    pub fn start(&mut self) {
        let handle = self.root_handle.clone();
        self.model.loader_mut().start(&handle);
        self.pending.insert(handle);
        let location = self.root.location.clone();
        self.watch(&location);
    }

    /// No scan is outstanding.
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    /// Whether the directory at `location` is currently open.
    pub fn is_open(&self, location: &Path) -> bool {
        self.open_dirs.contains_key(location)
    }

    /// Apply one event from the channel to the model.
    pub fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Loader(event) => self.handle_loader_event(event)?,
            Event::FsChange(paths) => {
                for path in paths {
                    self.apply_change(&path);
                }
            }
        }
        self.process_model_events();
        Ok(())
    }

    /// Handle events until every started scan has finished.
    pub async fn run_until_idle(&mut self, events: &mut EventHandler) -> Result<()> {
        while !self.is_idle() {
            match events.next().await {
                Some(event) => self.handle_event(event)?,
                None => break,
            }
        }
        Ok(())
    }

    /// Open the directory at `path` and start scanning it.
    pub fn expand(&mut self, path: &TreePath) -> Result<DirectoryHandle> {
        let handle = self.model.load_subdirectory(path)?;
        self.model.loader_mut().start(&handle);
        self.pending.insert(handle.clone());
        let location = handle.location().to_path_buf();
        self.collapsed.remove(&location);
        self.watch(&location);
        self.open_dirs.insert(location, handle.clone());
        Ok(handle)
    }

    /// Close the directory at `path`. It stays closed until expanded again.
    pub fn collapse(&mut self, path: &TreePath) -> Result<()> {
        let iter = self.model.get_iter_from_path(path)?;
        let location = self.model.file_for_iter(&iter)?.map(|f| f.location.clone());
        self.model.unload_subdirectory(&iter)?;
        if let Some(location) = location {
            self.collapsed.insert(location);
        }
        self.process_model_events();
        Ok(())
    }

    /// Open every directory row at most `depth` levels deep that is not open
    /// yet and was not collapsed. Returns how many were opened.
    pub fn expand_to_depth(&mut self, depth: usize) -> Result<usize> {
        let mut targets = Vec::new();
        self.collect_closed_directories(None, TreePath::new(), depth, &mut targets)?;
        for path in &targets {
            self.expand(path)?;
        }
        Ok(targets.len())
    }

    fn collect_closed_directories(
        &self,
        parent: Option<&TreeIter>,
        parent_path: TreePath,
        depth: usize,
        out: &mut Vec<TreePath>,
    ) -> Result<()> {
        let mut index = 0;
        let mut next = self.model.iter_children(parent)?;
        while let Some(iter) = next {
            let path = parent_path.child(index);
            if path.depth() <= depth {
                let (handle, file) = self.model.directory_file(&path);
                match (handle, file) {
                    (Some(_), _) => self.collect_closed_directories(Some(&iter), path, depth, out)?,
                    (None, Some(file))
                        if file.is_directory() && !self.collapsed.contains(&file.location) =>
                    {
                        out.push(path)
                    }
                    _ => {}
                }
            }
            next = self.model.iter_next(&iter)?;
            index += 1;
        }
        Ok(())
    }

    fn handle_loader_event(&mut self, event: LoaderEvent) -> Result<()> {
        if !self.model.loader().is_active(event.directory()) {
            log::trace!("dropping event for closed scan {}", event.directory().id());
            return Ok(());
        }
        let is_root = *event.directory() == self.root_handle;

        match event {
            LoaderEvent::FileAdded { directory, file } => {
                let parent = (!is_root).then_some(&directory);
                match self.model.add_file(file, parent) {
                    Ok(_) | Err(ModelError::DuplicateFile { .. }) => {}
                    Err(e) => return Err(e),
                }
            }
            LoaderEvent::Done { directory } => {
                self.pending.remove(&directory);
                if !is_root {
                    self.model.subdirectory_done_loading(&directory);
                }
                self.expand_to_depth(self.expand_depth)?;
            }
            LoaderEvent::Failed { directory, message } => {
                log::warn!("scan of {} failed: {}", directory.location().display(), message);
                self.pending.remove(&directory);
                if !is_root {
                    self.model.subdirectory_done_loading(&directory);
                }
            }
        }
        Ok(())
    }

    /// Bring the model in line with one changed path.
    fn apply_change(&mut self, path: &Path) {
        if path == self.root.location || self.open_dirs.contains_key(path) {
            self.resync(path);
            if path == self.root.location {
                return;
            }
        }

        let Some(directory) = path.parent().and_then(|parent| self.directory_for(parent)) else {
            return;
        };
        let directory = directory.as_ref();

        match FileInfo::from_path(path) {
            Ok(info) if info.is_hidden && !self.show_hidden => {}
            Ok(info) => {
                if self.model.find_cursor(path, directory).is_some() {
                    self.model.file_changed(info, directory);
                } else if let Err(e) = self.model.add_file(info, directory) {
                    log::debug!("ignoring change to {}: {}", path.display(), e);
                }
            }
            Err(_) => {
                self.model.remove_file(path, directory);
            }
        }
    }

    /// Re-read a visible directory and apply the difference.
    fn resync(&mut self, dir: &Path) {
        let Some(directory) = self.directory_for(dir) else {
            return;
        };
        let directory = directory.as_ref();
        let files = match read_directory(dir, self.show_hidden) {
            Ok(files) => files,
            Err(e) => {
                log::warn!("cannot re-read {}: {}", dir.display(), e);
                return;
            }
        };

        let present: HashSet<PathBuf> = files.iter().map(|f| f.location.clone()).collect();
        for location in self.visible_children(dir, directory) {
            if !present.contains(&location) {
                self.model.remove_file(&location, directory);
            }
        }
        for file in files {
            if self.model.find_cursor(&file.location, directory).is_some() {
                self.model.file_changed(file, directory);
            } else if let Err(e) = self.model.add_file(file, directory) {
                log::debug!("resync of {}: {}", dir.display(), e);
            }
        }
    }

    /// `Some(None)` for the root, `Some(Some(handle))` for an open directory.
    fn directory_for(&self, dir: &Path) -> Option<Option<DirectoryHandle>> {
        if dir == self.root.location {
            Some(None)
        } else {
            self.open_dirs.get(dir).map(|h| Some(h.clone()))
        }
    }

    fn visible_children(&self, dir: &Path, directory: Option<&DirectoryHandle>) -> Vec<PathBuf> {
        let parent = match directory {
            None => None,
            Some(handle) => match self.model.find_cursor(dir, Some(handle)) {
                Some(iter) => Some(iter),
                None => return Vec::new(),
            },
        };
        let mut locations = Vec::new();
        let mut next = self.model.iter_children(parent.as_ref()).ok().flatten();
        while let Some(iter) = next {
            if let Ok(Some(file)) = self.model.file_for_iter(&iter) {
                locations.push(file.location.clone());
            }
            next = self.model.iter_next(&iter).ok().flatten();
        }
        locations
    }

    /// Release bookkeeping for scan sessions the model let go of.
    fn process_model_events(&mut self) {
        while let Ok(event) = self.model_events.try_recv() {
            if let ModelEvent::SubdirectoryUnloaded { directory } = event {
                self.pending.remove(&directory);
                self.open_dirs.retain(|_, handle| *handle != directory);
                if let Some(watcher) = self.watcher.as_mut() {
                    if let Err(e) = watcher.unwatch(directory.location()) {
                        log::debug!("unwatch {}: {}", directory.location().display(), e);
                    }
                }
            }
        }
    }

    fn watch(&mut self, dir: &Path) {
        if let Some(watcher) = self.watcher.as_mut() {
            if let Err(e) = watcher.watch(dir) {
                log::warn!("cannot watch {}: {}", dir.display(), e);
            }
        }
    }

    #[cfg(test)]
    fn watched_count(&self) -> usize {
        self.watcher.as_ref().map_or(0, |w| w.watched_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Column, EMPTY_TEXT};
    use std::fs::{self, File};
    use tempfile::TempDir;

    fn setup_test_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("alpha")).unwrap();
        fs::create_dir(dir.path().join("beta")).unwrap();
        fs::create_dir(dir.path().join("empty")).unwrap();
        File::create(dir.path().join("alpha").join("inner.txt")).unwrap();
        File::create(dir.path().join("b.txt")).unwrap();
        File::create(dir.path().join("a.txt")).unwrap();
        File::create(dir.path().join(".hidden")).unwrap();
        dir
    }

    fn options() -> BrowserOptions {
        BrowserOptions {
            watch: false,
            ..BrowserOptions::default()
        }
    }

    async fn started(dir: &TempDir, options: BrowserOptions) -> (Browser, EventHandler) {
        let mut events = EventHandler::new();
        let mut browser = Browser::new(dir.path(), options, &events).unwrap();
        browser.start();
        browser.run_until_idle(&mut events).await.unwrap();
        (browser, events)
    }

    fn top_names(browser: &Browser) -> Vec<String> {
        let model = browser.model();
        (0..model.len())
            .map(|i| {
                model
                    .file_for_path(&TreePath::from_indices(vec![i]))
                    .unwrap()
                    .name
                    .clone()
            })
            .collect()
    }

    fn child_names(browser: &Browser, index: usize) -> Vec<String> {
        let model = browser.model();
        let parent = model
            .get_iter_from_path(&TreePath::from_indices(vec![index]))
            .unwrap();
        let mut names = Vec::new();
        let mut next = model.iter_children(Some(&parent)).unwrap();
        while let Some(iter) = next {
            let value = model.value(&iter, Column::FileName).unwrap();
            names.push(value.as_text().unwrap().to_string());
            next = model.iter_next(&iter).unwrap();
        }
        names
    }

    #[tokio::test]
    async fn lists_top_level_sorted() {
        let dir = setup_test_dir();
        let (browser, _events) = started(&dir, options()).await;
        assert_eq!(
            top_names(&browser),
            vec!["alpha", "beta", "empty", "a.txt", "b.txt"]
        );
        assert!(browser.is_idle());
    }

    #[tokio::test]
    async fn show_hidden_includes_dotfiles() {
        let dir = setup_test_dir();
        let opts = BrowserOptions {
            show_hidden: true,
            ..options()
        };
        let (browser, _events) = started(&dir, opts).await;
        assert!(top_names(&browser).contains(&".hidden".to_string()));
    }

    #[tokio::test]
    async fn expand_loads_children() {
        let dir = setup_test_dir();
        let (mut browser, mut events) = started(&dir, options()).await;

        browser.expand(&TreePath::from_indices(vec![0])).unwrap();
        browser.run_until_idle(&mut events).await.unwrap();

        assert_eq!(child_names(&browser, 0), vec!["inner.txt"]);
        assert!(browser.is_open(&dir.path().canonicalize().unwrap().join("alpha")));
    }

    #[tokio::test]
    async fn empty_directory_shows_empty_placeholder() {
        let dir = setup_test_dir();
        let (mut browser, mut events) = started(&dir, options()).await;

        browser.expand(&TreePath::from_indices(vec![2])).unwrap();
        browser.run_until_idle(&mut events).await.unwrap();

        assert_eq!(child_names(&browser, 2), vec![EMPTY_TEXT]);
    }

    #[tokio::test]
    async fn expand_depth_opens_directories_as_scans_finish() {
        let dir = setup_test_dir();
        let opts = BrowserOptions {
            expand_depth: 1,
            ..options()
        };
        let (browser, _events) = started(&dir, opts).await;

        assert_eq!(child_names(&browser, 0), vec!["inner.txt"]);
        assert_eq!(child_names(&browser, 1), vec![EMPTY_TEXT]);
        assert_eq!(browser.open_dirs.len(), 3);
    }

    #[tokio::test]
    async fn collapse_releases_directory() {
        let dir = setup_test_dir();
        let (mut browser, mut events) = started(&dir, options()).await;
        browser.expand(&TreePath::from_indices(vec![0])).unwrap();
        browser.run_until_idle(&mut events).await.unwrap();

        browser.collapse(&TreePath::from_indices(vec![0])).unwrap();

        assert!(browser.open_dirs.is_empty());
        assert_eq!(browser.model().directory_file(&TreePath::from_indices(vec![0])).0, None);
        assert_eq!(child_names(&browser, 0).len(), 1);
    }

    #[tokio::test]
    async fn collapsed_directory_stays_closed_after_later_scans() {
        let dir = setup_test_dir();
        let opts = BrowserOptions {
            expand_depth: 1,
            ..options()
        };
        let (mut browser, mut events) = started(&dir, opts).await;
        let root = browser.root().location.clone();

        browser.collapse(&TreePath::from_indices(vec![0])).unwrap();
        browser.collapse(&TreePath::from_indices(vec![1])).unwrap();
        browser.expand(&TreePath::from_indices(vec![1])).unwrap();
        browser.run_until_idle(&mut events).await.unwrap();

        assert!(!browser.is_open(&root.join("alpha")));
        assert!(browser.is_open(&root.join("beta")));
        assert_eq!(browser.model().directory_file(&TreePath::from_indices(vec![0])).0, None);

        browser.expand(&TreePath::from_indices(vec![0])).unwrap();
        browser.run_until_idle(&mut events).await.unwrap();
        assert_eq!(child_names(&browser, 0), vec!["inner.txt"]);
    }

    #[tokio::test]
    async fn events_for_collapsed_directory_are_dropped() {
        let dir = setup_test_dir();
        let (mut browser, mut events) = started(&dir, options()).await;

        let handle = browser.expand(&TreePath::from_indices(vec![0])).unwrap();
        browser.collapse(&TreePath::from_indices(vec![0])).unwrap();
        assert!(browser.is_idle());

        let late = LoaderEvent::FileAdded {
            directory: handle,
            file: FileInfo::from_path(&dir.path().join("a.txt")).unwrap(),
        };
        browser.handle_event(Event::Loader(late)).unwrap();
        tokio::task::yield_now().await;
        while let Some(event) = events.try_next() {
            browser.handle_event(event).unwrap();
        }

        assert_eq!(child_names(&browser, 0).len(), 1);
        assert!(browser.model().find_all_cursors(&dir.path().join("alpha/inner.txt")).is_empty());
    }

    #[tokio::test]
    async fn fs_changes_update_rows() {
        let dir = setup_test_dir();
        let (mut browser, _events) = started(&dir, options()).await;
        let root = browser.root().location.clone();

        fs::write(root.join("c.txt"), b"hello").unwrap();
        fs::remove_file(root.join("a.txt")).unwrap();
        fs::write(root.join("b.txt"), b"grown").unwrap();
        browser
            .handle_event(Event::FsChange(vec![
                root.join("c.txt"),
                root.join("a.txt"),
                root.join("b.txt"),
            ]))
            .unwrap();

        assert_eq!(top_names(&browser), vec!["alpha", "beta", "empty", "b.txt", "c.txt"]);
        let b = browser.model().find_cursor(&root.join("b.txt"), None).unwrap();
        let size = browser.model().file_for_iter(&b).unwrap().unwrap().size;
        assert_eq!(size, 5);
    }

    #[tokio::test]
    async fn directory_change_resyncs_children() {
        let dir = setup_test_dir();
        let (mut browser, mut events) = started(&dir, options()).await;
        browser.expand(&TreePath::from_indices(vec![0])).unwrap();
        browser.run_until_idle(&mut events).await.unwrap();
        let alpha = browser.root().location.join("alpha");

        fs::remove_file(alpha.join("inner.txt")).unwrap();
        File::create(alpha.join("fresh.txt")).unwrap();
        browser.handle_event(Event::FsChange(vec![alpha.clone()])).unwrap();

        assert_eq!(child_names(&browser, 0), vec!["fresh.txt"]);
    }

    #[tokio::test]
    async fn changes_outside_open_directories_are_ignored() {
        let dir = setup_test_dir();
        let (mut browser, _events) = started(&dir, options()).await;
        let beta = browser.root().location.join("beta");
        File::create(beta.join("unseen.txt")).unwrap();

        browser
            .handle_event(Event::FsChange(vec![beta.join("unseen.txt")]))
            .unwrap();

        assert!(browser.model().get_first_iter_for_file(&beta.join("unseen.txt")).is_none());
    }

    #[tokio::test]
    async fn watcher_follows_open_directories() {
        let dir = setup_test_dir();
        let opts = BrowserOptions {
            watch: true,
            ..BrowserOptions::default()
        };
        let (mut browser, mut events) = started(&dir, opts).await;
        assert_eq!(browser.watched_count(), 1);

        browser.expand(&TreePath::from_indices(vec![0])).unwrap();
        browser.run_until_idle(&mut events).await.unwrap();
        assert_eq!(browser.watched_count(), 2);

        browser.collapse(&TreePath::from_indices(vec![0])).unwrap();
        assert_eq!(browser.watched_count(), 1);
    }

    #[test]
    fn new_rejects_missing_and_non_directory_roots() {
        let dir = setup_test_dir();
        let events = EventHandler::new();
        assert!(matches!(
            Browser::new(&dir.path().join("nope"), options(), &events),
            Err(ModelError::InvalidPath(_))
        ));
        assert!(matches!(
            Browser::new(&dir.path().join("a.txt"), options(), &events),
            Err(ModelError::NotADirectory { .. })
        ));
    }
}
