use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::Result;
use crate::event::Event;
use crate::fs::file::FileInfo;

/// Opaque handle to one directory scan session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DirectoryHandle {
    id: u64,
    location: PathBuf,
}

impl DirectoryHandle {
    pub fn new(id: u64, location: impl Into<PathBuf>) -> Self {
        Self {
            id,
            location: location.into(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Directory being scanned.
    pub fn location(&self) -> &Path {
        &self.location
    }
}

/// Progress reported by a running scan.
#[derive(Debug, Clone)]
pub enum LoaderEvent {
    FileAdded {
        directory: DirectoryHandle,
        file: FileInfo,
    },
    /// Every file of the directory has been reported.
    Done { directory: DirectoryHandle },
    Failed {
        directory: DirectoryHandle,
        message: String,
    },
}

impl LoaderEvent {
    pub fn directory(&self) -> &DirectoryHandle {
        match self {
            LoaderEvent::FileAdded { directory, .. }
            | LoaderEvent::Done { directory }
            | LoaderEvent::Failed { directory, .. } => directory,
        }
    }
}

/// Asynchronous directory scanning as seen by the model.
///
/// Implementations must stop reporting files for a handle once it has been
/// cancelled.
pub trait DirectoryLoader {
    /// Create a scan session for `directory` without starting it.
    fn open(&mut self, directory: &FileInfo) -> DirectoryHandle;
    /// Begin reporting the directory's files.
    fn start(&mut self, handle: &DirectoryHandle);
    /// Stop the scan and release the session.
    fn cancel(&mut self, handle: &DirectoryHandle);
    fn is_active(&self, handle: &DirectoryHandle) -> bool;
}

/// Scans real directories on the blocking pool and reports back over the
/// event channel.
pub struct FsDirectoryLoader {
    event_tx: mpsc::UnboundedSender<Event>,
    show_hidden: bool,
    next_id: u64,
    /// Cancellation flag per open session.
    sessions: HashMap<DirectoryHandle, Arc<AtomicBool>>,
}

impl FsDirectoryLoader {
    pub fn new(event_tx: mpsc::UnboundedSender<Event>, show_hidden: bool) -> Self {
        Self {
            event_tx,
            show_hidden,
            next_id: 0,
            sessions: HashMap::new(),
        }
    }

    pub fn show_hidden(&self) -> bool {
        self.show_hidden
    }

    /// Number of open sessions.
    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }
}

impl DirectoryLoader for FsDirectoryLoader {
    fn open(&mut self, directory: &FileInfo) -> DirectoryHandle {
        let handle = DirectoryHandle::new(self.next_id, directory.location.clone());
        self.next_id += 1;
        self.sessions
            .insert(handle.clone(), Arc::new(AtomicBool::new(false)));
        log::debug!("opened scan session {} for {}", handle.id, handle.location.display());
        handle
    }

    fn start(&mut self, handle: &DirectoryHandle) {
        let Some(cancelled) = self.sessions.get(handle).cloned() else {
            log::warn!("start on unknown scan session {}", handle.id);
            return;
        };
        let tx = self.event_tx.clone();
        let handle = handle.clone();
        let show_hidden = self.show_hidden;
        tokio::task::spawn_blocking(move || scan(handle, show_hidden, &cancelled, &tx));
    }

    fn cancel(&mut self, handle: &DirectoryHandle) {
        if let Some(cancelled) = self.sessions.remove(handle) {
            cancelled.store(true, Ordering::Relaxed);
            log::debug!("cancelled scan session {}", handle.id);
        }
    }

    fn is_active(&self, handle: &DirectoryHandle) -> bool {
        self.sessions
            .get(handle)
            .is_some_and(|cancelled| !cancelled.load(Ordering::Relaxed))
    }
}

fn scan(
    directory: DirectoryHandle,
    show_hidden: bool,
    cancelled: &AtomicBool,
    tx: &mpsc::UnboundedSender<Event>,
) {
    let files = match read_directory(&directory.location, show_hidden) {
        Ok(files) => files,
        Err(e) => {
            let _ = tx.send(Event::Loader(LoaderEvent::Failed {
                directory,
                message: e.to_string(),
            }));
            return;
        }
    };

    for file in files {
        if cancelled.load(Ordering::Relaxed) {
            return;
        }
        let event = LoaderEvent::FileAdded {
            directory: directory.clone(),
            file,
        };
        if tx.send(Event::Loader(event)).is_err() {
            return;
        }
    }

    if !cancelled.load(Ordering::Relaxed) {
        let _ = tx.send(Event::Loader(LoaderEvent::Done { directory }));
    }
}

/// Read the immediate children of `path`, in directory order.
///
/// Entries that vanish or cannot be stat'ed while reading are skipped.
pub fn read_directory(path: &Path, show_hidden: bool) -> Result<Vec<FileInfo>> {
    let mut files = Vec::new();
    for dir_entry in fs::read_dir(path)? {
        let dir_entry = match dir_entry {
            Ok(e) => e,
            Err(e) => {
                log::debug!("skipping unreadable entry in {}: {}", path.display(), e);
                continue;
            }
        };
        match FileInfo::from_path(&dir_entry.path()) {
            Ok(info) if info.is_hidden && !show_hidden => {}
            Ok(info) => files.push(info),
            Err(e) => log::debug!("skipping {}: {}", dir_entry.path().display(), e),
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn setup_test_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        File::create(dir.path().join("a.txt")).unwrap();
        File::create(dir.path().join(".hidden")).unwrap();
        dir
    }

    fn names(files: &[FileInfo]) -> Vec<String> {
        let mut names: Vec<String> = files.iter().map(|f| f.name.clone()).collect();
        names.sort();
        names
    }

    async fn collect_until_finished(
        rx: &mut mpsc::UnboundedReceiver<Event>,
    ) -> (Vec<FileInfo>, Option<LoaderEvent>) {
        let mut files = Vec::new();
        while let Some(event) = rx.recv().await {
            match event {
                Event::Loader(LoaderEvent::FileAdded { file, .. }) => files.push(file),
                Event::Loader(other) => return (files, Some(other)),
                _ => {}
            }
        }
        (files, None)
    }

    #[test]
    fn read_directory_skips_hidden() {
        let dir = setup_test_dir();
        let files = read_directory(dir.path(), false).unwrap();
        assert_eq!(names(&files), vec!["a.txt", "sub"]);
        let files = read_directory(dir.path(), true).unwrap();
        assert_eq!(names(&files), vec![".hidden", "a.txt", "sub"]);
    }

    #[test]
    fn read_directory_missing_is_error() {
        assert!(read_directory(Path::new("/nonexistent/dir"), false).is_err());
    }

    #[tokio::test]
    async fn scan_reports_files_then_done() {
        let dir = setup_test_dir();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut loader = FsDirectoryLoader::new(tx, false);
        let handle = loader.open(&FileInfo::from_path(dir.path()).unwrap());
        assert!(loader.is_active(&handle));

        loader.start(&handle);
        let (files, last) = collect_until_finished(&mut rx).await;
        assert_eq!(names(&files), vec!["a.txt", "sub"]);
        assert!(matches!(last, Some(LoaderEvent::Done { directory }) if directory == handle));
    }

    #[tokio::test]
    async fn scan_of_missing_directory_fails() {
        let dir = setup_test_dir();
        let info = FileInfo::from_path(&dir.path().join("sub")).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut loader = FsDirectoryLoader::new(tx, false);
        let handle = loader.open(&info);
        fs::remove_dir(dir.path().join("sub")).unwrap();

        loader.start(&handle);
        let (files, last) = collect_until_finished(&mut rx).await;
        assert!(files.is_empty());
        assert!(matches!(last, Some(LoaderEvent::Failed { .. })));
    }

    #[tokio::test]
    async fn cancelled_session_is_inactive_and_silent() {
        let dir = setup_test_dir();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut loader = FsDirectoryLoader::new(tx, false);
        let handle = loader.open(&FileInfo::from_path(dir.path()).unwrap());
        loader.cancel(&handle);
        assert!(!loader.is_active(&handle));
        assert_eq!(loader.active_count(), 0);

        loader.start(&handle);
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn handles_are_unique() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut loader = FsDirectoryLoader::new(tx, false);
        let info = FileInfo::new(Path::new("/d"), crate::fs::file::FileKind::Directory, 0, None);
        let a = loader.open(&info);
        let b = loader.open(&info);
        assert_ne!(a, b);
        assert_eq!(a.location(), Path::new("/d"));
    }
}
