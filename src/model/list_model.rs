use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use slotmap::SlotMap;
use tokio::sync::mpsc;

use super::entry::{Entry, ReverseMap};
use super::iter::{Ptr, TreeIter, TreePath};
use super::sequence::{CollectionId, Sequence};
use super::signal::{ModelEvent, ObserverId, Observers};
use super::sort::{SortColumn, SortOrder, SortSettings};
use super::tree_model::{
    Column, TreeDragDest, TreeModel, TreeModelFlags, TreeSortable, Value, EMPTY_TEXT,
    LOADING_TEXT,
};
use crate::error::{ModelError, Result};
use crate::fs::file::FileInfo;
use crate::fs::loader::{DirectoryHandle, DirectoryLoader};

/// Sorted, lazily expanded tree of files.
///
/// Rows live in one ordered collection per expanded directory plus one for
/// the top level. Files arrive through [`ListModel::add_file`], either at the
/// top level or under a directory opened with
/// [`ListModel::load_subdirectory`]. Every structural change is reported to
/// observers synchronously and in order.
pub struct ListModel<L> {
    collections: SlotMap<CollectionId, Sequence<Entry>>,
    /// Top-level collection.
    root: CollectionId,
    top_reverse_map: ReverseMap,
    /// Open scan sessions to the row that opened them.
    directory_reverse_map: HashMap<DirectoryHandle, Ptr>,
    stamp: u32,
    sort: SortSettings,
    has_child: bool,
    loader: L,
    observers: Observers,
}

impl<L: DirectoryLoader> ListModel<L> {
    pub fn new(loader: L) -> Self {
        Self::with_sort(loader, SortSettings::default())
    }

    pub fn with_sort(loader: L, sort: SortSettings) -> Self {
        let mut collections = SlotMap::with_key();
        let root = collections.insert(Sequence::new());
        Self {
            collections,
            root,
            top_reverse_map: HashMap::new(),
            directory_reverse_map: HashMap::new(),
            stamp: rand::random(),
            sort,
            has_child: true,
            loader,
            observers: Observers::default(),
        }
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn loader_mut(&mut self) -> &mut L {
        &mut self.loader
    }

    // ── Observers ────────────────────────────────────────────────────────

    /// Register a callback for every [`ModelEvent`].
    pub fn connect<F>(&mut self, callback: F) -> ObserverId
    where
        F: FnMut(&ModelEvent) + Send + 'static,
    {
        self.observers.connect(Box::new(callback))
    }

    pub fn disconnect(&mut self, id: ObserverId) -> bool {
        self.observers.disconnect(id)
    }

    /// Receive every [`ModelEvent`] over a channel.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ModelEvent> {
        self.observers.subscribe()
    }

    // ── Properties ───────────────────────────────────────────────────────

    /// Number of top-level rows.
    pub fn len(&self) -> usize {
        self.collections[self.root].len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections[self.root].is_empty()
    }

    pub fn stamp(&self) -> u32 {
        self.stamp
    }

    /// Reject every iterator issued so far.
    pub fn invalidate_iters(&mut self) {
        self.stamp = self.stamp.wrapping_add(1);
    }

    pub fn sort_settings(&self) -> SortSettings {
        self.sort
    }

    pub fn has_child(&self) -> bool {
        self.has_child
    }

    /// With `false` the model presents itself as a flat list.
    pub fn set_has_child(&mut self, has_child: bool) {
        self.has_child = has_child;
    }

    // ── Addressing ───────────────────────────────────────────────────────

    pub fn get_iter_from_path(&self, path: &TreePath) -> Result<TreeIter> {
        let not_found = || ModelError::PathNotFound { path: path.clone() };
        let mut collection = self.root;
        let mut found = None;
        for &index in path.indices() {
            if let Some(parent) = found {
                collection = self.entry(parent).and_then(|e| e.children).ok_or_else(not_found)?;
            }
            let node = self.collections[collection].nth(index).ok_or_else(not_found)?;
            found = Some(Ptr { collection, node });
        }
        found.map(|ptr| self.make_iter(ptr)).ok_or_else(not_found)
    }

    pub fn get_path(&self, iter: &TreeIter) -> Result<TreePath> {
        let ptr = self.validate(iter)?;
        Ok(self.path_of(ptr))
    }

    // ── Lookup by identity ───────────────────────────────────────────────

    /// Row of `location` under `directory`, or at the top level.
    ///
    /// A directory finds its own row when asked for its own location.
    pub fn find_cursor(
        &self,
        location: &Path,
        directory: Option<&DirectoryHandle>,
    ) -> Option<TreeIter> {
        self.lookup(location, directory).map(|ptr| self.make_iter(ptr))
    }

    /// Every row showing `location`: the top level first, then each open
    /// directory.
    pub fn find_all_cursors(&self, location: &Path) -> Vec<TreeIter> {
        let mut found: Vec<TreeIter> = self
            .top_reverse_map
            .get(location)
            .map(|&node| Ptr {
                collection: self.root,
                node,
            })
            .into_iter()
            .map(|ptr| self.make_iter(ptr))
            .collect();

        for dir_ptr in self.directory_reverse_map.values() {
            let Some(entry) = self.entry(*dir_ptr) else {
                continue;
            };
            let (Some(children), Some(map)) = (entry.children, entry.reverse_map.as_ref()) else {
                continue;
            };
            if let Some(&node) = map.get(location) {
                found.push(self.make_iter(Ptr {
                    collection: children,
                    node,
                }));
            }
        }
        found
    }

    pub fn get_first_iter_for_file(&self, location: &Path) -> Option<TreeIter> {
        self.find_all_cursors(location).into_iter().next()
    }

    pub fn file_for_iter(&self, iter: &TreeIter) -> Result<Option<Arc<FileInfo>>> {
        let ptr = self.validate(iter)?;
        Ok(self.entry(ptr).and_then(|e| e.file.clone()))
    }

    pub fn file_for_path(&self, path: &TreePath) -> Option<Arc<FileInfo>> {
        let iter = self.get_iter_from_path(path).ok()?;
        self.entry(iter.ptr).and_then(|e| e.file.clone())
    }

    /// Open scan session and file of the row at `path`.
    pub fn directory_file(
        &self,
        path: &TreePath,
    ) -> (Option<DirectoryHandle>, Option<Arc<FileInfo>>) {
        let Some(entry) = self
            .get_iter_from_path(path)
            .ok()
            .and_then(|iter| self.entry(iter.ptr))
        else {
            return (None, None);
        };
        (entry.subdirectory.clone(), entry.file.clone())
    }

    /// Whether the directory at `iter` has reported a child or finished
    /// scanning.
    pub fn is_loaded(&self, iter: &TreeIter) -> Result<bool> {
        let ptr = self.validate(iter)?;
        Ok(self.entry(ptr).is_some_and(|e| e.loaded))
    }

    // ── Mutation ─────────────────────────────────────────────────────────

    /// Insert `file` under `directory` (the top level for `None` or an
    /// unknown handle).
    ///
    /// The first real child of a directory takes over its placeholder row
    /// and is announced as a change rather than an insertion. Directories
    /// get a placeholder child of their own.
    pub fn add_file(
        &mut self,
        file: impl Into<Arc<FileInfo>>,
        directory: Option<&DirectoryHandle>,
    ) -> Result<TreeIter> {
        let file: Arc<FileInfo> = file.into();
        let parent = directory.and_then(|d| self.directory_reverse_map.get(d).copied());

        let collection = match parent {
            None => self.root,
            Some(parent_ptr) => {
                let entry = self.entry(parent_ptr).ok_or(ModelError::IterNotFound)?;
                entry.children.ok_or_else(|| ModelError::NotADirectory {
                    location: entry
                        .file
                        .as_ref()
                        .map(|f| f.location.clone())
                        .unwrap_or_default(),
                })?
            }
        };

        let already_present = match parent {
            None => self.top_reverse_map.contains_key(&file.location),
            Some(parent_ptr) => self
                .entry(parent_ptr)
                .and_then(|e| e.reverse_map.as_ref())
                .is_some_and(|map| map.contains_key(&file.location)),
        };
        if already_present {
            log::warn!("file already in tree: {}", file.location.display());
            return Err(ModelError::DuplicateFile {
                location: file.location.clone(),
            });
        }

        let is_directory = file.is_directory();
        let location = file.location.clone();
        let entry = Entry::new(file, parent);

        let placeholder = if parent.is_some() {
            let seq = &self.collections[collection];
            seq.first()
                .filter(|&first| seq.len() == 1 && seq.get(first).is_some_and(Entry::is_placeholder))
        } else {
            None
        };

        let node = match placeholder {
            Some(node) => {
                if let Some(slot) = self.collections[collection].get_mut(node) {
                    *slot = entry;
                }
                node
            }
            None => {
                let settings = self.sort;
                self.collections[collection]
                    .insert_sorted(entry, |a, b| settings.compare_entries(a, b))
            }
        };
        let ptr = Ptr { collection, node };

        match parent {
            None => {
                self.top_reverse_map.insert(location, node);
            }
            Some(parent_ptr) => {
                if let Some(parent_entry) = self.entry_mut(parent_ptr) {
                    parent_entry.loaded = true;
                    if let Some(map) = parent_entry.reverse_map.as_mut() {
                        map.insert(location, node);
                    }
                }
            }
        }

        let iter = self.make_iter(ptr);
        let path = self.path_of(ptr);
        if placeholder.is_some() {
            self.emit(ModelEvent::RowChanged {
                path: path.clone(),
                iter,
            });
        } else {
            self.emit(ModelEvent::RowInserted {
                path: path.clone(),
                iter,
            });
        }

        if is_directory {
            let children = self.collections.insert(Sequence::new());
            if let Some(entry) = self.entry_mut(ptr) {
                entry.children = Some(children);
            }
            self.add_placeholder(ptr);
            self.emit(ModelEvent::RowHasChildToggled { path, iter });
        }

        Ok(iter)
    }

    /// Store a new snapshot of a file already in the tree and move its row
    /// if the ordering changed.
    ///
    /// Returns `None` when the file is not under `directory`.
    pub fn file_changed(
        &mut self,
        file: impl Into<Arc<FileInfo>>,
        directory: Option<&DirectoryHandle>,
    ) -> Option<TreeIter> {
        let file: Arc<FileInfo> = file.into();
        let ptr = self.lookup(&file.location, directory)?;
        let seq_len = self.collections[ptr.collection].len();
        let before = self.collections[ptr.collection].position(ptr.node)?;

        if let Some(entry) = self.entry_mut(ptr) {
            entry.file = Some(file);
        }
        let settings = self.sort;
        self.collections[ptr.collection].sort_changed(ptr.node, |a, b| settings.compare_entries(a, b));
        let after = self.collections[ptr.collection].position(ptr.node)?;

        if before != after {
            let mut new_order = Vec::with_capacity(seq_len);
            let mut old = 0;
            for i in 0..seq_len {
                if i == after {
                    new_order.push(before);
                } else {
                    if old == before {
                        old += 1;
                    }
                    new_order.push(old);
                    old += 1;
                }
            }
            let (path, iter) = self.parent_path_and_iter(ptr);
            self.emit(ModelEvent::RowsReordered {
                path,
                iter,
                new_order,
            });
        }

        let iter = self.make_iter(ptr);
        let path = self.path_of(ptr);
        self.emit(ModelEvent::RowChanged { path, iter });
        Some(iter)
    }

    /// Remove a row and everything below it.
    pub fn remove(&mut self, iter: &TreeIter) -> Result<()> {
        let ptr = self.validate(iter)?;
        self.remove_ptr(ptr);
        Ok(())
    }

    /// Remove `location` from under `directory`. Returns whether it was there.
    pub fn remove_file(&mut self, location: &Path, directory: Option<&DirectoryHandle>) -> bool {
        match self.lookup(location, directory) {
            Some(ptr) => {
                self.remove_ptr(ptr);
                true
            }
            None => false,
        }
    }

    /// Remove every row.
    pub fn clear(&mut self) {
        while let Some(first) = self.collections[self.root].first() {
            self.remove_ptr(Ptr {
                collection: self.root,
                node: first,
            });
        }
    }

    // ── Subdirectories ───────────────────────────────────────────────────

    /// Open the directory at `path` for loading.
    ///
    /// The returned handle is not started; the caller starts the scan and
    /// feeds its files back through [`ListModel::add_file`].
    pub fn load_subdirectory(&mut self, path: &TreePath) -> Result<DirectoryHandle> {
        let iter = self.get_iter_from_path(path)?;
        let ptr = iter.ptr;
        let entry = self.entry(ptr).ok_or(ModelError::IterNotFound)?;
        let file = entry.file.clone().ok_or(ModelError::Placeholder)?;
        if entry.subdirectory.is_some() {
            return Err(ModelError::AlreadyLoaded {
                location: file.location.clone(),
            });
        }
        if !file.is_directory() || entry.children.is_none() {
            return Err(ModelError::NotADirectory {
                location: file.location.clone(),
            });
        }

        let handle = self.loader.open(&file);
        if self.directory_reverse_map.contains_key(&handle) {
            log::warn!("scan session for {} already registered", file.location.display());
            return Err(ModelError::AlreadyLoaded {
                location: file.location.clone(),
            });
        }
        self.directory_reverse_map.insert(handle.clone(), ptr);
        if let Some(entry) = self.entry_mut(ptr) {
            entry.subdirectory = Some(handle.clone());
            entry.reverse_map = Some(ReverseMap::new());
        }
        log::debug!("loading subdirectory {} at {}", file.location.display(), path);
        Ok(handle)
    }

    /// Close the directory at `iter`: cancel its scan and drop its real
    /// children, keeping the placeholder.
    pub fn unload_subdirectory(&mut self, iter: &TreeIter) -> Result<()> {
        let ptr = self.validate(iter)?;
        let (handle, children) = match self.entry(ptr) {
            Some(entry) if !entry.is_placeholder() => match &entry.subdirectory {
                Some(handle) => (handle.clone(), entry.children),
                None => return Ok(()),
            },
            _ => return Ok(()),
        };

        self.loader.cancel(&handle);
        self.directory_reverse_map.remove(&handle);
        if let Some(entry) = self.entry_mut(ptr) {
            entry.loaded = false;
        }

        if let Some(children) = children {
            while let Some(first) = self.collections[children].first() {
                let child = Ptr {
                    collection: children,
                    node: first,
                };
                if self.entry(child).map_or(true, Entry::is_placeholder) {
                    break;
                }
                self.remove_ptr(child);
            }
        }

        log::debug!("unloaded subdirectory {}", handle.location().display());
        self.emit(ModelEvent::SubdirectoryUnloaded { directory: handle });
        if let Some(entry) = self.entry_mut(ptr) {
            entry.subdirectory = None;
            entry.reverse_map = None;
        }
        Ok(())
    }

    /// The scan for `directory` finished. A directory that is still only
    /// showing its placeholder becomes loaded and the placeholder is
    /// re-announced so views switch it to the empty text.
    pub fn subdirectory_done_loading(&mut self, directory: &DirectoryHandle) {
        let Some(dir_ptr) = self.directory_reverse_map.get(directory).copied() else {
            log::trace!("done for unknown scan session {}", directory.id());
            return;
        };
        let Some(children) = self.entry(dir_ptr).and_then(|e| e.children) else {
            return;
        };
        let seq = &self.collections[children];
        let Some(first) = seq.first() else {
            return;
        };
        if seq.len() != 1 || !seq.get(first).is_some_and(Entry::is_placeholder) {
            return;
        }

        if let Some(entry) = self.entry_mut(dir_ptr) {
            entry.loaded = true;
        }
        let placeholder = Ptr {
            collection: children,
            node: first,
        };
        let iter = self.make_iter(placeholder);
        let path = self.path_of(placeholder);
        self.emit(ModelEvent::RowChanged { path, iter });
    }

    // ── Sorting ──────────────────────────────────────────────────────────

    /// Change the sort column and direction, re-sorting the whole tree.
    pub fn set_sort_column(&mut self, column: SortColumn, order: SortOrder) {
        self.sort.column = column;
        self.sort.order = order;
        self.resort();
        self.emit(ModelEvent::SortColumnChanged {
            settings: self.sort,
        });
    }

    pub fn set_sort_directories_first(&mut self, directories_first: bool) {
        if self.sort.directories_first == directories_first {
            return;
        }
        self.sort.directories_first = directories_first;
        self.resort();
    }

    fn resort(&mut self) {
        let mut path = TreePath::new();
        self.sort_collection(self.root, &mut path, None);
    }

    /// Sort `collection` and everything below it, children first, emitting
    /// one reorder per level whose order actually changed.
    fn sort_collection(&mut self, collection: CollectionId, path: &mut TreePath, iter: Option<TreeIter>) {
        let old_order: Vec<_> = self.collections[collection].handles().collect();

        for (index, &node) in old_order.iter().enumerate() {
            let ptr = Ptr { collection, node };
            if let Some(children) = self.entry(ptr).and_then(|e| e.children) {
                path.append_index(index);
                let child_iter = self.make_iter(ptr);
                self.sort_collection(children, path, Some(child_iter));
                path.up();
            }
        }

        if old_order.len() <= 1 {
            return;
        }

        let settings = self.sort;
        let seq = &mut self.collections[collection];
        seq.sort(|a, b| settings.compare_entries(a, b));

        let mut new_order = vec![0; old_order.len()];
        for (old_position, &node) in old_order.iter().enumerate() {
            if let Some(new_position) = seq.position(node) {
                new_order[new_position] = old_position;
            }
        }
        if new_order.iter().enumerate().all(|(i, &old)| i == old) {
            return;
        }

        self.emit(ModelEvent::RowsReordered {
            path: path.clone(),
            iter,
            new_order,
        });
    }

    // ── Internals ────────────────────────────────────────────────────────

    fn entry(&self, ptr: Ptr) -> Option<&Entry> {
        self.collections.get(ptr.collection)?.get(ptr.node)
    }

    fn entry_mut(&mut self, ptr: Ptr) -> Option<&mut Entry> {
        self.collections.get_mut(ptr.collection)?.get_mut(ptr.node)
    }

    fn make_iter(&self, ptr: Ptr) -> TreeIter {
        TreeIter {
            stamp: self.stamp,
            ptr,
        }
    }

    fn validate(&self, iter: &TreeIter) -> Result<Ptr> {
        if iter.stamp != self.stamp {
            return Err(ModelError::StaleIter {
                expected: self.stamp,
                found: iter.stamp,
            });
        }
        if self.entry(iter.ptr).is_none() {
            return Err(ModelError::IterNotFound);
        }
        Ok(iter.ptr)
    }

    fn path_of(&self, ptr: Ptr) -> TreePath {
        let mut path = TreePath::new();
        let mut current = Some(ptr);
        while let Some(ptr) = current {
            let position = self.collections[ptr.collection]
                .position(ptr.node)
                .expect("linked entry has a position");
            path.prepend_index(position);
            current = self.entry(ptr).and_then(|e| e.parent);
        }
        path
    }

    fn parent_path_and_iter(&self, ptr: Ptr) -> (TreePath, Option<TreeIter>) {
        match self.entry(ptr).and_then(|e| e.parent) {
            Some(parent) => (self.path_of(parent), Some(self.make_iter(parent))),
            None => (TreePath::new(), None),
        }
    }

    fn child_count(&self, ptr: Ptr) -> usize {
        self.entry(ptr)
            .and_then(|e| e.children)
            .map_or(0, |children| self.collections[children].len())
    }

    fn lookup(&self, location: &Path, directory: Option<&DirectoryHandle>) -> Option<Ptr> {
        if let Some(dir_ptr) = directory.and_then(|d| self.directory_reverse_map.get(d)) {
            let entry = self.entry(*dir_ptr)?;
            if entry.file.as_ref().is_some_and(|f| f.location == location) {
                return Some(*dir_ptr);
            }
            let node = *entry.reverse_map.as_ref()?.get(location)?;
            return Some(Ptr {
                collection: entry.children?,
                node,
            });
        }
        self.top_reverse_map.get(location).map(|&node| Ptr {
            collection: self.root,
            node,
        })
    }

    fn add_placeholder(&mut self, parent: Ptr) {
        let Some(children) = self.entry(parent).and_then(|e| e.children) else {
            return;
        };
        let settings = self.sort;
        let node = self.collections[children]
            .insert_sorted(Entry::placeholder(parent), |a, b| settings.compare_entries(a, b));
        let ptr = Ptr {
            collection: children,
            node,
        };
        let iter = self.make_iter(ptr);
        let path = self.path_of(ptr);
        self.emit(ModelEvent::RowInserted { path, iter });
    }

    fn remove_ptr(&mut self, ptr: Ptr) {
        if let Some(children) = self.entry(ptr).and_then(|e| e.children) {
            while let Some(first) = self.collections[children].first() {
                let child = Ptr {
                    collection: children,
                    node: first,
                };
                if self.entry(child).is_some_and(|e| !e.is_placeholder()) {
                    self.remove_ptr(child);
                } else {
                    let path = self.path_of(child);
                    self.collections[children].remove(first);
                    self.emit(ModelEvent::RowDeleted { path });
                }
            }
            self.collections.remove(children);
            if let Some(entry) = self.entry_mut(ptr) {
                entry.children = None;
            }
        }

        let Some(entry) = self.entry(ptr) else {
            return;
        };
        let location = entry.file.as_ref().map(|f| f.location.clone());
        let parent = entry.parent;
        let subdirectory = entry.subdirectory.clone();

        if let Some(location) = &location {
            match parent {
                Some(parent_ptr) => {
                    if let Some(map) = self.entry_mut(parent_ptr).and_then(|e| e.reverse_map.as_mut()) {
                        map.remove(location);
                    }
                }
                None => {
                    self.top_reverse_map.remove(location);
                }
            }
        }

        // Last real child: put the placeholder in before the row goes away.
        if let (Some(parent_ptr), Some(_)) = (parent, &location) {
            if self.child_count(parent_ptr) == 1 {
                self.add_placeholder(parent_ptr);
            }
        }

        if let Some(handle) = subdirectory {
            self.loader.cancel(&handle);
            self.directory_reverse_map.remove(&handle);
            self.emit(ModelEvent::SubdirectoryUnloaded { directory: handle });
        }

        let path = self.path_of(ptr);
        self.collections[ptr.collection].remove(ptr.node);
        self.emit(ModelEvent::RowDeleted { path });

        if let Some(parent_ptr) = parent {
            if self.child_count(parent_ptr) == 0 {
                let iter = self.make_iter(parent_ptr);
                let path = self.path_of(parent_ptr);
                self.emit(ModelEvent::RowHasChildToggled { path, iter });
            }
        }
    }

    fn children_of(&self, parent: Option<&TreeIter>) -> Result<Option<CollectionId>> {
        match parent {
            None => Ok(Some(self.root)),
            Some(iter) => {
                let ptr = self.validate(iter)?;
                Ok(self.entry(ptr).and_then(|e| e.children))
            }
        }
    }

    fn emit(&mut self, event: ModelEvent) {
        self.observers.emit(event);
    }
}

impl<L: DirectoryLoader> TreeModel for ListModel<L> {
    fn flags(&self) -> TreeModelFlags {
        TreeModelFlags {
            iters_persist: true,
            list_only: !self.has_child,
        }
    }

    fn iter(&self, path: &TreePath) -> Result<TreeIter> {
        self.get_iter_from_path(path)
    }

    fn path(&self, iter: &TreeIter) -> Result<TreePath> {
        self.get_path(iter)
    }

    fn value(&self, iter: &TreeIter, column: Column) -> Result<Value> {
        let ptr = self.validate(iter)?;
        let entry = self.entry(ptr).ok_or(ModelError::IterNotFound)?;
        let Some(file) = entry.file.as_ref() else {
            return Ok(match column {
                Column::File => Value::File(None),
                Column::Icon => Value::Icon(None),
                Column::FileName => {
                    let loaded = entry
                        .parent
                        .and_then(|p| self.entry(p))
                        .is_some_and(|p| p.loaded);
                    let text = if loaded { EMPTY_TEXT } else { LOADING_TEXT };
                    Value::Text(Some(text.to_string()))
                }
                _ => Value::Text(None),
            });
        };
        Ok(match column {
            Column::File => Value::File(Some(file.clone())),
            Column::Icon => Value::Icon(Some(file.icon_name.clone())),
            Column::Color => Value::Text(file.color.clone()),
            Column::FileName => Value::Text(Some(file.name.clone())),
            Column::Size => Value::Text(Some(file.formatted_size.clone())),
            Column::Type => Value::Text(Some(file.formatted_type.clone())),
            Column::Modified => Value::Text(Some(file.formatted_modified.clone())),
        })
    }

    fn iter_next(&self, iter: &TreeIter) -> Result<Option<TreeIter>> {
        let ptr = self.validate(iter)?;
        Ok(self.collections[ptr.collection].next(ptr.node).map(|node| {
            self.make_iter(Ptr {
                collection: ptr.collection,
                node,
            })
        }))
    }

    fn iter_children(&self, parent: Option<&TreeIter>) -> Result<Option<TreeIter>> {
        self.iter_nth_child(parent, 0)
    }

    fn iter_has_child(&self, iter: &TreeIter) -> Result<bool> {
        let ptr = self.validate(iter)?;
        Ok(self.has_child && self.child_count(ptr) > 0)
    }

    fn iter_n_children(&self, parent: Option<&TreeIter>) -> Result<usize> {
        Ok(self
            .children_of(parent)?
            .map_or(0, |children| self.collections[children].len()))
    }

    fn iter_nth_child(&self, parent: Option<&TreeIter>, n: usize) -> Result<Option<TreeIter>> {
        let Some(collection) = self.children_of(parent)? else {
            return Ok(None);
        };
        Ok(self.collections[collection]
            .nth(n)
            .map(|node| self.make_iter(Ptr { collection, node })))
    }

    fn iter_parent(&self, child: &TreeIter) -> Result<Option<TreeIter>> {
        let ptr = self.validate(child)?;
        Ok(self
            .entry(ptr)
            .and_then(|e| e.parent)
            .map(|parent| self.make_iter(parent)))
    }
}

impl<L: DirectoryLoader> TreeSortable for ListModel<L> {
    fn sort_column(&self) -> (SortColumn, SortOrder) {
        (self.sort.column, self.sort.order)
    }

    fn set_sort_column(&mut self, column: SortColumn, order: SortOrder) {
        ListModel::set_sort_column(self, column, order);
    }

    fn has_default_sort_func(&self) -> bool {
        false
    }
}

impl<L> TreeDragDest for ListModel<L> {
    fn drag_data_received(&mut self, _dest: &TreePath, _data: &[u8]) -> bool {
        false
    }

    fn row_drop_possible(&self, _dest: &TreePath, _data: &[u8]) -> bool {
        false
    }
}
