use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use super::iter::Ptr;
use super::sequence::{CollectionId, SeqHandle};
use crate::fs::file::FileInfo;
use crate::fs::loader::DirectoryHandle;

/// File location to the node holding it, for one collection.
pub(crate) type ReverseMap = HashMap<PathBuf, SeqHandle>;

/// One row of the model: a real file or a placeholder.
#[derive(Debug)]
pub(crate) struct Entry {
    /// `None` for a placeholder row.
    pub file: Option<Arc<FileInfo>>,
    /// Collection holding this entry's children, once expanded.
    pub children: Option<CollectionId>,
    /// Active scan session, while the directory is open.
    pub subdirectory: Option<DirectoryHandle>,
    /// Index of real children by location, while the directory is open.
    pub reverse_map: Option<ReverseMap>,
    /// Owning row; `None` at the top level.
    pub parent: Option<Ptr>,
    /// A real child has been seen, or the scan finished.
    pub loaded: bool,
}

impl Entry {
    pub fn new(file: Arc<FileInfo>, parent: Option<Ptr>) -> Self {
        Self {
            file: Some(file),
            children: None,
            subdirectory: None,
            reverse_map: None,
            parent,
            loaded: false,
        }
    }

    pub fn placeholder(parent: Ptr) -> Self {
        Self {
            file: None,
            children: None,
            subdirectory: None,
            reverse_map: None,
            parent: Some(parent),
            loaded: false,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.file.is_none()
    }
}
