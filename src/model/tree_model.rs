//! Data-provider contract between the model and whatever view renders it.
//!
//! [`TreeModel`] is the read side (addressing, navigation, cell values),
//! [`TreeSortable`] the sort-column extension and [`TreeDragDest`] the
//! drop-target extension.

use std::sync::Arc;

use super::iter::{TreeIter, TreePath};
use super::sort::{SortColumn, SortOrder};
use crate::error::Result;
use crate::fs::file::FileInfo;

/// Text shown for the placeholder of a directory still being scanned.
pub const LOADING_TEXT: &str = "Loading...";
/// Text shown for the placeholder of a directory with no children.
pub const EMPTY_TEXT: &str = "(Empty)";

/// Columns a view can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    File,
    Icon,
    Color,
    FileName,
    Size,
    Type,
    Modified,
}

impl Column {
    pub const ALL: [Column; 7] = [
        Column::File,
        Column::Icon,
        Column::Color,
        Column::FileName,
        Column::Size,
        Column::Type,
        Column::Modified,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            Column::File => ColumnType::File,
            Column::Icon => ColumnType::Icon,
            _ => ColumnType::String,
        }
    }
}

impl From<SortColumn> for Column {
    fn from(column: SortColumn) -> Self {
        match column {
            SortColumn::Name => Column::FileName,
            SortColumn::Size => Column::Size,
            SortColumn::Type => Column::Type,
            SortColumn::Modified => Column::Modified,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    File,
    Icon,
    String,
}

/// One cell. Placeholder rows yield `None` everywhere except the name column.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    File(Option<Arc<FileInfo>>),
    /// Themed icon name.
    Icon(Option<String>),
    Text(Option<String>),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => text.as_deref(),
            Value::Icon(icon) => icon.as_deref(),
            Value::File(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeModelFlags {
    /// Iterators survive changes to other rows.
    pub iters_persist: bool,
    /// No row ever has children.
    pub list_only: bool,
}

/// Read access to a hierarchical, row-addressed model.
///
/// Every call taking an iterator fails with `StaleIter` if the iterator was
/// issued under an older stamp, and with `IterNotFound` if its row is gone.
pub trait TreeModel {
    fn flags(&self) -> TreeModelFlags;

    fn n_columns(&self) -> usize {
        Column::ALL.len()
    }

    fn column_type(&self, index: usize) -> Option<ColumnType> {
        Column::from_index(index).map(|c| c.column_type())
    }

    fn iter(&self, path: &TreePath) -> Result<TreeIter>;
    fn path(&self, iter: &TreeIter) -> Result<TreePath>;
    fn value(&self, iter: &TreeIter, column: Column) -> Result<Value>;

    /// Next sibling.
    fn iter_next(&self, iter: &TreeIter) -> Result<Option<TreeIter>>;
    /// First child of `parent`, or the first top-level row.
    fn iter_children(&self, parent: Option<&TreeIter>) -> Result<Option<TreeIter>>;
    fn iter_has_child(&self, iter: &TreeIter) -> Result<bool>;
    fn iter_n_children(&self, parent: Option<&TreeIter>) -> Result<usize>;
    fn iter_nth_child(&self, parent: Option<&TreeIter>, n: usize) -> Result<Option<TreeIter>>;
    fn iter_parent(&self, child: &TreeIter) -> Result<Option<TreeIter>>;
}

pub trait TreeSortable: TreeModel {
    fn sort_column(&self) -> (SortColumn, SortOrder);
    /// Re-sort the whole tree and announce the new column.
    fn set_sort_column(&mut self, column: SortColumn, order: SortOrder);
    fn has_default_sort_func(&self) -> bool;
}

pub trait TreeDragDest {
    fn drag_data_received(&mut self, dest: &TreePath, data: &[u8]) -> bool;
    fn row_drop_possible(&self, dest: &TreePath, data: &[u8]) -> bool;
}
