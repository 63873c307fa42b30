//! The incremental hierarchical file model.

mod entry;
mod iter;
mod list_model;
mod sequence;
mod signal;
mod sort;
mod tree_model;

pub use iter::{TreeIter, TreePath};
pub use list_model::ListModel;
pub use signal::{ModelEvent, ObserverId};
pub use sort::{SortColumn, SortOrder, SortSettings};
pub use tree_model::{
    Column, ColumnType, TreeDragDest, TreeModel, TreeModelFlags, TreeSortable, Value, EMPTY_TEXT,
    LOADING_TEXT,
};
