use std::cmp::Ordering;

use super::entry::Entry;
use crate::fs::file::FileInfo;

/// Primary sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortColumn {
    /// Alphabetical (case-insensitive), default.
    Name,
    /// By file size.
    Size,
    /// By content type.
    Type,
    /// By modification time.
    Modified,
}

impl SortColumn {
    /// Parse a column name from config or the command line.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "name" | "filename" => Some(SortColumn::Name),
            "size" => Some(SortColumn::Size),
            "type" => Some(SortColumn::Type),
            "modified" | "mtime" => Some(SortColumn::Modified),
            _ => None,
        }
    }

    /// Get the display label for the column.
    pub fn label(&self) -> &'static str {
        match self {
            SortColumn::Name => "Name",
            SortColumn::Size => "Size",
            SortColumn::Type => "Type",
            SortColumn::Modified => "Modified",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(SortOrder::Ascending),
            "desc" | "descending" => Some(SortOrder::Descending),
            _ => None,
        }
    }
}

/// The active comparator parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSettings {
    pub column: SortColumn,
    pub order: SortOrder,
    /// Whether directories are listed before files, whatever the order.
    pub directories_first: bool,
}

impl Default for SortSettings {
    fn default() -> Self {
        Self {
            column: SortColumn::Name,
            order: SortOrder::Ascending,
            directories_first: true,
        }
    }
}

impl SortSettings {
    pub fn compare_files(&self, a: &FileInfo, b: &FileInfo) -> Ordering {
        if self.directories_first {
            let dirs = b.is_directory().cmp(&a.is_directory());
            if dirs != Ordering::Equal {
                return dirs;
            }
        }

        let by_name = || {
            a.sort_key
                .cmp(&b.sort_key)
                .then_with(|| a.name.cmp(&b.name))
        };
        let cmp = match self.column {
            SortColumn::Name => by_name(),
            SortColumn::Size => a.size.cmp(&b.size).then_with(by_name),
            SortColumn::Type => a.content_type.cmp(&b.content_type).then_with(by_name),
            SortColumn::Modified => a.modified.cmp(&b.modified).then_with(by_name),
        };

        match self.order {
            SortOrder::Ascending => cmp,
            SortOrder::Descending => cmp.reverse(),
        }
    }

    /// Placeholders sort before real rows regardless of direction.
    pub(crate) fn compare_entries(&self, a: &Entry, b: &Entry) -> Ordering {
        match (&a.file, &b.file) {
            (Some(fa), Some(fb)) => self.compare_files(fa, fb),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}
