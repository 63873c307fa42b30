//! Plain-text and JSON views of the model.

use std::path::PathBuf;

use serde::Serialize;

use crate::error::Result;
use crate::fs::loader::DirectoryLoader;
use crate::model::{Column, ListModel, ModelEvent, TreeIter, TreeModel, TreePath};

/// One visible row, flattened in model order.
#[derive(Debug, Clone, Serialize)]
pub struct Row {
    /// Tree path in `"2:0"` form.
    pub path: String,
    #[serde(skip)]
    pub depth: usize,
    /// Whether each ancestor (and the row itself, last) is its parent's
    /// last child. Drives the connector drawing.
    #[serde(skip)]
    pub is_last: Vec<bool>,
    pub name: String,
    pub location: Option<PathBuf>,
    pub size: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub modified: Option<String>,
    pub color: Option<String>,
    pub is_directory: bool,
    pub is_open: bool,
    pub is_placeholder: bool,
}

/// Flatten the rows a view would show: every top-level row, and the children
/// of every open directory.
pub fn collect_rows<L: DirectoryLoader>(model: &ListModel<L>) -> Result<Vec<Row>> {
    let mut rows = Vec::new();
    collect_level(model, None, &TreePath::new(), &[], &mut rows)?;
    Ok(rows)
}

fn collect_level<L: DirectoryLoader>(
    model: &ListModel<L>,
    parent: Option<&TreeIter>,
    parent_path: &TreePath,
    ancestors_last: &[bool],
    rows: &mut Vec<Row>,
) -> Result<()> {
    let count = model.iter_n_children(parent)?;
    for index in 0..count {
        let Some(iter) = model.iter_nth_child(parent, index)? else {
            break;
        };
        let path = parent_path.child(index);
        let mut is_last = ancestors_last.to_vec();
        is_last.push(index + 1 == count);

        let file = model.file_for_iter(&iter)?;
        let is_open = model.directory_file(&path).0.is_some();
        let text = |column| -> Result<Option<String>> {
            Ok(model.value(&iter, column)?.as_text().map(str::to_string))
        };

        rows.push(Row {
            path: path.to_string(),
            depth: path.depth() - 1,
            is_last: is_last.clone(),
            name: text(Column::FileName)?.unwrap_or_default(),
            location: file.as_ref().map(|f| f.location.clone()),
            size: text(Column::Size)?,
            kind: text(Column::Type)?,
            modified: text(Column::Modified)?,
            color: text(Column::Color)?,
            is_directory: file.as_ref().is_some_and(|f| f.is_directory()),
            is_open,
            is_placeholder: file.is_none(),
        });

        if is_open {
            collect_level(model, Some(&iter), &path, &is_last, rows)?;
        }
    }
    Ok(())
}

/// Render rows as an indented tree with detail columns.
pub fn render_text(rows: &[Row]) -> String {
    let labels: Vec<String> = rows.iter().map(tree_label).collect();
    let name_width = labels
        .iter()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0)
        .max("Name".len());

    let mut out = format!(
        "{:<name_width$}  {:>10}  {:<20}  {}\n",
        "Name", "Size", "Type", "Modified"
    );
    for (row, label) in rows.iter().zip(&labels) {
        if row.is_placeholder {
            out.push_str(label);
            out.push('\n');
            continue;
        }
        let line = format!(
            "{:<name_width$}  {:>10}  {:<20}  {}",
            label,
            row.size.as_deref().unwrap_or(""),
            row.kind.as_deref().unwrap_or(""),
            row.modified.as_deref().unwrap_or(""),
        );
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

fn tree_label(row: &Row) -> String {
    let mut label = String::new();
    if let Some((own, ancestors)) = row.is_last.split_last() {
        for &last in ancestors {
            label.push_str(if last { "    " } else { "│   " });
        }
        label.push_str(if *own { "└── " } else { "├── " });
    }
    label.push_str(&row.name);
    if row.is_directory {
        label.push('/');
    }
    label
}

/// Render rows as JSON lines, one object per row.
pub fn render_json(rows: &[Row]) -> Result<String> {
    let mut out = String::new();
    for row in rows {
        out.push_str(&serde_json::to_string(row)?);
        out.push('\n');
    }
    Ok(out)
}

/// One-line description of a model notification, for `--watch` output.
pub fn describe_event(event: &ModelEvent) -> String {
    match event {
        ModelEvent::RowInserted { path, .. } => format!("inserted {}", path),
        ModelEvent::RowChanged { path, .. } => format!("changed {}", path),
        ModelEvent::RowDeleted { path } => format!("deleted {}", path),
        ModelEvent::RowsReordered { path, new_order, .. } => {
            let parent = if path.is_empty() {
                "top level".to_string()
            } else {
                path.to_string()
            };
            format!("reordered {} {:?}", parent, new_order)
        }
        ModelEvent::RowHasChildToggled { path, .. } => format!("children toggled {}", path),
        ModelEvent::SubdirectoryUnloaded { directory } => {
            format!("unloaded {}", directory.location().display())
        }
        ModelEvent::SortColumnChanged { settings } => format!(
            "sorted by {} {:?}",
            settings.column.label(),
            settings.order
        ),
    }
}
