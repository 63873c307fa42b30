use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};

use crate::error::Result;

/// Type of filesystem item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Directory,
    Symlink,
    Other,
}

/// Immutable snapshot of one filesystem item.
///
/// Identity is the `location`: two snapshots of the same location are the
/// same file as far as the model is concerned.
#[derive(Debug, Clone, PartialEq)]
pub struct FileInfo {
    pub location: PathBuf,
    pub name: String,
    pub kind: FileKind,
    /// Directory for expansion purposes (symlinks to directories count).
    pub is_directory: bool,
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub content_type: String,
    pub is_hidden: bool,
    /// Tag color, filled in by whoever resolves tags.
    pub color: Option<String>,
    pub icon_name: String,
    pub formatted_size: String,
    pub formatted_type: String,
    pub formatted_modified: String,
    /// Case-folded name used for ordering.
    pub(crate) sort_key: String,
}

impl FileInfo {
    /// Read a snapshot from the filesystem.
    pub fn from_path(path: &Path) -> Result<Self> {
        let metadata = fs::symlink_metadata(path)?;
        let kind = if metadata.is_symlink() {
            FileKind::Symlink
        } else if metadata.is_dir() {
            FileKind::Directory
        } else if metadata.is_file() {
            FileKind::File
        } else {
            FileKind::Other
        };
        let is_directory = match kind {
            FileKind::Directory => true,
            FileKind::Symlink => fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false),
            _ => false,
        };

        let mut info = Self::new(path, kind, metadata.len(), metadata.modified().ok());
        info.is_directory = is_directory;
        info.refresh_derived();
        Ok(info)
    }

    /// Build a snapshot without touching the filesystem.
    pub fn new(location: &Path, kind: FileKind, size: u64, modified: Option<SystemTime>) -> Self {
        let name = location
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| location.to_string_lossy().to_string());
        let mut info = Self {
            sort_key: name.to_lowercase(),
            is_hidden: name.starts_with('.'),
            location: location.to_path_buf(),
            name,
            kind,
            is_directory: kind == FileKind::Directory,
            size,
            modified,
            content_type: String::new(),
            color: None,
            icon_name: String::new(),
            formatted_size: String::new(),
            formatted_type: String::new(),
            formatted_modified: String::new(),
        };
        info.refresh_derived();
        info
    }

    /// Attach a tag color.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn is_directory(&self) -> bool {
        self.is_directory
    }

    fn refresh_derived(&mut self) {
        self.content_type = if self.is_directory {
            "inode/directory".to_string()
        } else {
            mime_guess::from_path(&self.location)
                .first_raw()
                .unwrap_or("application/octet-stream")
                .to_string()
        };
        self.icon_name = icon_name_for(&self.content_type);
        self.formatted_size = if self.is_directory {
            "--".to_string()
        } else {
            format_size(self.size)
        };
        self.formatted_type = describe_content_type(&self.content_type, self.kind);
        self.formatted_modified = format_modified(self.modified);
    }
}

/// Format bytes into human-readable size string.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;
    const TB: u64 = 1024 * GB;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format a modification time in local time.
pub fn format_modified(modified: Option<SystemTime>) -> String {
    match modified {
        Some(time) => {
            let local: DateTime<Local> = time.into();
            local.format("%Y-%m-%d %H:%M").to_string()
        }
        None => "Unknown".to_string(),
    }
}

fn describe_content_type(content_type: &str, kind: FileKind) -> String {
    if kind == FileKind::Symlink {
        return "Link".to_string();
    }
    match content_type {
        "inode/directory" => "Folder".to_string(),
        "application/octet-stream" => "Binary".to_string(),
        other => {
            let (top, sub) = other.split_once('/').unwrap_or((other, ""));
            match top {
                "text" => format!("Text ({})", sub),
                "image" => format!("Image ({})", sub),
                "audio" => format!("Audio ({})", sub),
                "video" => format!("Video ({})", sub),
                _ => sub.to_string(),
            }
        }
    }
}

fn icon_name_for(content_type: &str) -> String {
    if content_type == "inode/directory" {
        return "folder".to_string();
    }
    match content_type.split('/').next() {
        Some("text") => "text-x-generic",
        Some("image") => "image-x-generic",
        Some("audio") => "audio-x-generic",
        Some("video") => "video-x-generic",
        _ => "application-x-executable",
    }
    .to_string()
}
