use std::path::PathBuf;

use thiserror::Error;

use crate::model::TreePath;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors reported by the list model and its collaborators.
#[derive(Debug, Error)]
pub enum ModelError {
    /// I/O errors from filesystem operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is already present under the resolved parent.
    #[error("file already in tree: {}", location.display())]
    DuplicateFile { location: PathBuf },

    /// A path that does not address any row.
    #[error("no row at path {path}")]
    PathNotFound { path: TreePath },

    /// An iterator that points at a row which no longer exists.
    #[error("iterator does not reference a live row")]
    IterNotFound,

    /// An iterator issued before the model's stamp was bumped.
    #[error("stale iterator: stamp {found} does not match model stamp {expected}")]
    StaleIter { expected: u32, found: u32 },

    /// The operation needs a real file but the row is a placeholder.
    #[error("row is a placeholder")]
    Placeholder,

    /// The subdirectory is already open.
    #[error("subdirectory already loaded: {}", location.display())]
    AlreadyLoaded { location: PathBuf },

    /// The row does not represent a directory.
    #[error("not a directory: {}", location.display())]
    NotADirectory { location: PathBuf },

    /// A row could not be serialized for output.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid path provided by the user.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Configuration could not be applied.
    #[error("Config error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ModelError = io_err.into();
        assert!(matches!(err, ModelError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn duplicate_file_display() {
        let err = ModelError::DuplicateFile {
            location: PathBuf::from("/tmp/a.txt"),
        };
        assert_eq!(err.to_string(), "file already in tree: /tmp/a.txt");
    }

    #[test]
    fn path_not_found_display() {
        let err = ModelError::PathNotFound {
            path: TreePath::from_indices(vec![2, 0]),
        };
        assert_eq!(err.to_string(), "no row at path 2:0");
    }

    #[test]
    fn stale_iter_display() {
        let err = ModelError::StaleIter {
            expected: 7,
            found: 3,
        };
        assert_eq!(
            err.to_string(),
            "stale iterator: stamp 3 does not match model stamp 7"
        );
    }

    #[test]
    fn invalid_path_error_display() {
        let err = ModelError::InvalidPath("/nonexistent".into());
        assert_eq!(err.to_string(), "Invalid path: /nonexistent");
    }
}
