//! An in-memory hierarchical listing of files for file-manager views.
//!
//! [`model::ListModel`] holds the rows, keeps every level sorted and reports
//! each structural change through [`model::ModelEvent`]. Directory contents
//! arrive incrementally from a [`fs::loader::DirectoryLoader`];
//! [`browser::Browser`] wires the model to real scans and a filesystem
//! watcher.

pub mod browser;
pub mod config;
pub mod error;
pub mod event;
pub mod fs;
pub mod model;
pub mod render;
