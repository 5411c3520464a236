//! Error types for table operations

use thiserror::Error;

/// Result type for table operations
pub type Result<T> = std::result::Result<T, TableError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    /// The schema has no column with this key
    #[error("unknown column: {key}")]
    UnknownColumn { key: String },

    /// Sorting requested on a column marked unsortable
    #[error("column is not sortable: {key}")]
    NotSortable { key: String },

    /// No bulk action registered under this label
    #[error("unknown bulk action: {label}")]
    UnknownAction { label: String },

    /// Confirmation requested with no bulk action awaiting it
    #[error("no bulk action awaiting confirmation")]
    NothingToConfirm,
}
