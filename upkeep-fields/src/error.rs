//! Error types for the schema model

use std::path::PathBuf;
use thiserror::Error;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, FieldsError>;

/// Errors that can occur while building or loading schemas
#[derive(Debug, Error)]
pub enum FieldsError {
    /// Two field descriptors share a name
    #[error("duplicate field name: {name}")]
    DuplicateFieldName { name: String },

    /// Two column descriptors share a key
    #[error("duplicate column key: {key}")]
    DuplicateColumnKey { key: String },

    /// A schema was built without any entries
    #[error("schema for '{entity}' has no entries")]
    EmptySchema { entity: String },

    /// No schema registered for the entity
    #[error("entity not found: {name}")]
    EntityNotFound { name: String },

    /// Schema override directory is missing
    #[error("schema directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}
