//! Error types for form operations

use thiserror::Error;
use upkeep_transport::ApiError;

/// Result type for form operations
pub type Result<T> = std::result::Result<T, FormError>;

#[derive(Debug, Error)]
pub enum FormError {
    /// The schema has no field with this name
    #[error("unknown field: {name}")]
    UnknownField { name: String },

    /// The field is disabled and cannot be edited
    #[error("field is disabled: {name}")]
    Disabled { name: String },

    /// A media operation on a field that is not a file field
    #[error("not a file field: {name}")]
    NotAFileField { name: String },

    /// File fields change through staging and uploads, not direct values
    #[error("file field '{name}' is edited through uploads")]
    FileField { name: String },

    /// No committed media with this id on the field
    #[error("media {id} not attached to {name}")]
    MediaNotFound { name: String, id: String },

    /// The form was unmounted while the operation was in flight
    #[error("form was unmounted")]
    Unmounted,

    /// Transport failure
    #[error(transparent)]
    Api(#[from] ApiError),
}
