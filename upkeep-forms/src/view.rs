//! Render output for a form.

use serde::Serialize;
use serde_json::Value;
use upkeep_fields::{FieldKind, SelectOption};
use upkeep_transport::MediaRecord;

use crate::form::FormMode;

/// Snapshot of a form for a host to draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormView {
    pub mode: FormMode,
    pub fields: Vec<FieldView>,
    pub banner: Option<String>,
    pub loading: bool,
    /// The submit control is disabled while true.
    pub submitting: bool,
}

impl FormView {
    pub fn field(&self, name: &str) -> Option<&FieldView> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// One visible field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldView {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    pub value: Value,
    pub required: bool,
    pub disabled: bool,
    pub errors: Vec<String>,
    /// Select options, empty for other kinds.
    pub options: Vec<SelectOption>,
    /// Committed uploads for file fields.
    pub media: Vec<MediaRecord>,
    /// Names of files picked but not yet uploaded.
    pub staged: Vec<String>,
}
