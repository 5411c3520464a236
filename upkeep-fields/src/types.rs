//! Core field and column descriptor types.
//!
//! Field descriptors describe one editable attribute of an entity; column
//! descriptors describe one displayable attribute of a list row. Both
//! deserialize from YAML, except custom cell renderers which are code.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::Record;

/// A single option in a select field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SelectOption {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: Some(label.into()),
        }
    }

    /// Label shown to the user, falling back to the raw value.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.value)
    }
}

/// Where a select field gets its options from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "from", rename_all = "kebab-case")]
pub enum OptionSource {
    /// Options fixed in the schema.
    Static { options: Vec<SelectOption> },
    /// Options listed from a backend endpoint when the form mounts.
    Remote {
        endpoint: String,
        #[serde(default = "default_value_key")]
        value_key: String,
        #[serde(default = "default_label_key")]
        label_key: String,
    },
}

fn default_value_key() -> String {
    "id".to_string()
}

fn default_label_key() -> String {
    "name".to_string()
}

impl OptionSource {
    /// Remote source listing `endpoint` with the conventional `id`/`name` keys.
    pub fn remote(endpoint: impl Into<String>) -> Self {
        OptionSource::Remote {
            endpoint: endpoint.into(),
            value_key: default_value_key(),
            label_key: default_label_key(),
        }
    }

    /// Static source from `(value, label)` pairs.
    pub fn fixed<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        OptionSource::Static {
            options: pairs
                .into_iter()
                .map(|(value, label)| SelectOption::new(value, label))
                .collect(),
        }
    }
}

/// The UI component kind of a field. Determines its editor and value shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum FieldKind {
    Text {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        placeholder: Option<String>,
    },
    Textarea {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rows: Option<u16>,
    },
    Select {
        source: OptionSource,
    },
    Switch,
    Date,
    /// Media upload; the value is the list of committed media ids.
    File {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        accept: Option<String>,
        #[serde(default)]
        multiple: bool,
    },
}

impl FieldKind {
    pub fn text() -> Self {
        FieldKind::Text { placeholder: None }
    }

    pub fn textarea() -> Self {
        FieldKind::Textarea { rows: None }
    }

    pub fn select(source: OptionSource) -> Self {
        FieldKind::Select { source }
    }

    pub fn file(multiple: bool) -> Self {
        FieldKind::File {
            accept: None,
            multiple,
        }
    }

    /// Value used when neither the user, the record nor the schema supplies one.
    pub fn empty_value(&self) -> Value {
        match self {
            FieldKind::Text { .. }
            | FieldKind::Textarea { .. }
            | FieldKind::Select { .. }
            | FieldKind::Date => Value::String(String::new()),
            FieldKind::Switch => Value::Bool(false),
            FieldKind::File { .. } => Value::Array(Vec::new()),
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, FieldKind::File { .. })
    }
}

/// A field descriptor: the complete schema for one editable attribute.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind,
            required: false,
            disabled: false,
            hidden: false,
            default: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// Renders a cell from its raw value and the whole row.
#[derive(Clone)]
pub struct CellRenderer(Arc<dyn Fn(&Value, &Record) -> String + Send + Sync>);

impl CellRenderer {
    pub fn new(f: impl Fn(&Value, &Record) -> String + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn render(&self, value: &Value, row: &Record) -> String {
        (self.0)(value, row)
    }
}

impl fmt::Debug for CellRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CellRenderer(..)")
    }
}

impl PartialEq for CellRenderer {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// How a column value is interpreted for display and sorting.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum ColumnKind {
    #[default]
    Text,
    Number,
    Boolean,
    Date,
    /// Nested record; displays its `name`, falling back to `id`.
    Object,
    /// Code-supplied renderer. Never loaded from YAML.
    #[serde(skip)]
    Custom(CellRenderer),
}

/// A column descriptor: one displayable attribute of a list row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnDescriptor {
    /// Dotted path into the row record (`location.name`).
    pub key: String,
    pub header: String,
    #[serde(rename = "type", default)]
    pub kind: ColumnKind,
    #[serde(default = "default_true")]
    pub sortable: bool,
    #[serde(default = "default_true")]
    pub searchable: bool,
}

fn default_true() -> bool {
    true
}

impl ColumnDescriptor {
    pub fn new(key: impl Into<String>, header: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            key: key.into(),
            header: header.into(),
            kind,
            sortable: true,
            searchable: true,
        }
    }

    pub fn unsortable(mut self) -> Self {
        self.sortable = false;
        self
    }

    pub fn unsearchable(mut self) -> Self {
        self.searchable = false;
        self
    }
}
