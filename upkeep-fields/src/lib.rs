//! Field and column schema model
//!
//! `upkeep-fields` is a schema-only crate describing the editable shape of an
//! entity (a [`FormSchema`] of [`FieldDescriptor`]s) and its list shape (a
//! [`TableSchema`] of [`ColumnDescriptor`]s). It knows nothing about HTTP or
//! rendering; the form and table crates interpret these descriptors.
//!
//! # Architecture
//!
//! - **Closed kinds**: [`FieldKind`] and [`ColumnKind`] are sum types; each
//!   variant carries only the properties that kind needs
//! - **Immutable schemas**: names/keys are validated unique at construction
//!   and schemas never change afterwards
//! - **YAML overrides**: a [`SchemaRegistry`] starts from built-in CMMS
//!   schemas and lets `forms/*.yaml` / `tables/*.yaml` replace them

pub mod defaults;
pub mod error;
pub mod record;
pub mod registry;
pub mod schema;
pub mod types;

pub use error::{FieldsError, Result};
pub use record::{is_blank, lookup_path, record_id, Record};
pub use registry::{EntityDef, SchemaDefaults, SchemaRegistry, SchemaRegistryBuilder};
pub use schema::{FormSchema, TableSchema};
pub use types::{
    CellRenderer, ColumnDescriptor, ColumnKind, FieldDescriptor, FieldKind, OptionSource,
    SelectOption,
};
