//! Ordered, validated schemas.
//!
//! A schema is built once per page and never mutated. Construction rejects
//! duplicate identities so lookups by name/key are unambiguous.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{FieldsError, Result};
use crate::types::{ColumnDescriptor, FieldDescriptor};

/// The editable shape of one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct FormSchema {
    entity: String,
    fields: Vec<FieldDescriptor>,
    index: HashMap<String, usize>,
}

#[derive(Deserialize)]
struct FormSchemaFile {
    fields: Vec<FieldDescriptor>,
}

impl FormSchema {
    pub fn new(entity: impl Into<String>, fields: Vec<FieldDescriptor>) -> Result<Self> {
        let entity = entity.into();
        if fields.is_empty() {
            return Err(FieldsError::EmptySchema { entity });
        }
        let mut index = HashMap::with_capacity(fields.len());
        for (i, field) in fields.iter().enumerate() {
            if index.insert(field.name.clone(), i).is_some() {
                return Err(FieldsError::DuplicateFieldName {
                    name: field.name.clone(),
                });
            }
        }
        Ok(Self {
            entity,
            fields,
            index,
        })
    }

    /// Parse a `fields:` document.
    pub fn from_yaml(entity: impl Into<String>, yaml: &str) -> Result<Self> {
        let file: FormSchemaFile = serde_yaml_ng::from_str(yaml)?;
        Self::new(entity, file.fields)
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter()
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.required)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// The list shape of one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    entity: String,
    columns: Vec<ColumnDescriptor>,
    index: HashMap<String, usize>,
}

#[derive(Deserialize)]
struct TableSchemaFile {
    columns: Vec<ColumnDescriptor>,
}

impl TableSchema {
    pub fn new(entity: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Result<Self> {
        let entity = entity.into();
        if columns.is_empty() {
            return Err(FieldsError::EmptySchema { entity });
        }
        let mut index = HashMap::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            if index.insert(column.key.clone(), i).is_some() {
                return Err(FieldsError::DuplicateColumnKey {
                    key: column.key.clone(),
                });
            }
        }
        Ok(Self {
            entity,
            columns,
            index,
        })
    }

    /// Parse a `columns:` document.
    pub fn from_yaml(entity: impl Into<String>, yaml: &str) -> Result<Self> {
        let file: TableSchemaFile = serde_yaml_ng::from_str(yaml)?;
        Self::new(entity, file.columns)
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn column(&self, key: &str) -> Option<&ColumnDescriptor> {
        self.index.get(key).map(|&i| &self.columns[i])
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn searchable(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| c.searchable)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
