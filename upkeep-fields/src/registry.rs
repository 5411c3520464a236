//! SchemaRegistry: named form/table schemas per entity.
//!
//! Starts from code-supplied defaults and optionally reads YAML overrides from
//! a directory:
//!
//! ```text
//! schemas/
//!   entities/   ← one .yaml per entity binding (endpoints, edit route)
//!   forms/      ← <entity>.yaml with a `fields:` list
//!   tables/     ← <entity>.yaml with a `columns:` list
//! ```
//!
//! An override replaces the default for that entity wholesale.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{FieldsError, Result};
use crate::schema::{FormSchema, TableSchema};

/// Where an entity lives on the backend and how its rows navigate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityDef {
    pub name: String,
    pub endpoint: String,
    /// Second resource shown merged into the same list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_endpoint: Option<String>,
    /// Row navigation pattern, `{id}` is substituted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_route: Option<String>,
}

impl EntityDef {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            secondary_endpoint: None,
            edit_route: None,
        }
    }

    pub fn with_secondary(mut self, endpoint: impl Into<String>) -> Self {
        self.secondary_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_edit_route(mut self, pattern: impl Into<String>) -> Self {
        self.edit_route = Some(pattern.into());
        self
    }
}

/// A collection of default entities and schemas.
///
/// Consumers build this to pass to `SchemaRegistryBuilder::with_defaults()`.
#[derive(Default)]
pub struct SchemaDefaults {
    entities: Vec<EntityDef>,
    forms: Vec<FormSchema>,
    tables: Vec<TableSchema>,
}

impl SchemaDefaults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a default entity binding.
    pub fn entity(mut self, def: EntityDef) -> Self {
        self.entities.push(def);
        self
    }

    /// Add a default form schema.
    pub fn form(mut self, schema: FormSchema) -> Self {
        self.forms.push(schema);
        self
    }

    /// Add a default table schema.
    pub fn table(mut self, schema: TableSchema) -> Self {
        self.tables.push(schema);
        self
    }

    pub fn entities(&self) -> &[EntityDef] {
        &self.entities
    }
}

/// Builder for `SchemaRegistry`. Created by `SchemaRegistry::builder()`.
#[derive(Default)]
pub struct SchemaRegistryBuilder {
    defaults: Option<SchemaDefaults>,
    overrides: Option<PathBuf>,
}

impl SchemaRegistryBuilder {
    /// Seed the registry with code-supplied schemas.
    pub fn with_defaults(mut self, defaults: SchemaDefaults) -> Self {
        self.defaults = Some(defaults);
        self
    }

    /// Read YAML overrides from `dir` on build.
    pub fn with_overrides(mut self, dir: impl Into<PathBuf>) -> Self {
        self.overrides = Some(dir.into());
        self
    }

    /// Build the registry: seed defaults, then apply overrides from disk.
    pub async fn build(self) -> Result<SchemaRegistry> {
        let mut registry = SchemaRegistry {
            entities: HashMap::new(),
            forms: HashMap::new(),
            tables: HashMap::new(),
        };

        if let Some(defaults) = self.defaults {
            for def in defaults.entities {
                registry.entities.insert(def.name.clone(), def);
            }
            for schema in defaults.forms {
                registry.forms.insert(schema.entity().to_string(), schema);
            }
            for schema in defaults.tables {
                registry.tables.insert(schema.entity().to_string(), schema);
            }
        }

        if let Some(dir) = self.overrides {
            if !dir.exists() {
                return Err(FieldsError::DirectoryNotFound { path: dir });
            }
            registry.load_overrides(&dir).await?;
        }

        debug!(
            entities = registry.entities.len(),
            forms = registry.forms.len(),
            tables = registry.tables.len(),
            "schema registry built"
        );

        Ok(registry)
    }
}

/// Registry of entity bindings and their form/table schemas.
#[derive(Debug)]
pub struct SchemaRegistry {
    entities: HashMap<String, EntityDef>,
    forms: HashMap<String, FormSchema>,
    tables: HashMap<String, TableSchema>,
}

impl SchemaRegistry {
    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder::default()
    }

    pub fn entity(&self, name: &str) -> Result<&EntityDef> {
        self.entities
            .get(name)
            .ok_or_else(|| FieldsError::EntityNotFound { name: name.into() })
    }

    pub fn form(&self, entity: &str) -> Result<&FormSchema> {
        self.forms
            .get(entity)
            .ok_or_else(|| FieldsError::EntityNotFound {
                name: entity.into(),
            })
    }

    pub fn table(&self, entity: &str) -> Result<&TableSchema> {
        self.tables
            .get(entity)
            .ok_or_else(|| FieldsError::EntityNotFound {
                name: entity.into(),
            })
    }

    /// Entity names, sorted.
    pub fn entity_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entities.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    async fn load_overrides(&mut self, root: &Path) -> Result<()> {
        for (path, content) in read_yaml_files(&root.join("entities")).await? {
            match serde_yaml_ng::from_str::<EntityDef>(&content) {
                Ok(def) => {
                    debug!(name = %def.name, "entity override loaded");
                    self.entities.insert(def.name.clone(), def);
                }
                Err(e) => warn!(?path, %e, "skipping invalid entity definition"),
            }
        }

        for (path, content) in read_yaml_files(&root.join("forms")).await? {
            let entity = file_stem(&path);
            match FormSchema::from_yaml(&entity, &content) {
                Ok(schema) => {
                    debug!(%entity, "form override loaded");
                    self.forms.insert(entity, schema);
                }
                Err(e) => warn!(?path, %e, "skipping invalid form schema"),
            }
        }

        for (path, content) in read_yaml_files(&root.join("tables")).await? {
            let entity = file_stem(&path);
            match TableSchema::from_yaml(&entity, &content) {
                Ok(schema) => {
                    debug!(%entity, "table override loaded");
                    self.tables.insert(entity, schema);
                }
                Err(e) => warn!(?path, %e, "skipping invalid table schema"),
            }
        }

        Ok(())
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

/// Read every `.yaml` file directly under `dir`. A missing dir yields nothing.
async fn read_yaml_files(dir: &Path) -> Result<Vec<(PathBuf, String)>> {
    let mut files = Vec::new();
    if !dir.exists() {
        return Ok(files);
    }
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
            continue;
        }
        let content = fs::read_to_string(&path).await?;
        files.push((path, content));
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldDescriptor, FieldKind};
    use tempfile::TempDir;

    fn part_defaults() -> SchemaDefaults {
        SchemaDefaults::new()
            .entity(EntityDef::new("part", "/inventory/parts"))
            .form(
                FormSchema::new(
                    "part",
                    vec![FieldDescriptor::new("name", "Name", FieldKind::text())],
                )
                .unwrap(),
            )
    }

    #[tokio::test]
    async fn defaults_are_registered() {
        let registry = SchemaRegistry::builder()
            .with_defaults(part_defaults())
            .build()
            .await
            .unwrap();
        assert_eq!(registry.entity("part").unwrap().endpoint, "/inventory/parts");
        assert_eq!(registry.form("part").unwrap().len(), 1);
        assert!(matches!(
            registry.table("part"),
            Err(FieldsError::EntityNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn overrides_replace_defaults() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("forms")).unwrap();
        std::fs::create_dir_all(temp.path().join("entities")).unwrap();
        std::fs::write(
            temp.path().join("forms/part.yaml"),
            r#"
fields:
  - name: name
    label: Part Name
    type:
      kind: text
    required: true
  - name: notes
    label: Notes
    type:
      kind: textarea
"#,
        )
        .unwrap();
        std::fs::write(
            temp.path().join("entities/part.yaml"),
            "name: part\nendpoint: /v2/parts\nedit_route: /parts/edit/{id}\n",
        )
        .unwrap();
        std::fs::write(temp.path().join("forms/readme.txt"), "ignored").unwrap();

        let registry = SchemaRegistry::builder()
            .with_defaults(part_defaults())
            .with_overrides(temp.path())
            .build()
            .await
            .unwrap();

        let form = registry.form("part").unwrap();
        assert_eq!(form.len(), 2);
        assert!(form.field("name").unwrap().required);
        let entity = registry.entity("part").unwrap();
        assert_eq!(entity.endpoint, "/v2/parts");
        assert_eq!(entity.edit_route.as_deref(), Some("/parts/edit/{id}"));
    }

    #[tokio::test]
    async fn invalid_override_is_skipped() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("forms")).unwrap();
        std::fs::write(temp.path().join("forms/part.yaml"), "fields: []\n").unwrap();

        let registry = SchemaRegistry::builder()
            .with_defaults(part_defaults())
            .with_overrides(temp.path())
            .build()
            .await
            .unwrap();
        assert_eq!(registry.form("part").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_override_dir_is_an_error() {
        let temp = TempDir::new().unwrap();
        let result = SchemaRegistry::builder()
            .with_overrides(temp.path().join("nope"))
            .build()
            .await;
        assert!(matches!(result, Err(FieldsError::DirectoryNotFound { .. })));
    }
}
