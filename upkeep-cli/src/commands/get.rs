//! `upkeep get <entity> <id>`

use anyhow::{bail, Result};
use comfy_table::{presets::UTF8_FULL, Table};
use upkeep_fields::{EntityDef, FormSchema};
use upkeep_forms::{FieldView, Form, FormTarget};
use upkeep_tables::stringify;
use upkeep_transport::Backend;

use crate::host::Host;

/// Display text for a field: option labels for selects, file names for uploads.
fn display(field: &FieldView) -> String {
    if field.kind.is_file() {
        return field
            .media
            .iter()
            .map(|m| if m.file.is_empty() { m.id.as_str() } else { m.file.as_str() })
            .collect::<Vec<_>>()
            .join(", ");
    }
    let raw = stringify(&field.value);
    field
        .options
        .iter()
        .find(|option| option.value == raw)
        .map(|option| option.display_label().to_string())
        .unwrap_or(raw)
}

/// Mount an update form for `id` and draw its fields.
pub async fn render(
    entity: &EntityDef,
    schema: FormSchema,
    id: &str,
    backend: &dyn Backend,
) -> Result<String> {
    let form = Form::new(schema, FormTarget::update(&entity.endpoint, id));
    form.mount(backend).await;
    let view = form.render();
    if let Some(banner) = &view.banner {
        bail!("{} {id}: {banner}", entity.name);
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Field", "Value"]);
    for field in &view.fields {
        let label = if field.required {
            format!("{} *", field.label)
        } else {
            field.label.clone()
        };
        table.add_row(vec![label, display(field)]);
    }
    Ok(table.to_string())
}

pub async fn run(host: &Host, entity: &str, id: &str, hostname: Option<&str>) -> Result<()> {
    let def = host.registry.entity(entity)?;
    let schema = host.registry.form(entity)?.clone();
    let path = def
        .edit_route
        .as_deref()
        .map(|pattern| pattern.replace("{id}", id))
        .unwrap_or_else(|| format!("/{entity}/{id}"));
    let client = host.client(hostname, &path)?;
    println!("{}", render(def, schema, id, &client).await?);
    Ok(())
}
