//! Built-in CMMS schemas.
//!
//! Assets (equipment merged with attachments), work orders, parts, purchase
//! orders, and the admin portal's companies.

use serde_json::Value;

use crate::registry::{EntityDef, SchemaDefaults};
use crate::schema::{FormSchema, TableSchema};
use crate::types::{ColumnDescriptor, ColumnKind, FieldDescriptor, FieldKind, OptionSource};

const PRIORITIES: [(&str, &str); 4] = [
    ("low", "Low"),
    ("medium", "Medium"),
    ("high", "High"),
    ("critical", "Critical"),
];

/// All built-in entities with their form and table schemas.
pub fn builtin() -> SchemaDefaults {
    let mut defaults = SchemaDefaults::new();
    for (entity, form, table) in [
        (asset_entity(), asset_form(), asset_table()),
        (work_order_entity(), work_order_form(), work_order_table()),
        (part_entity(), part_form(), part_table()),
        (
            purchase_order_entity(),
            purchase_order_form(),
            purchase_order_table(),
        ),
        (company_entity(), company_form(), company_table()),
    ] {
        defaults = defaults.entity(entity).form(form).table(table);
    }
    defaults
}

fn form(entity: &str, fields: Vec<FieldDescriptor>) -> FormSchema {
    match FormSchema::new(entity, fields) {
        Ok(schema) => schema,
        Err(e) => unreachable!("built-in form schema '{entity}' is invalid: {e}"),
    }
}

fn table(entity: &str, columns: Vec<ColumnDescriptor>) -> TableSchema {
    match TableSchema::new(entity, columns) {
        Ok(schema) => schema,
        Err(e) => unreachable!("built-in table schema '{entity}' is invalid: {e}"),
    }
}

pub fn asset_entity() -> EntityDef {
    EntityDef::new("asset", "/assets/equipments")
        .with_secondary("/assets/attachments")
        .with_edit_route("/assets/edit/{id}")
}

pub fn asset_form() -> FormSchema {
    form(
        "asset",
        vec![
            FieldDescriptor::new("name", "Asset Name", FieldKind::text()).required(),
            FieldDescriptor::new("serial_number", "Serial Number", FieldKind::text()),
            FieldDescriptor::new(
                "category",
                "Category",
                FieldKind::select(OptionSource::remote("/assets/categories")),
            )
            .required(),
            FieldDescriptor::new(
                "location",
                "Location",
                FieldKind::select(OptionSource::remote("/company/locations")),
            ),
            FieldDescriptor::new(
                "status",
                "Status",
                FieldKind::select(OptionSource::fixed([
                    ("operational", "Operational"),
                    ("under_maintenance", "Under Maintenance"),
                    ("decommissioned", "Decommissioned"),
                ])),
            )
            .with_default("operational"),
            FieldDescriptor::new("is_online", "Online", FieldKind::Switch)
                .with_default(Value::Bool(true)),
            FieldDescriptor::new("purchase_date", "Purchase Date", FieldKind::Date),
            FieldDescriptor::new("notes", "Notes", FieldKind::textarea()),
            FieldDescriptor::new("images", "Images", FieldKind::file(true)),
        ],
    )
}

pub fn asset_table() -> TableSchema {
    table(
        "asset",
        vec![
            ColumnDescriptor::new("name", "Name", ColumnKind::Text),
            ColumnDescriptor::new("serial_number", "Serial", ColumnKind::Text),
            ColumnDescriptor::new("category", "Category", ColumnKind::Object),
            ColumnDescriptor::new("location", "Location", ColumnKind::Object),
            ColumnDescriptor::new("is_online", "Status", ColumnKind::Boolean),
            ColumnDescriptor::new("purchase_date", "Purchased", ColumnKind::Date),
        ],
    )
}

pub fn work_order_entity() -> EntityDef {
    EntityDef::new("work_order", "/work_orders/work_orders")
        .with_edit_route("/work-orders/edit/{id}")
}

pub fn work_order_form() -> FormSchema {
    form(
        "work_order",
        vec![
            FieldDescriptor::new("title", "Title", FieldKind::text()).required(),
            FieldDescriptor::new("description", "Description", FieldKind::textarea()),
            FieldDescriptor::new(
                "asset",
                "Asset",
                FieldKind::select(OptionSource::remote("/assets/equipments")),
            )
            .required(),
            FieldDescriptor::new(
                "priority",
                "Priority",
                FieldKind::select(OptionSource::fixed(PRIORITIES)),
            )
            .with_default("medium"),
            FieldDescriptor::new(
                "status",
                "Status",
                FieldKind::select(OptionSource::fixed([
                    ("open", "Open"),
                    ("in_progress", "In Progress"),
                    ("on_hold", "On Hold"),
                    ("completed", "Completed"),
                ])),
            )
            .with_default("open"),
            FieldDescriptor::new(
                "assigned_to",
                "Assigned To",
                FieldKind::select(OptionSource::remote("/company/users")),
            ),
            FieldDescriptor::new("due_date", "Due Date", FieldKind::Date),
            FieldDescriptor::new("attachments", "Attachments", FieldKind::file(true)),
        ],
    )
}

pub fn work_order_table() -> TableSchema {
    table(
        "work_order",
        vec![
            ColumnDescriptor::new("title", "Title", ColumnKind::Text),
            ColumnDescriptor::new("asset", "Asset", ColumnKind::Object),
            ColumnDescriptor::new("priority", "Priority", ColumnKind::Text),
            ColumnDescriptor::new("status", "Status", ColumnKind::Text),
            ColumnDescriptor::new("assigned_to", "Assignee", ColumnKind::Object),
            ColumnDescriptor::new("due_date", "Due", ColumnKind::Date),
        ],
    )
}

pub fn part_entity() -> EntityDef {
    EntityDef::new("part", "/parts/parts").with_edit_route("/parts/edit/{id}")
}

pub fn part_form() -> FormSchema {
    form(
        "part",
        vec![
            FieldDescriptor::new("name", "Part Name", FieldKind::text()).required(),
            FieldDescriptor::new("part_number", "Part Number", FieldKind::text()).required(),
            FieldDescriptor::new("quantity", "Quantity", FieldKind::text()).with_default("0"),
            FieldDescriptor::new("unit_cost", "Unit Cost", FieldKind::text()),
            FieldDescriptor::new(
                "location",
                "Storage Location",
                FieldKind::select(OptionSource::remote("/company/locations")),
            ),
            FieldDescriptor::new("description", "Description", FieldKind::textarea()),
        ],
    )
}

pub fn part_table() -> TableSchema {
    table(
        "part",
        vec![
            ColumnDescriptor::new("name", "Name", ColumnKind::Text),
            ColumnDescriptor::new("part_number", "Part #", ColumnKind::Text),
            ColumnDescriptor::new("quantity", "Qty", ColumnKind::Number).unsearchable(),
            ColumnDescriptor::new("unit_cost", "Unit Cost", ColumnKind::Number).unsearchable(),
            ColumnDescriptor::new("location", "Location", ColumnKind::Object),
        ],
    )
}

pub fn purchase_order_entity() -> EntityDef {
    EntityDef::new("purchase_order", "/purchases/purchase_orders")
        .with_edit_route("/purchase-orders/edit/{id}")
}

pub fn purchase_order_form() -> FormSchema {
    form(
        "purchase_order",
        vec![
            FieldDescriptor::new("po_number", "PO Number", FieldKind::text()).required(),
            FieldDescriptor::new(
                "supplier",
                "Supplier",
                FieldKind::select(OptionSource::remote("/purchases/suppliers")),
            )
            .required(),
            FieldDescriptor::new(
                "status",
                "Status",
                FieldKind::select(OptionSource::fixed([
                    ("draft", "Draft"),
                    ("ordered", "Ordered"),
                    ("received", "Received"),
                    ("cancelled", "Cancelled"),
                ])),
            )
            .with_default("draft"),
            FieldDescriptor::new("order_date", "Order Date", FieldKind::Date),
            FieldDescriptor::new("notes", "Notes", FieldKind::textarea()),
        ],
    )
}

pub fn purchase_order_table() -> TableSchema {
    table(
        "purchase_order",
        vec![
            ColumnDescriptor::new("po_number", "PO #", ColumnKind::Text),
            ColumnDescriptor::new("supplier", "Supplier", ColumnKind::Object),
            ColumnDescriptor::new("status", "Status", ColumnKind::Text),
            ColumnDescriptor::new("order_date", "Ordered", ColumnKind::Date),
            ColumnDescriptor::new("total", "Total", ColumnKind::Number).unsearchable(),
        ],
    )
}

pub fn company_entity() -> EntityDef {
    EntityDef::new("company", "/admin/companies").with_edit_route("/admin/companies/{id}")
}

pub fn company_form() -> FormSchema {
    form(
        "company",
        vec![
            FieldDescriptor::new("name", "Company Name", FieldKind::text()).required(),
            FieldDescriptor::new("subdomain", "Subdomain", FieldKind::text()).required(),
            FieldDescriptor::new("email", "Contact Email", FieldKind::text()),
            FieldDescriptor::new("is_active", "Active", FieldKind::Switch)
                .with_default(Value::Bool(true)),
        ],
    )
}

pub fn company_table() -> TableSchema {
    table(
        "company",
        vec![
            ColumnDescriptor::new("name", "Company", ColumnKind::Text),
            ColumnDescriptor::new("subdomain", "Subdomain", ColumnKind::Text),
            ColumnDescriptor::new("email", "Email", ColumnKind::Text),
            ColumnDescriptor::new("is_active", "Status", ColumnKind::Boolean),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SchemaRegistry;

    #[tokio::test]
    async fn every_builtin_entity_has_both_schemas() {
        let registry = SchemaRegistry::builder()
            .with_defaults(builtin())
            .build()
            .await
            .unwrap();
        let names = registry.entity_names();
        assert_eq!(
            names,
            ["asset", "company", "part", "purchase_order", "work_order"]
        );
        for name in names {
            assert!(registry.form(name).is_ok(), "missing form for {name}");
            assert!(registry.table(name).is_ok(), "missing table for {name}");
        }
    }

    #[test]
    fn asset_lists_merge_attachments() {
        let asset = asset_entity();
        assert_eq!(asset.endpoint, "/assets/equipments");
        assert_eq!(
            asset.secondary_endpoint.as_deref(),
            Some("/assets/attachments")
        );
        assert_eq!(asset.edit_route.as_deref(), Some("/assets/edit/{id}"));
    }
}
