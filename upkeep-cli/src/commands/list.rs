//! `upkeep list <entity>`

use anyhow::{bail, Result};
use comfy_table::{presets::UTF8_FULL, Table as TextTable};
use upkeep_fields::{EntityDef, TableSchema};
use upkeep_tables::{Table, TableSource, TableStatus};
use upkeep_transport::Backend;

use crate::cli::ListArgs;
use crate::host::Host;

/// Build the table for `entity`, load one page and draw it.
pub async fn render(
    entity: &EntityDef,
    schema: TableSchema,
    args: &ListArgs,
    backend: &dyn Backend,
) -> Result<String> {
    let source = match &entity.secondary_endpoint {
        Some(secondary) => TableSource::merged(&entity.endpoint, secondary),
        None => TableSource::remote(&entity.endpoint),
    };
    let table = Table::new(schema, source).with_page_size(args.page_size);
    if let Some(term) = &args.search {
        table.set_search(term);
    }
    table.set_page(args.page);
    if let Some(key) = &args.sort {
        table.sort_by(key, args.desc)?;
    }

    table.load(backend).await;
    let view = table.render();
    match &view.status {
        TableStatus::Error(message) => bail!("failed to load {}: {message}", entity.name),
        TableStatus::Empty(message) => return Ok(message.clone()),
        TableStatus::Loading | TableStatus::Ready => {}
    }

    let mut text = TextTable::new();
    text.load_preset(UTF8_FULL);
    text.set_header(view.columns.iter().map(|c| c.header.as_str()));
    for row in &view.rows {
        text.add_row(row.cells.iter().map(String::as_str));
    }

    let page = &view.pagination;
    Ok(format!(
        "{text}\n\nPage {} of {} ({} record(s))",
        page.page,
        page.total_pages().max(1),
        page.total_items
    ))
}

pub async fn run(host: &Host, args: &ListArgs) -> Result<()> {
    let entity = host.registry.entity(&args.entity)?;
    let schema = host.registry.table(&args.entity)?.clone();
    let client = host.client(args.host.as_deref(), &format!("/{}", entity.name))?;
    println!("{}", render(entity, schema, args, &client).await?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use upkeep_fields::defaults;
    use upkeep_transport::{ApiError, MemoryBackend, Method};

    fn args() -> ListArgs {
        ListArgs {
            entity: "asset".into(),
            host: None,
            search: None,
            page: 1,
            page_size: 10,
            sort: None,
            desc: false,
        }
    }

    #[tokio::test]
    async fn renders_rows_from_both_sources() {
        let backend = MemoryBackend::new();
        backend
            .respond_ok(
                Method::GET,
                "/assets/equipments",
                json!([{"id": 1, "name": "Chiller", "is_online": true}]),
            )
            .respond_ok(
                Method::GET,
                "/assets/attachments",
                json!([{"id": 2, "name": "Belt", "is_online": false}]),
            );

        let out = render(
            &defaults::asset_entity(),
            defaults::asset_table(),
            &args(),
            &backend,
        )
        .await
        .unwrap();

        assert!(out.contains("Chiller"));
        assert!(out.contains("Online"));
        assert!(out.contains("Belt"));
        assert!(out.contains("Offline"));
        assert!(out.ends_with("Page 1 of 1 (2 record(s))"));
    }

    #[tokio::test]
    async fn empty_list_prints_message() {
        let backend = MemoryBackend::new();
        backend
            .respond_ok(Method::GET, "/assets/equipments", json!([]))
            .respond_ok(Method::GET, "/assets/attachments", json!([]));

        let out = render(
            &defaults::asset_entity(),
            defaults::asset_table(),
            &args(),
            &backend,
        )
        .await
        .unwrap();
        assert_eq!(out, "No records found.");
    }

    #[tokio::test]
    async fn load_failure_is_an_error() {
        let backend = MemoryBackend::new();
        backend.respond(
            Method::GET,
            "/assets/equipments",
            Err(ApiError::Status { status: 500 }),
        );

        let err = render(
            &defaults::asset_entity(),
            defaults::asset_table(),
            &args(),
            &backend,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().starts_with("failed to load asset"));
    }

    #[tokio::test]
    async fn unknown_sort_column_is_rejected() {
        let backend = MemoryBackend::new();
        let mut args = args();
        args.sort = Some("nope".into());
        let result = render(
            &defaults::asset_entity(),
            defaults::asset_table(),
            &args,
            &backend,
        )
        .await;
        assert!(result.is_err());
        assert!(backend.calls().is_empty());
    }
}
