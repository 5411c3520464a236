//! Table state machine.
//!
//! A [`Table`] owns the loaded rows plus all view state (search, filters,
//! sort, paging, column layout, selection). Paging, search and sort run on
//! the server when the last response was server-paged and locally otherwise;
//! setters return `true` when the host has to call [`Table::load`] again.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::{debug, warn};
use upkeep_fields::{lookup_path, record_id, ColumnDescriptor, ColumnKind, Record, TableSchema};
use upkeep_transport::{
    ApiError, Backend, ListQuery, PaginatedResult, Pagination, DEFAULT_PAGE_SIZE,
};

use crate::actions::{navigation_target, BulkAction, BulkRequest, RowAction, RowClick};
use crate::cell::{numeric, render_cell};
use crate::error::{Result, TableError};
use crate::view::{ColumnView, RowView, TableStatus, TableView};

/// Row key recording which endpoint a merged row came from.
pub const DATA_SOURCE_KEY: &str = "_dataSource";
pub const PRIMARY_SOURCE: &str = "primary";
pub const SECONDARY_SOURCE: &str = "secondary";
pub const DEFAULT_EMPTY_MESSAGE: &str = "No records found.";

/// Where rows come from.
#[derive(Debug, Clone)]
pub enum TableSource {
    /// List endpoint, optionally merged with a second one.
    Remote {
        endpoint: String,
        secondary: Option<String>,
    },
    /// Caller-supplied rows; `load` never touches the network.
    Local(Vec<Record>),
}

impl TableSource {
    pub fn remote(endpoint: impl Into<String>) -> Self {
        Self::Remote {
            endpoint: endpoint.into(),
            secondary: None,
        }
    }

    pub fn merged(endpoint: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self::Remote {
            endpoint: endpoint.into(),
            secondary: Some(secondary.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum LoadState {
    Idle,
    Loaded,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SortState {
    key: String,
    descending: bool,
}

#[derive(Debug)]
struct TableState {
    rows: Vec<Record>,
    /// Server pagination of `rows`; `None` means rows are the full dataset.
    server_page: Option<Pagination>,
    load: LoadState,
    in_flight: usize,
    unmounted: bool,
    page: u32,
    page_size: u32,
    search: String,
    filters: BTreeMap<String, String>,
    sort: Option<SortState>,
    order: Vec<String>,
    widths: HashMap<String, u16>,
    hidden: HashSet<String>,
    selection: BTreeSet<String>,
    confirming: Option<usize>,
}

pub struct Table {
    schema: TableSchema,
    source: TableSource,
    row_action: Option<RowAction>,
    bulk_actions: Vec<BulkAction>,
    empty_message: String,
    state: Mutex<TableState>,
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("entity", &self.schema.entity())
            .field("source", &self.source)
            .field("row_action", &self.row_action)
            .finish_non_exhaustive()
    }
}

impl Table {
    pub fn new(schema: TableSchema, source: TableSource) -> Self {
        let (rows, load) = match &source {
            TableSource::Local(rows) => (rows.clone(), LoadState::Loaded),
            TableSource::Remote { .. } => (Vec::new(), LoadState::Idle),
        };
        let order = schema.columns().iter().map(|c| c.key.clone()).collect();
        Self {
            schema,
            source,
            row_action: None,
            bulk_actions: Vec::new(),
            empty_message: DEFAULT_EMPTY_MESSAGE.to_string(),
            state: Mutex::new(TableState {
                rows,
                server_page: None,
                load,
                in_flight: 0,
                unmounted: false,
                page: 1,
                page_size: DEFAULT_PAGE_SIZE,
                search: String::new(),
                filters: BTreeMap::new(),
                sort: None,
                order,
                widths: HashMap::new(),
                hidden: HashSet::new(),
                selection: BTreeSet::new(),
                confirming: None,
            }),
        }
    }

    pub fn with_row_action(mut self, action: RowAction) -> Self {
        self.row_action = Some(action);
        self
    }

    pub fn with_bulk_action(mut self, action: BulkAction) -> Self {
        self.bulk_actions.push(action);
        self
    }

    pub fn with_empty_message(mut self, message: impl Into<String>) -> Self {
        self.empty_message = message.into();
        self
    }

    pub fn with_page_size(self, page_size: u32) -> Self {
        self.lock().page_size = page_size.max(1);
        self
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    fn lock(&self) -> MutexGuard<'_, TableState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetch rows for the current query.
    ///
    /// With a secondary endpoint both lists are fetched concurrently and
    /// concatenated primary first, each row tagged with [`DATA_SOURCE_KEY`].
    /// A failure of either fails the whole load.
    /// Overlapping loads are not cancelled; whichever response resolves last
    /// is what the table shows. After [`Table::unmount`] this does nothing.
    pub async fn load(&self, backend: &dyn Backend) {
        let (endpoint, secondary) = match &self.source {
            TableSource::Local(_) => return,
            TableSource::Remote {
                endpoint,
                secondary,
            } => (endpoint.as_str(), secondary.as_deref()),
        };

        let query = {
            let mut state = self.lock();
            if state.unmounted {
                return;
            }
            state.in_flight += 1;
            query_for(&state)
        };

        let result = match secondary {
            None => backend.fetch_list(endpoint, &query).await,
            Some(secondary) => {
                let (primary, extra) = tokio::join!(
                    backend.fetch_list(endpoint, &query),
                    backend.fetch_list(secondary, &query)
                );
                merge(primary, extra, &query)
            }
        };

        let mut state = self.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        if state.unmounted {
            debug!(%endpoint, "table unmounted before rows arrived");
            return;
        }
        match result {
            Ok(result) => {
                debug!(
                    %endpoint,
                    rows = result.data.len(),
                    server_paged = result.is_server_paged(),
                    "rows loaded"
                );
                state.server_page = result.is_server_paged().then(|| result.pagination.clone());
                state.rows = result.data;
                state.load = LoadState::Loaded;
                let known: BTreeSet<String> = state.rows.iter().filter_map(record_id).collect();
                if state.server_page.is_none() {
                    state.selection.retain(|id| known.contains(id));
                }
            }
            Err(e) => {
                warn!(%endpoint, error = %e, "failed to load rows");
                state.load = LoadState::Failed(e.user_message());
            }
        }
    }

    /// Drop all further responses.
    pub fn unmount(&self) {
        let mut state = self.lock();
        state.unmounted = true;
        state.confirming = None;
        debug!(entity = %self.schema.entity(), "table unmounted");
    }

    /// Every loaded row, unfiltered.
    pub fn rows(&self) -> Vec<Record> {
        self.lock().rows.clone()
    }

    pub fn status(&self) -> TableStatus {
        let state = self.lock();
        let visible = self.visible(&state).0.len();
        self.status_of(&state, visible)
    }

    fn status_of(&self, state: &TableState, visible: usize) -> TableStatus {
        if state.in_flight > 0 || state.load == LoadState::Idle {
            return TableStatus::Loading;
        }
        match &state.load {
            LoadState::Failed(message) => TableStatus::Error(message.clone()),
            _ if visible == 0 => TableStatus::Empty(self.empty_message.clone()),
            _ => TableStatus::Ready,
        }
    }

    fn server_paged(state: &TableState) -> bool {
        state.server_page.is_some()
    }

    /// Set the free-text search; resets to the first page.
    pub fn set_search(&self, term: &str) -> bool {
        let mut state = self.lock();
        state.search = term.trim().to_string();
        state.page = 1;
        Self::server_paged(&state)
    }

    pub fn set_page(&self, page: u32) -> bool {
        let mut state = self.lock();
        state.page = page.max(1);
        Self::server_paged(&state)
    }

    pub fn set_page_size(&self, page_size: u32) -> bool {
        let mut state = self.lock();
        state.page_size = page_size.max(1);
        state.page = 1;
        Self::server_paged(&state)
    }

    pub fn sort_by(&self, key: &str, descending: bool) -> Result<bool> {
        let column = self.column(key)?;
        if !column.sortable {
            return Err(TableError::NotSortable { key: key.into() });
        }
        let mut state = self.lock();
        state.sort = Some(SortState {
            key: key.into(),
            descending,
        });
        Ok(Self::server_paged(&state))
    }

    pub fn clear_sort(&self) -> bool {
        let mut state = self.lock();
        state.sort = None;
        Self::server_paged(&state)
    }

    /// Per-column substring filter; an empty string removes it.
    pub fn set_filter(&self, key: &str, text: &str) -> Result<()> {
        self.column(key)?;
        let mut state = self.lock();
        let text = text.trim();
        if text.is_empty() {
            state.filters.remove(key);
        } else {
            state.filters.insert(key.into(), text.to_string());
        }
        state.page = 1;
        Ok(())
    }

    pub fn set_width(&self, key: &str, width: u16) -> Result<()> {
        self.column(key)?;
        self.lock().widths.insert(key.into(), width);
        Ok(())
    }

    /// Move a column to a display position, clamped to the last slot.
    pub fn move_column(&self, key: &str, position: usize) -> Result<()> {
        self.column(key)?;
        let mut state = self.lock();
        state.order.retain(|k| k != key);
        let position = position.min(state.order.len());
        state.order.insert(position, key.into());
        Ok(())
    }

    pub fn hide_column(&self, key: &str) -> Result<()> {
        self.column(key)?;
        self.lock().hidden.insert(key.into());
        Ok(())
    }

    pub fn show_column(&self, key: &str) -> Result<()> {
        self.column(key)?;
        self.lock().hidden.remove(key);
        Ok(())
    }

    fn column(&self, key: &str) -> Result<&ColumnDescriptor> {
        self.schema
            .column(key)
            .ok_or_else(|| TableError::UnknownColumn { key: key.into() })
    }

    pub fn is_clickable(&self) -> bool {
        self.row_action.is_some()
    }

    /// Activate a row on the current page.
    ///
    /// `None` when rows are not clickable, the index is off the page, or a
    /// navigation pattern needs an id the row lacks.
    pub fn click_row(&self, index: usize) -> Option<RowClick> {
        let action = self.row_action.as_ref()?;
        let row = {
            let state = self.lock();
            self.visible(&state).0.get(index).map(|row| (*row).clone())?
        };
        match action {
            RowAction::Handler(handler) => {
                handler(&row);
                Some(RowClick::Handled)
            }
            RowAction::Navigate { pattern } => {
                let target = navigation_target(pattern, &row);
                if target.is_none() {
                    warn!(%pattern, "clicked row has no id");
                }
                target.map(RowClick::Navigate)
            }
        }
    }

    /// Toggle one id; returns whether it is now selected.
    pub fn toggle_row(&self, id: &str) -> bool {
        let mut state = self.lock();
        if state.selection.remove(id) {
            false
        } else {
            state.selection.insert(id.to_string());
            true
        }
    }

    /// Select every row on the current page.
    pub fn select_page(&self) {
        let mut state = self.lock();
        let ids: Vec<String> = self
            .visible(&state)
            .0
            .iter()
            .filter_map(|row| record_id(row))
            .collect();
        state.selection.extend(ids);
    }

    pub fn clear_selection(&self) {
        let mut state = self.lock();
        state.selection.clear();
        state.confirming = None;
    }

    pub fn selection(&self) -> Vec<String> {
        self.lock().selection.iter().cloned().collect()
    }

    /// Start a bulk action over the selection.
    pub fn request_bulk(&self, label: &str) -> Result<BulkRequest> {
        let index = self
            .bulk_actions
            .iter()
            .position(|a| a.label == label)
            .ok_or_else(|| TableError::UnknownAction {
                label: label.into(),
            })?;
        let action = &self.bulk_actions[index];
        let ids = {
            let mut state = self.lock();
            if state.selection.is_empty() {
                return Ok(BulkRequest::NothingSelected);
            }
            if let Some(prompt) = &action.confirm {
                state.confirming = Some(index);
                return Ok(BulkRequest::NeedsConfirmation {
                    prompt: prompt.clone(),
                });
            }
            state.selection.iter().cloned().collect::<Vec<_>>()
        };
        Ok(self.fire(action, &ids))
    }

    /// Run the bulk action awaiting confirmation.
    pub fn confirm_bulk(&self) -> Result<BulkRequest> {
        let (index, ids) = {
            let mut state = self.lock();
            let index = state.confirming.take().ok_or(TableError::NothingToConfirm)?;
            (index, state.selection.iter().cloned().collect::<Vec<_>>())
        };
        match self.bulk_actions.get(index) {
            Some(action) if !ids.is_empty() => Ok(self.fire(action, &ids)),
            Some(_) => Ok(BulkRequest::NothingSelected),
            None => Err(TableError::NothingToConfirm),
        }
    }

    pub fn cancel_bulk(&self) {
        self.lock().confirming = None;
    }

    fn fire(&self, action: &BulkAction, ids: &[String]) -> BulkRequest {
        debug!(action = %action.label, count = ids.len(), "bulk action");
        action.run(ids);
        BulkRequest::Fired { count: ids.len() }
    }

    /// Snapshot for drawing.
    pub fn render(&self) -> TableView {
        let state = self.lock();
        let (rows, pagination) = self.visible(&state);
        let columns: Vec<&ColumnDescriptor> = state
            .order
            .iter()
            .filter(|key| !state.hidden.contains(*key))
            .filter_map(|key| self.schema.column(key))
            .collect();

        let rows: Vec<RowView> = rows
            .iter()
            .map(|row| {
                let id = record_id(row);
                RowView {
                    selected: id.as_ref().is_some_and(|id| state.selection.contains(id)),
                    id,
                    cells: columns.iter().map(|c| render_cell(c, row)).collect(),
                    source: row
                        .get(DATA_SOURCE_KEY)
                        .and_then(Value::as_str)
                        .map(str::to_string),
                }
            })
            .collect();

        TableView {
            status: self.status_of(&state, rows.len()),
            columns: columns
                .iter()
                .map(|c| ColumnView {
                    key: c.key.clone(),
                    header: c.header.clone(),
                    width: state.widths.get(&c.key).copied(),
                    sortable: c.sortable,
                    sorted: state
                        .sort
                        .as_ref()
                        .filter(|s| s.key == c.key)
                        .map(|s| s.descending),
                    filter: state.filters.get(&c.key).cloned(),
                })
                .collect(),
            rows,
            pagination,
            search: state.search.clone(),
            clickable: self.is_clickable(),
            selected: state.selection.len(),
            bulk_actions: self.bulk_actions.iter().map(|a| a.label.clone()).collect(),
            confirming: state
                .confirming
                .and_then(|i| self.bulk_actions.get(i))
                .and_then(|a| a.confirm.clone()),
        }
    }

    /// Rows on the current page and the pagination describing them.
    fn visible<'a>(&self, state: &'a TableState) -> (Vec<&'a Record>, Pagination) {
        if let Some(page) = &state.server_page {
            let rows = state
                .rows
                .iter()
                .filter(|row| self.matches_filters(state, row))
                .collect();
            return (rows, page.clone());
        }

        let mut rows: Vec<&Record> = state
            .rows
            .iter()
            .filter(|row| self.matches_search(&state.search, row))
            .filter(|row| self.matches_filters(state, row))
            .collect();
        if let Some(sort) = &state.sort {
            if let Some(column) = self.schema.column(&sort.key) {
                rows.sort_by(|a, b| {
                    let ordering = compare(column, a, b);
                    if sort.descending {
                        ordering.reverse()
                    } else {
                        ordering
                    }
                });
            }
        }

        let total = rows.len() as u64;
        let size = state.page_size.max(1);
        let last_page = u32::try_from(total.div_ceil(u64::from(size)))
            .unwrap_or(u32::MAX)
            .max(1);
        let page = state.page.min(last_page);
        let start = (page as usize - 1) * size as usize;
        let rows = rows.into_iter().skip(start).take(size as usize).collect();
        let pagination = Pagination {
            page,
            page_size: size,
            total_items: total,
            has_next: page < last_page,
            has_previous: page > 1,
        };
        (rows, pagination)
    }

    fn matches_search(&self, term: &str, row: &Record) -> bool {
        if term.is_empty() {
            return true;
        }
        let term = term.to_lowercase();
        self.schema
            .searchable()
            .any(|column| render_cell(column, row).to_lowercase().contains(&term))
    }

    fn matches_filters(&self, state: &TableState, row: &Record) -> bool {
        state.filters.iter().all(|(key, text)| {
            self.schema.column(key).is_some_and(|column| {
                render_cell(column, row)
                    .to_lowercase()
                    .contains(&text.to_lowercase())
            })
        })
    }
}

fn query_for(state: &TableState) -> ListQuery {
    let mut query = ListQuery::new()
        .page(state.page)
        .page_size(state.page_size)
        .search(state.search.clone());
    if let Some(sort) = &state.sort {
        query = query.order_by(&sort.key, sort.descending);
    }
    query
}

fn tag_rows(rows: &mut [Record], source: &str) {
    for row in rows {
        row.insert(DATA_SOURCE_KEY.into(), Value::String(source.into()));
    }
}

/// Concatenate primary then secondary; either failing fails the load.
fn merge(
    primary: std::result::Result<PaginatedResult, ApiError>,
    secondary: std::result::Result<PaginatedResult, ApiError>,
    query: &ListQuery,
) -> std::result::Result<PaginatedResult, ApiError> {
    let mut primary = primary?;
    let mut secondary = secondary?;
    tag_rows(&mut primary.data, PRIMARY_SOURCE);
    tag_rows(&mut secondary.data, SECONDARY_SOURCE);

    if !primary.is_server_paged() && !secondary.is_server_paged() {
        primary.data.append(&mut secondary.data);
        return Ok(PaginatedResult::single_page(primary.data));
    }

    let total_items = primary.pagination.total_items + secondary.pagination.total_items;
    primary.data.append(&mut secondary.data);
    Ok(PaginatedResult {
        data: primary.data,
        pagination: Pagination {
            page: query.page,
            page_size: query.page_size,
            total_items,
            has_next: primary.pagination.has_next || secondary.pagination.has_next,
            has_previous: query.page > 1,
        },
        shape: primary.shape,
    })
}

/// Numeric for `Number` columns, case-insensitive display text otherwise.
fn compare(column: &ColumnDescriptor, a: &Record, b: &Record) -> Ordering {
    if matches!(column.kind, ColumnKind::Number) {
        let left = numeric(lookup_path(a, &column.key));
        let right = numeric(lookup_path(b, &column.key));
        return match (left, right) {
            (Some(l), Some(r)) => l.partial_cmp(&r).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
    }
    render_cell(column, a)
        .to_lowercase()
        .cmp(&render_cell(column, b).to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> TableSchema {
        TableSchema::new(
            "part",
            vec![
                ColumnDescriptor::new("name", "Name", ColumnKind::Text),
                ColumnDescriptor::new("qty", "Qty", ColumnKind::Number),
                ColumnDescriptor::new("note", "Note", ColumnKind::Text)
                    .unsortable()
                    .unsearchable(),
            ],
        )
        .unwrap()
    }

    fn rows() -> Vec<Record> {
        [
            json!({"id": 1, "name": "Bolt", "qty": 100, "note": "bin A"}),
            json!({"id": 2, "name": "washer", "qty": 9, "note": "bin B"}),
            json!({"id": 3, "name": "Anchor", "qty": "25", "note": "bolt bin"}),
        ]
        .into_iter()
        .filter_map(|v| v.as_object().cloned())
        .collect()
    }

    fn names(table: &Table) -> Vec<String> {
        table.render().rows.into_iter().map(|r| r.cells[0].clone()).collect()
    }

    #[test]
    fn local_rows_are_ready_without_loading() {
        let table = Table::new(schema(), TableSource::Local(rows()));
        assert_eq!(table.status(), TableStatus::Ready);
        assert_eq!(names(&table), vec!["Bolt", "washer", "Anchor"]);
    }

    #[test]
    fn number_columns_sort_numerically() {
        let table = Table::new(schema(), TableSource::Local(rows()));
        assert!(!table.sort_by("qty", false).unwrap());
        assert_eq!(names(&table), vec!["washer", "Anchor", "Bolt"]);
        table.sort_by("name", true).unwrap();
        assert_eq!(names(&table), vec!["washer", "Bolt", "Anchor"]);
        assert_eq!(
            table.sort_by("note", false),
            Err(TableError::NotSortable { key: "note".into() })
        );
    }

    #[test]
    fn search_skips_unsearchable_columns() {
        let table = Table::new(schema(), TableSource::Local(rows()));
        table.set_search("BOLT");
        assert_eq!(names(&table), vec!["Bolt"]);
    }

    #[test]
    fn column_filters_combine() {
        let table = Table::new(schema(), TableSource::Local(rows()));
        table.set_filter("note", "bin").unwrap();
        table.set_filter("name", "a").unwrap();
        assert_eq!(names(&table), vec!["washer", "Anchor"]);
        table.set_filter("name", "").unwrap();
        assert_eq!(names(&table).len(), 3);
        assert!(table.set_filter("missing", "x").is_err());
    }

    #[test]
    fn client_paging_clamps_to_last_page() {
        let table = Table::new(schema(), TableSource::Local(rows())).with_page_size(2);
        let view = table.render();
        assert_eq!(view.rows.len(), 2);
        assert!(view.pagination.has_next);
        table.set_page(9);
        let view = table.render();
        assert_eq!(view.pagination.page, 2);
        assert_eq!(view.rows.len(), 1);
        assert!(!view.pagination.has_next);
        assert!(view.pagination.has_previous);
    }

    #[test]
    fn columns_reorder_hide_and_resize() {
        let table = Table::new(schema(), TableSource::Local(rows()));
        table.move_column("note", 0).unwrap();
        table.hide_column("qty").unwrap();
        table.set_width("name", 240).unwrap();
        let view = table.render();
        let keys: Vec<_> = view.columns.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["note", "name"]);
        assert_eq!(view.columns[1].width, Some(240));
        assert_eq!(view.rows[0].cells, vec!["bin A", "Bolt"]);
        table.show_column("qty").unwrap();
        assert_eq!(table.render().columns.len(), 3);
    }

    #[test]
    fn empty_after_filtering() {
        let table = Table::new(schema(), TableSource::Local(rows()))
            .with_empty_message("No parts yet.");
        table.set_search("zzz");
        assert_eq!(table.status(), TableStatus::Empty("No parts yet.".into()));
    }
}
