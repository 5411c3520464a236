//! Render output for a table.

use serde::Serialize;
use upkeep_transport::Pagination;

/// What the table body should show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum TableStatus {
    /// A fetch is in flight.
    Loading,
    /// The last fetch failed; rows from before it are still shown.
    Error(String),
    /// Loaded, but no rows survive search and filters.
    Empty(String),
    Ready,
}

/// Snapshot of a table for a host to draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableView {
    pub status: TableStatus,
    pub columns: Vec<ColumnView>,
    pub rows: Vec<RowView>,
    pub pagination: Pagination,
    pub search: String,
    pub clickable: bool,
    pub selected: usize,
    pub bulk_actions: Vec<String>,
    /// Prompt of a bulk action waiting for confirmation.
    pub confirming: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnView {
    pub key: String,
    pub header: String,
    pub width: Option<u16>,
    pub sortable: bool,
    /// `Some(true)` when sorted descending.
    pub sorted: Option<bool>,
    pub filter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowView {
    pub id: Option<String>,
    /// One entry per visible column, in display order.
    pub cells: Vec<String>,
    pub selected: bool,
    /// `primary` or `secondary` for merged remote sources.
    pub source: Option<String>,
}
