//! Schema-driven tables
//!
//! A [`Table`] renders rows of a [`upkeep_fields::TableSchema`] fetched
//! through any [`upkeep_transport::Backend`], or supplied in memory.
//!
//! - Cells are formatted per column kind ([`render_cell`])
//! - Rows may come from two endpoints merged and tagged by source
//! - Search, filters, sort and paging run locally for plain arrays and on
//!   the server for paginated responses
//! - Row clicks either call back or resolve a `{id}` route
//! - Bulk actions run over the selection, optionally behind a confirmation
//!
//! ```no_run
//! # async fn demo(backend: &dyn upkeep_transport::Backend) {
//! use upkeep_fields::defaults;
//! use upkeep_tables::{RowAction, Table, TableSource};
//!
//! let table = Table::new(
//!     defaults::asset_table(),
//!     TableSource::merged("/assets/equipments", "/assets/attachments"),
//! )
//! .with_row_action(RowAction::navigate("/assets/edit/{id}"));
//! table.load(backend).await;
//! let view = table.render();
//! # let _ = view;
//! # }
//! ```

pub mod actions;
pub mod cell;
pub mod error;
pub mod table;
pub mod view;

pub use actions::{BulkAction, BulkRequest, RowAction, RowClick};
pub use cell::{render_cell, stringify};
pub use error::{Result, TableError};
pub use table::{Table, TableSource, DATA_SOURCE_KEY};
pub use view::{ColumnView, RowView, TableStatus, TableView};
