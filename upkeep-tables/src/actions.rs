//! Row-click and bulk actions a host attaches to a table.

use std::fmt;
use std::sync::Arc;

use upkeep_fields::{record_id, Record};

/// Placeholder substituted with the row id in navigation patterns.
pub const ID_PLACEHOLDER: &str = "{id}";

/// What clicking a row does.
#[derive(Clone)]
pub enum RowAction {
    /// Invoke a host callback with the clicked row.
    Handler(Arc<dyn Fn(&Record) + Send + Sync>),
    /// Navigate to a route pattern such as `/assets/edit/{id}`.
    Navigate { pattern: String },
}

impl RowAction {
    pub fn handler(f: impl Fn(&Record) + Send + Sync + 'static) -> Self {
        Self::Handler(Arc::new(f))
    }

    pub fn navigate(pattern: impl Into<String>) -> Self {
        Self::Navigate {
            pattern: pattern.into(),
        }
    }
}

impl fmt::Debug for RowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handler(_) => f.write_str("RowAction::Handler"),
            Self::Navigate { pattern } => write!(f, "RowAction::Navigate({pattern})"),
        }
    }
}

/// Result of a row click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowClick {
    /// The host callback ran.
    Handled,
    /// The host should navigate here.
    Navigate(String),
}

/// Substitute the row id into a route pattern.
///
/// Returns `None` when the row has no usable id.
pub fn navigation_target(pattern: &str, row: &Record) -> Option<String> {
    let id = record_id(row)?;
    Some(pattern.replace(ID_PLACEHOLDER, &urlencoding::encode(&id)))
}

/// An action applied to every selected row id at once.
#[derive(Clone)]
pub struct BulkAction {
    pub label: String,
    /// Prompt shown before running; `None` runs immediately.
    pub confirm: Option<String>,
    run: Arc<dyn Fn(&[String]) + Send + Sync>,
}

impl BulkAction {
    pub fn new(label: impl Into<String>, run: impl Fn(&[String]) + Send + Sync + 'static) -> Self {
        Self {
            label: label.into(),
            confirm: None,
            run: Arc::new(run),
        }
    }

    pub fn with_confirmation(mut self, prompt: impl Into<String>) -> Self {
        self.confirm = Some(prompt.into());
        self
    }

    pub(crate) fn run(&self, ids: &[String]) {
        (self.run)(ids)
    }
}

impl fmt::Debug for BulkAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BulkAction")
            .field("label", &self.label)
            .field("confirm", &self.confirm)
            .finish_non_exhaustive()
    }
}

/// Outcome of requesting a bulk action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkRequest {
    /// Nothing is selected, so nothing ran.
    NothingSelected,
    /// The host must show this prompt, then call `confirm_bulk` or `cancel_bulk`.
    NeedsConfirmation { prompt: String },
    /// The action ran over this many ids.
    Fired { count: usize },
}
