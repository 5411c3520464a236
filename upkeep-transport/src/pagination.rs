//! List queries and normalization of the backend's list payload shapes.
//!
//! Three shapes reach the console, enveloped or not:
//!
//! | Shape       | Payload                                   |
//! |-------------|-------------------------------------------|
//! | `Array`     | `[...]`, total from `meta_data.total`     |
//! | `Paginated` | `{data: [...], pagination: {...}}`        |
//! | `Cursor`    | `{results: [...], count, next, previous}` |
//!
//! [`normalize_list`] is the only code that looks at which one arrived.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use upkeep_fields::Record;

use crate::envelope::{is_envelope, unwrap_envelope};
use crate::error::{ApiError, Result};

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Paging, search and ordering parameters for a list call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    pub page: u32,
    pub page_size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Column key, prefixed with `-` for descending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordering: Option<String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            search: None,
            ordering: None,
        }
    }
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        let term = term.into();
        self.search = (!term.trim().is_empty()).then_some(term);
        self
    }

    pub fn order_by(mut self, key: &str, descending: bool) -> Self {
        self.ordering = Some(if descending {
            format!("-{key}")
        } else {
            key.to_string()
        });
        self
    }

    /// Query-string pairs in a stable order.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("page_size", self.page_size.to_string()),
        ];
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        if let Some(ordering) = &self.ordering {
            pairs.push(("ordering", ordering.clone()));
        }
        pairs
    }
}

/// Which payload shape a list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListShape {
    Array,
    Paginated,
    Cursor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub total_items: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl Pagination {
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total_items.div_ceil(u64::from(self.page_size))
    }

    fn computed(page: u32, page_size: u32, total_items: u64) -> Self {
        Self {
            page,
            page_size,
            total_items,
            has_next: u64::from(page) * u64::from(page_size) < total_items,
            has_previous: page > 1,
        }
    }
}

/// A page of records in the one shape renderers consume.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaginatedResult {
    pub data: Vec<Record>,
    pub pagination: Pagination,
    pub shape: ListShape,
}

impl PaginatedResult {
    /// Everything in one page; used for in-memory sources.
    pub fn single_page(data: Vec<Record>) -> Self {
        let len = data.len();
        Self {
            pagination: Pagination {
                page: 1,
                page_size: u32::try_from(len).unwrap_or(u32::MAX),
                total_items: len as u64,
                has_next: false,
                has_previous: false,
            },
            data,
            shape: ListShape::Array,
        }
    }

    /// Whether the server holds rows beyond this response.
    pub fn is_server_paged(&self) -> bool {
        self.shape != ListShape::Array || self.pagination.total_items > self.data.len() as u64
    }
}

/// Normalize any accepted list payload into a [`PaginatedResult`].
pub fn normalize_list(body: Value, query: &ListQuery) -> Result<PaginatedResult> {
    let (payload, meta_total) = if is_envelope(&body) {
        let unwrapped = unwrap_envelope(body)?;
        (unwrapped.data, unwrapped.total)
    } else {
        (body, None)
    };

    match payload {
        Value::Array(items) => from_array(records(items)?, meta_total, query),
        Value::Object(mut map) => {
            if let Some(Value::Array(items)) = map.remove("results") {
                return Ok(from_cursor(records(items)?, &map, query));
            }
            match (map.remove("data"), map.remove("pagination")) {
                (Some(Value::Array(items)), Some(Value::Object(meta))) => {
                    Ok(from_paginated(records(items)?, &meta, query))
                }
                (Some(Value::Array(items)), _) => from_array(records(items)?, meta_total, query),
                _ => Err(ApiError::malformed("list payload has no rows")),
            }
        }
        Value::Null => from_array(Vec::new(), meta_total, query),
        _ => Err(ApiError::malformed("list payload is not an array or object")),
    }
}

fn records(items: Vec<Value>) -> Result<Vec<Record>> {
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => Ok(map),
            other => Err(ApiError::malformed(format!("list row is not an object: {other}"))),
        })
        .collect()
}

fn from_array(data: Vec<Record>, total: Option<u64>, query: &ListQuery) -> Result<PaginatedResult> {
    let pagination = match total {
        Some(total) => Pagination::computed(query.page, query.page_size, total),
        None => Pagination {
            page: 1,
            page_size: u32::try_from(data.len()).unwrap_or(u32::MAX),
            total_items: data.len() as u64,
            has_next: false,
            has_previous: false,
        },
    };
    Ok(PaginatedResult {
        data,
        pagination,
        shape: ListShape::Array,
    })
}

fn from_cursor(data: Vec<Record>, meta: &Map<String, Value>, query: &ListQuery) -> PaginatedResult {
    let total_items = meta
        .get("count")
        .and_then(Value::as_u64)
        .unwrap_or(data.len() as u64);
    let link = |key: &str| meta.get(key).is_some_and(|v| !v.is_null());
    PaginatedResult {
        pagination: Pagination {
            page: query.page,
            page_size: query.page_size,
            total_items,
            has_next: link("next"),
            has_previous: link("previous"),
        },
        data,
        shape: ListShape::Cursor,
    }
}

fn from_paginated(
    data: Vec<Record>,
    meta: &Map<String, Value>,
    query: &ListQuery,
) -> PaginatedResult {
    let number = |keys: &[&str]| keys.iter().find_map(|key| meta.get(*key)?.as_u64());
    let flag = |keys: &[&str]| keys.iter().find_map(|key| meta.get(*key)?.as_bool());

    let page = number(&["page", "currentPage", "current_page"])
        .and_then(|p| u32::try_from(p).ok())
        .unwrap_or(query.page);
    let page_size = number(&["pageSize", "page_size", "perPage", "per_page"])
        .and_then(|p| u32::try_from(p).ok())
        .unwrap_or(query.page_size);
    let total_items = number(&["total", "totalItems", "total_items", "count"])
        .unwrap_or(data.len() as u64);

    let mut pagination = Pagination::computed(page, page_size, total_items);
    if let Some(has_next) = flag(&["hasNext", "has_next"]) {
        pagination.has_next = has_next;
    }
    if let Some(has_previous) = flag(&["hasPrevious", "has_previous", "hasPrev"]) {
        pagination.has_previous = has_previous;
    }

    PaginatedResult {
        data,
        pagination,
        shape: ListShape::Paginated,
    }
}
