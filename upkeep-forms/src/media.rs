//! Per-field media state for file fields.
//!
//! Files are staged locally, uploaded on an explicit action, and only the ids
//! of committed uploads ever reach the form's pending edits.

use serde_json::Value;
use upkeep_transport::{MediaRecord, UploadFile};

#[derive(Debug, Clone, Default)]
pub(crate) struct MediaSlot {
    pub multiple: bool,
    pub staged: Vec<UploadFile>,
    pub committed: Vec<MediaRecord>,
}

impl MediaSlot {
    pub fn new(multiple: bool) -> Self {
        Self {
            multiple,
            ..Default::default()
        }
    }

    /// Seed committed media from a record or default value.
    pub fn seed(&mut self, value: &Value) {
        self.committed = media_from_value(value);
    }

    pub fn stage(&mut self, file: UploadFile) {
        if !self.multiple {
            self.staged.clear();
        }
        self.staged.push(file);
    }

    pub fn commit(&mut self, media: MediaRecord) {
        if !self.multiple {
            self.committed.clear();
        }
        self.committed.push(media);
    }

    /// Remove a committed upload; false if it was not attached.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.committed.len();
        self.committed.retain(|media| media.id != id);
        self.committed.len() != before
    }

    pub fn ids(&self) -> Value {
        Value::Array(
            self.committed
                .iter()
                .map(|media| Value::String(media.id.clone()))
                .collect(),
        )
    }
}

/// Media records from a stored field value.
///
/// Accepts full media objects as well as bare string or numeric ids.
fn media_from_value(value: &Value) -> Vec<MediaRecord> {
    let items = match value {
        Value::Array(items) => items.as_slice(),
        Value::Null => return Vec::new(),
        single => std::slice::from_ref(single),
    };
    items.iter().filter_map(media_item).collect()
}

fn media_item(item: &Value) -> Option<MediaRecord> {
    match item {
        Value::Object(map) => serde_json::from_value(item.clone())
            .ok()
            .or_else(|| map.get("id").and_then(media_item)),
        Value::String(id) if !id.is_empty() => Some(bare(id.clone())),
        Value::Number(n) => Some(bare(n.to_string())),
        _ => None,
    }
}

fn bare(id: String) -> MediaRecord {
    MediaRecord {
        id,
        file: String::new(),
        file_type: None,
    }
}
