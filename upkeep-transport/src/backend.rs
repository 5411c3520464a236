//! The operations renderers need from the backend.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use upkeep_fields::Record;

use crate::envelope::{is_envelope, unwrap_envelope};
use crate::error::{ApiError, Result};
use crate::pagination::{ListQuery, PaginatedResult};

/// Path media uploads are posted to.
pub const MEDIA_UPLOAD_PATH: &str = "/media_uploader/upload";

/// Data access for forms and tables.
///
/// Paths are relative to the tenant's API host (`/assets/equipments/42`).
#[async_trait]
pub trait Backend: Send + Sync {
    /// `GET path`; the response must be an enveloped object.
    async fn fetch_one(&self, path: &str) -> Result<Record>;

    /// `GET path` with paging parameters; any list shape is accepted.
    async fn fetch_list(&self, path: &str, query: &ListQuery) -> Result<PaginatedResult>;

    /// `POST path`; returns the created record.
    async fn create(&self, path: &str, payload: &Record) -> Result<Record>;

    /// `PATCH path`; returns the updated record.
    async fn update(&self, path: &str, payload: &Record) -> Result<Record>;

    /// Multipart `POST` of one file to the media uploader.
    async fn upload_media(&self, file: UploadFile) -> Result<MediaRecord>;
}

/// A file picked by the user, not yet uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl UploadFile {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }
}

/// A committed upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// URL of the stored file.
    pub file: String,
    #[serde(default)]
    pub file_type: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// A single-record response body: envelope required, `data` an object.
pub(crate) fn decode_record(body: Value) -> Result<Record> {
    match unwrap_envelope(body)?.data {
        Value::Object(record) => Ok(record),
        other => Err(ApiError::malformed(format!("expected a record, got {other}"))),
    }
}

/// A write response body: like [`decode_record`], but `null` data is an empty record.
pub(crate) fn decode_written(body: Value) -> Result<Record> {
    match unwrap_envelope(body)?.data {
        Value::Object(record) => Ok(record),
        Value::Null => Ok(Record::new()),
        other => Err(ApiError::malformed(format!("expected a record, got {other}"))),
    }
}

/// An upload response body, enveloped or bare.
pub(crate) fn decode_media(body: Value) -> Result<MediaRecord> {
    let data = if is_envelope(&body) {
        unwrap_envelope(body)?.data
    } else {
        body
    };
    serde_json::from_value(data).map_err(|e| ApiError::malformed(format!("media record: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn media_ids_may_be_numbers() {
        let media: MediaRecord = serde_json::from_value(json!({
            "id": 17,
            "file": "https://cdn.example.com/m/17.pdf",
            "file_type": "application/pdf"
        }))
        .unwrap();
        assert_eq!(media.id, "17");

        let media: MediaRecord =
            serde_json::from_value(json!({"id": "m-9", "file": "/m/9.png"})).unwrap();
        assert_eq!(media.id, "m-9");
        assert_eq!(media.file_type, None);
    }

    #[test]
    fn upload_response_enveloped_or_bare() {
        let bare = json!({"id": 3, "file": "/m/3.jpg", "file_type": "image/jpeg"});
        let enveloped = crate::envelope::ok_envelope(bare.clone());
        assert_eq!(decode_media(bare).unwrap(), decode_media(enveloped).unwrap());
        assert!(matches!(
            decode_media(json!({"file": "/m/3.jpg"})),
            Err(ApiError::MalformedEnvelope { .. })
        ));
    }

    #[test]
    fn written_null_data_is_empty_record() {
        let body = crate::envelope::ok_envelope(Value::Null);
        assert!(decode_written(body.clone()).unwrap().is_empty());
        assert!(matches!(
            decode_record(body),
            Err(ApiError::MalformedEnvelope { .. })
        ));
    }
}
