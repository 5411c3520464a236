//! The backend's `{data, meta_data, errors}` response envelope.
//!
//! ```json
//! { "data": {...}, "meta_data": { "success": true, "message": "ok", "total": 12 } }
//! { "data": null, "meta_data": { "success": false }, "errors": { "name": ["required"] } }
//! ```

use serde_json::{json, Map, Value};

use crate::error::{ApiError, FieldErrorMap, Result};

/// A successfully unwrapped envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Unwrapped {
    pub data: Value,
    /// `meta_data.total`, used as the list total for bare-array payloads.
    pub total: Option<u64>,
    pub message: Option<String>,
}

/// Whether `body` carries the envelope (a `meta_data.success` boolean).
pub fn is_envelope(body: &Value) -> bool {
    success_flag(body).is_some()
}

fn success_flag(body: &Value) -> Option<bool> {
    body.get("meta_data")?.get("success")?.as_bool()
}

/// Unwrap an enveloped body, failing with the typed error it describes.
///
/// A body without the envelope is [`ApiError::MalformedEnvelope`].
pub fn unwrap_envelope(body: Value) -> Result<Unwrapped> {
    let Some(success) = success_flag(&body) else {
        return Err(ApiError::malformed("missing meta_data.success"));
    };
    if !success {
        return Err(failure(&body));
    }

    let meta = body.get("meta_data");
    let total = meta.and_then(|m| m.get("total")).and_then(Value::as_u64);
    let message = meta
        .and_then(|m| m.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string);
    let data = match body {
        Value::Object(mut map) => map.remove("data").unwrap_or(Value::Null),
        _ => Value::Null,
    };
    Ok(Unwrapped {
        data,
        total,
        message,
    })
}

/// The error a failed envelope reports.
///
/// Non-empty `errors` wins over `message`; neither yields
/// [`ApiError::Unrecognized`].
pub fn failure(body: &Value) -> ApiError {
    let message = body
        .get("meta_data")
        .and_then(|m| m.get("message"))
        .and_then(Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string);

    match body.get("errors") {
        Some(Value::Object(map)) if !map.is_empty() => ApiError::FieldErrors {
            message,
            errors: field_error_map(map),
        },
        Some(Value::String(text)) if !text.trim().is_empty() => ApiError::Server {
            message: message.unwrap_or_else(|| text.clone()),
        },
        _ => match message {
            Some(message) => ApiError::Server { message },
            None => ApiError::Unrecognized,
        },
    }
}

fn field_error_map(map: &Map<String, Value>) -> FieldErrorMap {
    map.iter()
        .map(|(field, value)| (field.clone(), messages(value)))
        .collect()
}

fn messages(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items.iter().flat_map(messages).collect(),
        Value::Null => Vec::new(),
        other => vec![other.to_string()],
    }
}

/// A success envelope around `data`.
pub fn ok_envelope(data: Value) -> Value {
    json!({ "data": data, "meta_data": { "success": true } })
}

/// A failure envelope carrying a field error map.
pub fn error_envelope(message: Option<&str>, errors: Value) -> Value {
    let mut meta = json!({ "success": false });
    if let Some(message) = message {
        meta["message"] = json!(message);
    }
    json!({ "data": null, "meta_data": meta, "errors": errors })
}
