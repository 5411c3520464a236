//! In-memory [`Backend`] for driving renderers without a server.
//!
//! Responses are scripted per `METHOD path` as raw bodies, so they pass
//! through the same envelope and list decoding as real responses. Unscripted
//! calls fall back to plain CRUD behaviour.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use upkeep_fields::Record;

use crate::backend::{
    decode_media, decode_record, decode_written, Backend, MediaRecord, UploadFile,
    MEDIA_UPLOAD_PATH,
};
use crate::envelope::ok_envelope;
use crate::error::{ApiError, Result};
use crate::pagination::{normalize_list, ListQuery, PaginatedResult};

/// One call made against the fake.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub query: Option<ListQuery>,
}

struct Scripted {
    delay: Option<Duration>,
    response: Result<Value>,
}

#[derive(Default)]
pub struct MemoryBackend {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<RecordedCall>>,
    next_id: AtomicU64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            ..Default::default()
        }
    }

    /// Queue a response body (or error) for the next `method path` call.
    pub fn respond(&self, method: Method, path: &str, response: Result<Value>) -> &Self {
        self.push(method, path, None, response)
    }

    /// Queue a success envelope around `data`.
    pub fn respond_ok(&self, method: Method, path: &str, data: Value) -> &Self {
        self.respond(method, path, Ok(ok_envelope(data)))
    }

    /// Queue a response that resolves only after `delay`.
    pub fn respond_after(
        &self,
        method: Method,
        path: &str,
        delay: Duration,
        response: Result<Value>,
    ) -> &Self {
        self.push(method, path, Some(delay), response)
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of calls made to `method path`.
    pub fn count(&self, method: &Method, path: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| &call.method == method && call.path == path)
            .count()
    }

    fn push(
        &self,
        method: Method,
        path: &str,
        delay: Option<Duration>,
        response: Result<Value>,
    ) -> &Self {
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key(&method, path))
            .or_default()
            .push_back(Scripted { delay, response });
        self
    }

    /// Record the call and take its scripted response, waiting out any delay.
    async fn take(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        query: Option<ListQuery>,
    ) -> Option<Result<Value>> {
        let scripted = self
            .scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&key(&method, path))
            .and_then(VecDeque::pop_front);
        debug!(%method, path, scripted = scripted.is_some(), "memory backend call");
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                method,
                path: path.to_string(),
                body,
                query,
            });

        let scripted = scripted?;
        if let Some(delay) = scripted.delay {
            tokio::time::sleep(delay).await;
        }
        Some(scripted.response)
    }

    fn fresh_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

fn key(method: &Method, path: &str) -> String {
    format!("{method} {path}")
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn fetch_one(&self, path: &str) -> Result<Record> {
        match self.take(Method::GET, path, None, None).await {
            Some(response) => decode_record(response?),
            None => Err(ApiError::Status { status: 404 }),
        }
    }

    async fn fetch_list(&self, path: &str, query: &ListQuery) -> Result<PaginatedResult> {
        match self
            .take(Method::GET, path, None, Some(query.clone()))
            .await
        {
            Some(response) => normalize_list(response?, query),
            None => Err(ApiError::Status { status: 404 }),
        }
    }

    async fn create(&self, path: &str, payload: &Record) -> Result<Record> {
        let body = Value::Object(payload.clone());
        match self.take(Method::POST, path, Some(body), None).await {
            Some(response) => decode_written(response?),
            None => {
                let mut created = payload.clone();
                created.insert("id".into(), json!(self.fresh_id()));
                Ok(created)
            }
        }
    }

    async fn update(&self, path: &str, payload: &Record) -> Result<Record> {
        let body = Value::Object(payload.clone());
        match self.take(Method::PATCH, path, Some(body), None).await {
            Some(response) => decode_written(response?),
            None => Ok(payload.clone()),
        }
    }

    async fn upload_media(&self, file: UploadFile) -> Result<MediaRecord> {
        let body = json!({ "name": file.name, "content_type": file.content_type });
        match self
            .take(Method::POST, MEDIA_UPLOAD_PATH, Some(body), None)
            .await
        {
            Some(response) => decode_media(response?),
            None => {
                let id = self.fresh_id();
                Ok(MediaRecord {
                    id: id.to_string(),
                    file: format!("/media/{id}/{}", file.name),
                    file_type: Some(file.content_type),
                })
            }
        }
    }
}
