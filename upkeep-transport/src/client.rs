//! HTTP implementation of [`Backend`] for one tenant.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::{debug, instrument, warn};
use upkeep_config::{ApiConfig, RouteConfig, UpkeepConfig};
use upkeep_fields::Record;
use url::Url;

use crate::auth::{CredentialStore, MemoryCredentialStore};
use crate::backend::{
    decode_media, decode_record, decode_written, Backend, MediaRecord, UploadFile,
    MEDIA_UPLOAD_PATH,
};
use crate::envelope::{failure, is_envelope};
use crate::error::{ApiError, Result};
use crate::notify::{Navigator, Notice, Notifier, RecordingNavigator, TracingNotifier};
use crate::pagination::{normalize_list, ListQuery, PaginatedResult};
use crate::rate_limit::RequestLimiter;
use crate::tenant::{ApiHosts, TenantContext};

const USER_AGENT: &str = concat!("upkeep/", env!("CARGO_PKG_VERSION"));

/// Request body variants.
enum Payload<'a> {
    Empty,
    Json(&'a Record),
    Upload(&'a UploadFile),
}

/// Tenant-aware client for the backend REST API.
///
/// Every request waits for the rate limiter, carries the bearer token read
/// from the credential store at that moment, and is retried at most
/// `max_retries` times on transient failure. A 401 clears credentials and
/// redirects to login.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tenant: TenantContext,
    login_route: String,
    max_retries: u32,
    retry_delay: Duration,
    limiter: RequestLimiter,
    credentials: Arc<dyn CredentialStore>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("tenant", &self.tenant)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ApiClient`].
pub struct ApiClientBuilder {
    api: ApiConfig,
    routes: RouteConfig,
    tenant: TenantContext,
    base_url: Option<String>,
    credentials: Option<Arc<dyn CredentialStore>>,
    notifier: Option<Arc<dyn Notifier>>,
    navigator: Option<Arc<dyn Navigator>>,
}

impl ApiClientBuilder {
    /// Store the bearer token is read from. Defaults to an empty memory store.
    pub fn credentials(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.credentials = Some(store);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Talk to `url` instead of the host resolved from the tenant.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn build(self) -> Result<ApiClient> {
        let base_url = self
            .base_url
            .unwrap_or_else(|| ApiHosts::from_config(&self.api).resolve(&self.tenant));
        Url::parse(&base_url)
            .map_err(|e| ApiError::InvalidRequest(format!("base url {base_url}: {e}")))?;

        let http = reqwest::Client::builder()
            .timeout(self.api.timeout())
            .user_agent(USER_AGENT)
            .build()?;

        debug!(%base_url, tenant = ?self.tenant.tenant_slug(), "api client ready");

        Ok(ApiClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            tenant: self.tenant,
            login_route: self.routes.login,
            max_retries: self.api.max_retries,
            retry_delay: self.api.retry_delay(),
            limiter: RequestLimiter::per_second(self.api.requests_per_second),
            credentials: self
                .credentials
                .unwrap_or_else(|| Arc::new(MemoryCredentialStore::new())),
            notifier: self.notifier.unwrap_or_else(|| Arc::new(TracingNotifier)),
            navigator: self
                .navigator
                .unwrap_or_else(|| Arc::new(RecordingNavigator::default())),
        })
    }
}

impl ApiClient {
    pub fn builder(config: &UpkeepConfig, tenant: TenantContext) -> ApiClientBuilder {
        ApiClientBuilder {
            api: config.api.clone(),
            routes: config.routes.clone(),
            tenant,
            base_url: None,
            credentials: None,
            notifier: None,
            navigator: None,
        }
    }

    pub fn tenant(&self) -> &TenantContext {
        &self.tenant
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send one logical request, escalating status and network failures.
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        payload: Payload<'_>,
    ) -> Result<Value> {
        let result = self.execute(method, path, query, payload).await;
        if let Err(e) = &result {
            if e.is_escalated() {
                self.notifier.notify(Notice::error(e.user_message()));
            }
        }
        result
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        payload: Payload<'_>,
    ) -> Result<Value> {
        let url = self.url(path, query)?;
        let mut attempt = 0;

        loop {
            self.limiter.acquire().await;
            let request = self.request(method.clone(), url.clone(), &payload)?;
            debug!(%method, %url, attempt, "sending request");

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status == StatusCode::UNAUTHORIZED {
                        return Err(self.unauthorized());
                    }
                    if attempt < self.max_retries && retryable_status(&method, status) {
                        attempt += 1;
                        warn!(%method, %url, status = status.as_u16(), attempt, "retrying request");
                        self.pause().await;
                        continue;
                    }
                    let body = response.bytes().await?;
                    return interpret(status, &body);
                }
                Err(e) => {
                    if attempt < self.max_retries && retryable_error(&method, &e) {
                        attempt += 1;
                        warn!(%method, %url, error = %e, attempt, "retrying request");
                        self.pause().await;
                        continue;
                    }
                    return Err(ApiError::Network(e));
                }
            }
        }
    }

    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url> {
        let joined = if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        };
        let mut url = Url::parse(&joined)
            .map_err(|e| ApiError::InvalidRequest(format!("{joined}: {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    /// Build a fresh request; bodies are rebuilt on every attempt.
    fn request(
        &self,
        method: Method,
        url: Url,
        payload: &Payload<'_>,
    ) -> Result<reqwest::RequestBuilder> {
        let mut builder = self.http.request(method, url);
        if let Some(token) = self.credentials.access_token() {
            builder = builder.bearer_auth(token);
        }
        Ok(match payload {
            Payload::Empty => builder,
            Payload::Json(record) => builder.json(record),
            Payload::Upload(file) => {
                let part = multipart::Part::bytes(file.bytes.to_vec())
                    .file_name(file.name.clone())
                    .mime_str(&file.content_type)
                    .map_err(|e| {
                        ApiError::InvalidRequest(format!("media type {}: {e}", file.content_type))
                    })?;
                builder.multipart(multipart::Form::new().part("file", part))
            }
        })
    }

    fn unauthorized(&self) -> ApiError {
        if let Err(e) = self.credentials.clear() {
            warn!(%e, "failed to clear credentials");
        }
        let current = self.navigator.current_path();
        if is_on_route(&current, &self.login_route) {
            debug!("401 on the login route, not redirecting");
        } else {
            let location = format!("{}?next={current}", self.login_route);
            warn!(%location, "session expired, redirecting to login");
            self.navigator.redirect(&location);
        }
        ApiError::Unauthorized
    }

    async fn pause(&self) {
        if !self.retry_delay.is_zero() {
            tokio::time::sleep(self.retry_delay).await;
        }
    }
}

/// `route` itself, or `route` followed by a query string or a sub-path.
fn is_on_route(path: &str, route: &str) -> bool {
    path.strip_prefix(route)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(['?', '/', '#']))
}

fn is_idempotent(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::PUT | Method::DELETE
    )
}

/// 5xx and 429 are retried for idempotent methods only.
fn retryable_status(method: &Method, status: StatusCode) -> bool {
    is_idempotent(method)
        && (status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS)
}

/// Refused connections never reached the server; timeouts might have.
fn retryable_error(method: &Method, error: &reqwest::Error) -> bool {
    error.is_connect() || (error.is_timeout() && is_idempotent(method))
}

/// Turn a final response into its body, or the error it describes.
fn interpret(status: StatusCode, body: &[u8]) -> Result<Value> {
    let parsed = if body.iter().all(u8::is_ascii_whitespace) {
        Ok(Value::Null)
    } else {
        serde_json::from_slice::<Value>(body)
    };

    match parsed {
        Ok(value) if status.is_success() => Ok(value),
        Ok(value) if is_envelope(&value) => {
            debug!(status = status.as_u16(), "failure envelope");
            Err(failure(&value))
        }
        Ok(_) => Err(ApiError::Status {
            status: status.as_u16(),
        }),
        Err(e) if status.is_success() => Err(ApiError::malformed(format!("invalid JSON: {e}"))),
        Err(_) => Err(ApiError::Status {
            status: status.as_u16(),
        }),
    }
}

#[async_trait]
impl Backend for ApiClient {
    #[instrument(skip(self))]
    async fn fetch_one(&self, path: &str) -> Result<Record> {
        let body = self.send(Method::GET, path, &[], Payload::Empty).await?;
        decode_record(body)
    }

    #[instrument(skip(self))]
    async fn fetch_list(&self, path: &str, query: &ListQuery) -> Result<PaginatedResult> {
        let body = self
            .send(Method::GET, path, &query.to_pairs(), Payload::Empty)
            .await?;
        normalize_list(body, query)
    }

    #[instrument(skip(self, payload))]
    async fn create(&self, path: &str, payload: &Record) -> Result<Record> {
        let body = self
            .send(Method::POST, path, &[], Payload::Json(payload))
            .await?;
        decode_written(body)
    }

    #[instrument(skip(self, payload))]
    async fn update(&self, path: &str, payload: &Record) -> Result<Record> {
        let body = self
            .send(Method::PATCH, path, &[], Payload::Json(payload))
            .await?;
        decode_written(body)
    }

    #[instrument(skip(self, file), fields(file = %file.name))]
    async fn upload_media(&self, file: UploadFile) -> Result<MediaRecord> {
        let body = self
            .send(Method::POST, MEDIA_UPLOAD_PATH, &[], Payload::Upload(&file))
            .await?;
        decode_media(body)
    }
}
