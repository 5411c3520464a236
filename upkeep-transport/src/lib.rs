//! Tenant-aware transport for the Upkeep console
//!
//! Everything between a renderer and the backend REST API:
//!
//! - [`TenantContext`] derives the tenant from the page hostname and
//!   [`ApiHosts`] maps it to an API base URL
//! - [`ApiClient`] attaches the bearer token, rate-limits, retries, handles
//!   401 by clearing credentials and redirecting to login, and unwraps the
//!   `{data, meta_data, errors}` envelope into typed [`ApiError`]s
//! - [`normalize_list`] folds every list payload shape into one
//!   [`PaginatedResult`]
//!
//! Renderers depend only on the [`Backend`] trait; [`MemoryBackend`] stands in
//! for the network in tests.

pub mod auth;
pub mod backend;
pub mod client;
pub mod envelope;
pub mod error;
pub mod memory;
pub mod notify;
pub mod pagination;
pub mod rate_limit;
pub mod tenant;

pub use auth::{
    CredentialStore, CurrentUser, FileCredentialStore, MemoryCredentialStore, Session,
    StoredCredentials,
};
pub use backend::{Backend, MediaRecord, UploadFile, MEDIA_UPLOAD_PATH};
pub use client::{ApiClient, ApiClientBuilder};
pub use envelope::{error_envelope, is_envelope, ok_envelope, unwrap_envelope, Unwrapped};
pub use error::{status_message, ApiError, FieldErrorMap, Result};
pub use memory::{MemoryBackend, RecordedCall};
pub use notify::{
    Navigator, Notice, NoticeLevel, Notifier, RecordingNavigator, RecordingNotifier,
    TracingNotifier,
};
pub use pagination::{
    normalize_list, ListQuery, ListShape, PaginatedResult, Pagination, DEFAULT_PAGE_SIZE,
};
pub use rate_limit::RequestLimiter;
pub use tenant::{ApiHosts, TenantContext, ADMIN_SLUG};

pub use reqwest::Method;
