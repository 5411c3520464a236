//! The form state machine.
//!
//! A [`Form`] owns one entity's pending edits. Displayed values resolve
//! pending edit → fetched record → schema default → empty. Nothing reaches
//! the backend until [`Form::submit`], and only one submit is in flight at a
//! time.
//!
//! All operations take `&self` so a host can keep rendering while a call is
//! outstanding. State lives behind a mutex that is never held across an
//! await; responses that arrive after [`Form::unmount`] are dropped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use upkeep_fields::{
    is_blank, lookup_path, FieldDescriptor, FieldKind, FormSchema, OptionSource, Record,
    SelectOption,
};
use upkeep_transport::{ApiError, Backend, FieldErrorMap, ListQuery, MediaRecord, UploadFile};

use crate::error::{FormError, Result};
use crate::media::MediaSlot;
use crate::view::{FieldView, FormView};

/// Message attached to required fields left empty.
pub const REQUIRED_MESSAGE: &str = "This field is required.";

/// Remote option lists are fetched in one page of this size.
const OPTIONS_PAGE_SIZE: u32 = 500;

/// Called with `{}` after a create, or the updated record after an update.
pub type ChangeCallback = Arc<dyn Fn(&Record) + Send + Sync>;

/// Whether submit creates or updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FormMode {
    Create,
    /// `id: None` addresses a single-entity resource at the endpoint itself.
    Update { id: Option<String> },
}

/// The endpoint a form reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormTarget {
    pub endpoint: String,
    pub mode: FormMode,
}

impl FormTarget {
    pub fn create(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            mode: FormMode::Create,
        }
    }

    pub fn update(endpoint: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            mode: FormMode::Update {
                id: Some(id.into()),
            },
        }
    }

    /// Update the resource at `endpoint` itself (settings pages and the like).
    pub fn single(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            mode: FormMode::Update { id: None },
        }
    }
}

/// Result of a submit attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Required fields are empty; nothing was sent.
    Invalid { missing: Vec<String> },
    /// The backend accepted the payload.
    Saved { record: Record },
    /// The backend rejected specific fields.
    Rejected { errors: FieldErrorMap },
    /// Any other failure; `message` is the user-facing copy.
    Failed { message: String },
    /// The session expired and the page is being sent to login.
    Redirected,
    /// Another submit is still in flight.
    Busy,
    /// The form was unmounted before the response arrived.
    Discarded,
}

struct FormState {
    mode: FormMode,
    record: Option<Record>,
    pending: Record,
    options: HashMap<String, Vec<SelectOption>>,
    media: HashMap<String, MediaSlot>,
    field_errors: FieldErrorMap,
    banner: Option<String>,
    loading: bool,
    submitting: bool,
    unmounted: bool,
}

pub struct Form {
    schema: FormSchema,
    endpoint: String,
    on_change: Option<ChangeCallback>,
    state: Mutex<FormState>,
}

impl std::fmt::Debug for Form {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Form")
            .field("entity", &self.schema.entity())
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl Form {
    pub fn new(schema: FormSchema, target: FormTarget) -> Self {
        let mut options = HashMap::new();
        let mut media = HashMap::new();
        for field in schema.iter() {
            match &field.kind {
                FieldKind::Select {
                    source: OptionSource::Static { options: fixed },
                } => {
                    options.insert(field.name.clone(), fixed.clone());
                }
                FieldKind::File { multiple, .. } => {
                    media.insert(field.name.clone(), default_slot(field, *multiple));
                }
                _ => {}
            }
        }

        Self {
            schema,
            endpoint: target.endpoint,
            on_change: None,
            state: Mutex::new(FormState {
                mode: target.mode,
                record: None,
                pending: Record::new(),
                options,
                media,
                field_errors: FieldErrorMap::new(),
                banner: None,
                loading: false,
                submitting: false,
                unmounted: false,
            }),
        }
    }

    /// Register the record-changed callback.
    pub fn on_change(mut self, callback: impl Fn(&Record) + Send + Sync + 'static) -> Self {
        self.on_change = Some(Arc::new(callback));
        self
    }

    fn state(&self) -> MutexGuard<'_, FormState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn field(&self, name: &str) -> Result<&FieldDescriptor> {
        self.schema
            .field(name)
            .ok_or_else(|| FormError::UnknownField { name: name.into() })
    }

    fn file_field(&self, name: &str) -> Result<&FieldDescriptor> {
        let field = self.field(name)?;
        if !field.kind.is_file() {
            return Err(FormError::NotAFileField { name: name.into() });
        }
        Ok(field)
    }

    fn record_path(&self, id: Option<&str>) -> String {
        match id {
            Some(id) => format!("{}/{id}", self.endpoint.trim_end_matches('/')),
            None => self.endpoint.clone(),
        }
    }

    /// Fetch the record (update mode) and remote select options.
    pub async fn mount(&self, backend: &dyn Backend) {
        let mode = self.state().mode.clone();
        if let FormMode::Update { id } = mode {
            let path = self.record_path(id.as_deref());
            self.state().loading = true;
            let result = backend.fetch_one(&path).await;

            let mut state = self.state();
            if state.unmounted {
                debug!(%path, "form unmounted before record arrived");
                return;
            }
            state.loading = false;
            match result {
                Ok(record) => {
                    debug!(%path, "record loaded");
                    for field in self.schema.iter().filter(|f| f.kind.is_file()) {
                        if let (Some(slot), Some(value)) =
                            (state.media.get_mut(&field.name), record.get(&field.name))
                        {
                            slot.seed(value);
                        }
                    }
                    state.record = Some(record);
                }
                Err(ApiError::Unauthorized) => return,
                Err(e) => {
                    warn!(%path, error = %e, "failed to load record");
                    state.banner = Some(e.user_message());
                    if id.is_none() {
                        info!(%path, "single-entity form falling back to create");
                        state.mode = FormMode::Create;
                    }
                }
            }
        }

        self.load_options(backend).await;
    }

    async fn load_options(&self, backend: &dyn Backend) {
        let query = ListQuery::new().page_size(OPTIONS_PAGE_SIZE);
        for field in self.schema.iter() {
            let FieldKind::Select {
                source:
                    OptionSource::Remote {
                        endpoint,
                        value_key,
                        label_key,
                    },
            } = &field.kind
            else {
                continue;
            };

            let result = backend.fetch_list(endpoint, &query).await;
            let mut state = self.state();
            if state.unmounted {
                return;
            }
            match result {
                Ok(page) => {
                    let options = page
                        .data
                        .iter()
                        .filter_map(|row| option_from_row(row, value_key, label_key))
                        .collect();
                    state.options.insert(field.name.clone(), options);
                }
                Err(ApiError::Unauthorized) => return,
                Err(e) => {
                    warn!(field = %field.name, %endpoint, error = %e, "failed to load options");
                    state.options.insert(field.name.clone(), Vec::new());
                    state.banner = Some(format!(
                        "Could not load {} options: {}",
                        field.label,
                        e.user_message()
                    ));
                }
            }
        }
    }

    /// Stop accepting responses and drop pending edits.
    pub fn unmount(&self) {
        let mut state = self.state();
        state.unmounted = true;
        state.pending.clear();
        debug!(entity = %self.schema.entity(), "form unmounted");
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn mode(&self) -> FormMode {
        self.state().mode.clone()
    }

    pub fn banner(&self) -> Option<String> {
        self.state().banner.clone()
    }

    pub fn field_errors(&self) -> FieldErrorMap {
        self.state().field_errors.clone()
    }

    pub fn is_submitting(&self) -> bool {
        self.state().submitting
    }

    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    /// The last fetched or saved record.
    pub fn record(&self) -> Option<Record> {
        self.state().record.clone()
    }

    pub fn pending(&self) -> Record {
        self.state().pending.clone()
    }

    /// Options for a select field.
    pub fn options(&self, name: &str) -> Vec<SelectOption> {
        self.state().options.get(name).cloned().unwrap_or_default()
    }

    /// The displayed value of a field.
    pub fn value(&self, name: &str) -> Result<Value> {
        let field = self.field(name)?;
        Ok(resolve(field, &self.state()))
    }

    /// Record a user edit. Nothing is sent until submit.
    pub fn set_value(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let field = self.field(name)?;
        if field.disabled {
            return Err(FormError::Disabled { name: name.into() });
        }
        if field.kind.is_file() {
            return Err(FormError::FileField { name: name.into() });
        }
        let mut state = self.state();
        state.pending.insert(name.to_string(), value.into());
        state.field_errors.remove(name);
        Ok(())
    }

    /// Required fields whose displayed value is empty, in schema order.
    pub fn missing_required(&self) -> Vec<String> {
        missing_required(&self.schema, &self.state())
    }

    /// The body submit would send right now.
    pub fn payload(&self) -> Record {
        payload(&self.schema, &self.state())
    }

    /// Validate, then POST (create) or PATCH (update).
    pub async fn submit(&self, backend: &dyn Backend) -> SubmitOutcome {
        self.run_submit(backend, false).await
    }

    /// Submit, then leave the form empty in create mode for the next entry.
    pub async fn submit_and_add_another(&self, backend: &dyn Backend) -> SubmitOutcome {
        self.run_submit(backend, true).await
    }

    async fn run_submit(&self, backend: &dyn Backend, add_another: bool) -> SubmitOutcome {
        let (mode, path, body) = {
            let mut state = self.state();
            if state.unmounted {
                return SubmitOutcome::Discarded;
            }
            if state.submitting {
                return SubmitOutcome::Busy;
            }
            let missing = missing_required(&self.schema, &state);
            if !missing.is_empty() {
                debug!(?missing, "submit blocked by required fields");
                for name in &missing {
                    state
                        .field_errors
                        .insert(name.clone(), vec![REQUIRED_MESSAGE.to_string()]);
                }
                return SubmitOutcome::Invalid { missing };
            }

            state.submitting = true;
            state.banner = None;
            state.field_errors.clear();
            let path = match &state.mode {
                FormMode::Create => self.endpoint.clone(),
                FormMode::Update { id } => self.record_path(id.as_deref()),
            };
            (state.mode.clone(), path, payload(&self.schema, &state))
        };

        let result = match mode {
            FormMode::Create => backend.create(&path, &body).await,
            FormMode::Update { .. } => backend.update(&path, &body).await,
        };

        let mut state = self.state();
        state.submitting = false;
        if state.unmounted {
            debug!(%path, "form unmounted before submit resolved");
            return SubmitOutcome::Discarded;
        }

        match result {
            Ok(saved) => {
                state.pending.clear();
                let changed = match mode {
                    FormMode::Create => {
                        self.reset_media(&mut state);
                        Record::new()
                    }
                    FormMode::Update { .. } => {
                        // A partial echo only overrides the keys it carries.
                        let mut updated = state.record.take().unwrap_or_default();
                        updated.extend(body);
                        updated.extend(saved.clone());
                        state.record = Some(updated.clone());
                        updated
                    }
                };
                if add_another {
                    state.mode = FormMode::Create;
                    state.record = None;
                    self.reset_media(&mut state);
                }
                drop(state);

                info!(%path, "form saved");
                if let Some(callback) = &self.on_change {
                    callback(&changed);
                }
                SubmitOutcome::Saved { record: saved }
            }
            Err(ApiError::FieldErrors { message, errors }) => {
                debug!(%path, fields = errors.len(), "server rejected fields");
                state.field_errors = errors.clone();
                state.banner = message;
                SubmitOutcome::Rejected { errors }
            }
            Err(ApiError::Unauthorized) => SubmitOutcome::Redirected,
            Err(e) if e.is_escalated() => SubmitOutcome::Failed {
                message: e.user_message(),
            },
            Err(e) => {
                warn!(%path, error = %e, "submit failed");
                let message = e.user_message();
                state.banner = Some(message.clone());
                SubmitOutcome::Failed { message }
            }
        }
    }

    fn reset_media(&self, state: &mut FormState) {
        for field in self.schema.iter() {
            if let FieldKind::File { multiple, .. } = field.kind {
                state
                    .media
                    .insert(field.name.clone(), default_slot(field, multiple));
            }
        }
    }

    /// Pick a file for later upload.
    pub fn stage_file(&self, name: &str, file: UploadFile) -> Result<()> {
        let field = self.file_field(name)?;
        if field.disabled {
            return Err(FormError::Disabled { name: name.into() });
        }
        let mut state = self.state();
        if let Some(slot) = state.media.get_mut(name) {
            slot.stage(file);
        }
        Ok(())
    }

    /// Upload every staged file of a field, committing each success.
    ///
    /// On failure the unsent files stay staged and earlier uploads stay
    /// committed.
    pub async fn upload_staged(
        &self,
        backend: &dyn Backend,
        name: &str,
    ) -> Result<Vec<MediaRecord>> {
        self.file_field(name)?;
        let files = {
            let mut state = self.state();
            if state.unmounted {
                return Err(FormError::Unmounted);
            }
            state
                .media
                .get_mut(name)
                .map(|slot| std::mem::take(&mut slot.staged))
                .unwrap_or_default()
        };

        let mut uploaded = Vec::with_capacity(files.len());
        for (i, file) in files.iter().enumerate() {
            let result = backend.upload_media(file.clone()).await;
            let mut state = self.state();
            if state.unmounted {
                return Err(FormError::Unmounted);
            }
            let state = &mut *state;
            let Some(slot) = state.media.get_mut(name) else {
                return Err(FormError::NotAFileField { name: name.into() });
            };
            match result {
                Ok(media) => {
                    debug!(field = name, media = %media.id, "media committed");
                    slot.commit(media.clone());
                    state.pending.insert(name.to_string(), slot.ids());
                    uploaded.push(media);
                }
                Err(e) => {
                    warn!(field = name, file = %file.name, error = %e, "upload failed");
                    slot.staged.splice(0..0, files[i..].iter().cloned());
                    if !e.is_escalated() && !matches!(e, ApiError::Unauthorized) {
                        state.banner = Some(format!("Upload failed: {}", e.user_message()));
                    }
                    return Err(e.into());
                }
            }
        }
        Ok(uploaded)
    }

    /// Detach a committed upload from a field.
    pub fn remove_media(&self, name: &str, id: &str) -> Result<()> {
        self.file_field(name)?;
        let mut state = self.state();
        let state = &mut *state;
        let removed = state
            .media
            .get_mut(name)
            .map(|slot| (slot.remove(id), slot.ids()));
        match removed {
            Some((true, ids)) => {
                state.pending.insert(name.to_string(), ids);
                Ok(())
            }
            _ => Err(FormError::MediaNotFound {
                name: name.into(),
                id: id.into(),
            }),
        }
    }

    /// Committed uploads of a file field.
    pub fn media(&self, name: &str) -> Vec<MediaRecord> {
        self.state()
            .media
            .get(name)
            .map(|slot| slot.committed.clone())
            .unwrap_or_default()
    }

    pub fn render(&self) -> FormView {
        let state = self.state();
        let fields = self
            .schema
            .iter()
            .filter(|field| !field.hidden)
            .map(|field| {
                let slot = state.media.get(&field.name);
                FieldView {
                    name: field.name.clone(),
                    label: field.label.clone(),
                    kind: field.kind.clone(),
                    value: resolve(field, &state),
                    required: field.required,
                    disabled: field.disabled,
                    errors: state
                        .field_errors
                        .get(&field.name)
                        .cloned()
                        .unwrap_or_default(),
                    options: state.options.get(&field.name).cloned().unwrap_or_default(),
                    media: slot.map(|s| s.committed.clone()).unwrap_or_default(),
                    staged: slot
                        .map(|s| s.staged.iter().map(|f| f.name.clone()).collect())
                        .unwrap_or_default(),
                }
            })
            .collect();

        FormView {
            mode: state.mode.clone(),
            fields,
            banner: state.banner.clone(),
            loading: state.loading,
            submitting: state.submitting,
        }
    }
}

fn default_slot(field: &FieldDescriptor, multiple: bool) -> MediaSlot {
    let mut slot = MediaSlot::new(multiple);
    if let Some(default) = &field.default {
        slot.seed(default);
    }
    slot
}

/// Pending edit → fetched record → schema default → empty.
fn resolve(field: &FieldDescriptor, state: &FormState) -> Value {
    if let Some(value) = state.pending.get(&field.name) {
        return value.clone();
    }
    if field.kind.is_file() {
        return state
            .media
            .get(&field.name)
            .map(MediaSlot::ids)
            .unwrap_or_else(|| field.kind.empty_value());
    }

    let stored = state
        .record
        .as_ref()
        .and_then(|record| lookup_path(record, &field.name))
        .filter(|value| !value.is_null())
        .or(field.default.as_ref());

    match (stored, &field.kind) {
        (Some(Value::Object(nested)), FieldKind::Select { .. }) => nested
            .get("id")
            .cloned()
            .unwrap_or_else(|| field.kind.empty_value()),
        (Some(value), _) => value.clone(),
        (None, kind) => kind.empty_value(),
    }
}

fn missing_required(schema: &FormSchema, state: &FormState) -> Vec<String> {
    schema
        .required_fields()
        .filter(|field| is_blank(&resolve(field, state)))
        .map(|field| field.name.clone())
        .collect()
}

fn payload(schema: &FormSchema, state: &FormState) -> Record {
    schema
        .iter()
        .map(|field| (field.name.clone(), resolve(field, state)))
        .collect()
}

fn option_from_row(row: &Record, value_key: &str, label_key: &str) -> Option<SelectOption> {
    let value = scalar(lookup_path(row, value_key)?)?;
    let label = lookup_path(row, label_key).and_then(scalar);
    Some(SelectOption { value, label })
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
