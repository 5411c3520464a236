//! Form Renderer
//!
//! Interprets a [`FormSchema`](upkeep_fields::FormSchema) against a
//! [`Backend`](upkeep_transport::Backend): fetches the record in update mode,
//! keeps per-field pending edits, validates required fields, dispatches
//! create or update, and maps server errors back onto fields.
//!
//! ```no_run
//! # async fn demo(backend: &dyn upkeep_transport::Backend) {
//! use upkeep_fields::defaults::asset_form;
//! use upkeep_forms::{Form, FormTarget, SubmitOutcome};
//!
//! let form = Form::new(asset_form(), FormTarget::update("/assets/equipments", "42"));
//! form.mount(backend).await;
//! form.set_value("name", "Boiler pump").unwrap();
//! match form.submit(backend).await {
//!     SubmitOutcome::Saved { .. } => println!("saved"),
//!     other => println!("{other:?}"),
//! }
//! # }
//! ```

pub mod error;
pub mod form;
mod media;
pub mod view;

pub use error::{FormError, Result};
pub use form::{ChangeCallback, Form, FormMode, FormTarget, SubmitOutcome, REQUIRED_MESSAGE};
pub use view::{FieldView, FormView};
