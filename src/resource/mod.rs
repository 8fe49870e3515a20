//! Resource abstraction layer
//!
//! Pages of the admin panel are described by configuration rather than code.
//! Each page is a [`ResourceConfig`] whose methods (getAll, getSingle, post,
//! put, delete, custom actions) name the REST endpoints behind it.
//!
//! # Architecture
//!
//! - [`registry`] - Typed configuration model and validation
//! - [`query`] - Query fields to and from the location query string
//! - [`pagination`] - Pagination state derived from config, fields and totals
//! - [`session`] - Per-view state (fields, pagination, items, stale guard)
//! - [`controller`] - Async list, detail and write operations
//! - [`detail`] - Detail paths built from `getSingle.id` templates
//! - [`fetcher`] - Data-path extraction, natural sort and text filtering
//! - [`transform`] - Named data transforms applied after extraction
//! - [`form`] - Form fields to request bodies
//!
//! # Example
//!
//! ```ignore
//! use restui::resource::{AppConfig, ResourceController, ResourceSession, TransformRegistry};
//!
//! async fn list_users(transport: &restui::http::HttpTransport) -> restui::error::Result<()> {
//!     let config = AppConfig::demo().expect("demo config");
//!     let users = std::sync::Arc::new(config.page("users").unwrap().clone());
//!     let mut session = ResourceSession::new(users, config.custom_labels.clone(), "");
//!     let transforms = TransformRegistry::with_builtins();
//!     ResourceController::new(transport, &transforms).fetch_all(&mut session).await
//! }
//! ```

pub mod controller;
pub mod detail;
pub mod fetcher;
pub mod form;
pub mod pagination;
pub mod query;
mod registry;
pub mod session;
pub mod transform;

pub use controller::{Confirmation, DeleteOutcome, ResourceController, DELETE_CONFIRM_MESSAGE};
pub use detail::resolve_detail_path;
pub use fetcher::extract_json_value;
pub use form::FormPayload;
pub use pagination::{items_count_label, PaginationState};
pub use registry::*;
pub use session::{ResourceSession, SubmitOutcome};
pub use transform::{DataTransform, TransformRegistry};
