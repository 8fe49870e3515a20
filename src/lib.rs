//! restui - terminal admin panel for REST APIs
//!
//! Pages, fields, pagination and custom actions are described in a JSON or
//! YAML configuration; this crate turns that description into navigable
//! list and detail views backed by the remote API.
//!
//! The headless engine lives in [`resource`] and [`http`]; [`app`], [`event`]
//! and [`ui`] are the ratatui front end.

pub mod app;
pub mod config;
pub mod config_store;
pub mod editor;
pub mod error;
pub mod event;
pub mod http;
pub mod notification;
pub mod resource;
pub mod ui;

/// Version injected at compile time via RESTUI_VERSION env var (set by CI/CD),
/// or the crate version for local builds.
pub const VERSION: &str = match option_env!("RESTUI_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};
