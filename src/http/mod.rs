//! HTTP transport module
//!
//! This module provides the transport seam between the resource controller
//! and the remote REST API.
//!
//! # Module Structure
//!
//! - [`transport`] - The [`Transport`] trait, request/response types and url
//!   template resolution
//! - [`client`] - reqwest implementation used by the application
//!
//! # Example
//!
//! ```ignore
//! use restui::http::{HttpTransport, Transport};
//!
//! async fn example(request: FetchRequest) -> anyhow::Result<()> {
//!     let transport = HttpTransport::new(Some("https://api.example.com"), Headers::new(), timeout)?;
//!     let response = transport.fetch(request).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod transport;

pub use client::{format_transport_error, HttpTransport};
pub use transport::{
    FetchRequest, FormPart, MultipartPayload, RequestBody, ResponseType, Transport,
    TransportError, TransportResponse,
};
