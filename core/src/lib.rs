//! Service facade for a REST API of entries, photos and objects.
//!
//! # Overview
//! A `Service` holds the API base URL, the client credentials and a shared
//! `RequestQueue`. Callers describe an endpoint with a `Query`, choose a verb
//! and a `Payload`, and get back a `RequestHandle` that resolves once with
//! `Result<HttpResponse, ApiError>`.
//!
//! # Design
//! - The service is passed explicitly; there is no global instance.
//! - One request builder takes a tagged `Payload` (none, entry, photo).
//! - One completion path: the handle is a future; `on_complete` layers a
//!   callback on top of it.
//! - HTTP I/O sits behind the `Transport` trait. `ReqwestTransport` is the
//!   default implementation.

pub mod config;
pub mod error;
pub mod http;
pub mod payload;
pub mod query;
pub mod queue;
pub mod service;
pub mod transport;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use payload::{Entry, Payload, PhotoUpload};
pub use query::Query;
pub use queue::{Canceller, RequestHandle, RequestQueue};
pub use service::Service;
pub use transport::Transport;
#[cfg(feature = "reqwest-client")]
pub use transport::ReqwestTransport;
