//! Error types for the service facade.
//!
//! # Design
//! `NotFound` and `Unauthorized` get dedicated variants because callers
//! frequently branch on "the resource does not exist" and "the credentials
//! were rejected". All other non-2xx responses land in `HttpError` with the
//! raw status code and body for debugging.
//!
//! Network-level failures (`Transport`) and cancellation are reported through
//! the same request handle as HTTP outcomes, so every request resolves to
//! exactly one `Result`.

use thiserror::Error;

/// Errors produced while building, executing or interpreting a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Base URL, client id or client secret is missing.
    #[error("service is not configured: base url and client credentials are required")]
    NotConfigured,

    /// The payload does not fit the chosen verb (e.g. a body on GET).
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Base URL and query path do not form a valid URL.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The request payload could not be serialized.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The transport failed before a response was received.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The request was cancelled through its handle.
    #[error("request cancelled")]
    Cancelled,

    /// The server returned 401.
    #[error("unauthorized")]
    Unauthorized,

    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 401 or 404.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },
}
