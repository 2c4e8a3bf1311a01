//! The service facade: configured access to the remote API.
//!
//! # Design
//! `Service` pairs a `ServiceConfig` with a `RequestQueue`. It is passed
//! explicitly to whatever issues requests; clones share one configuration, so
//! a change made through any clone is seen by all of them.
//!
//! Every request goes through `build_request`, which takes the verb, the
//! `Query` and a `Payload`. The verb helpers (`get`, `post_entry`, ...) are
//! one-line wrappers over `request`.

use std::sync::{Arc, RwLock};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::debug;

use crate::config::ServiceConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest};
use crate::payload::{Entry, Payload, PhotoUpload};
use crate::query::Query;
use crate::queue::{RequestHandle, RequestQueue};
use crate::transport::Transport;

#[derive(Debug, Clone)]
pub struct Service {
    config: Arc<RwLock<ServiceConfig>>,
    queue: RequestQueue,
}

impl Service {
    pub fn new(config: ServiceConfig, queue: RequestQueue) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            queue,
        }
    }

    pub fn with_transport(config: ServiceConfig, transport: Arc<dyn Transport>) -> Self {
        Self::new(config, RequestQueue::new(transport))
    }

    /// Service backed by the default `reqwest` transport.
    #[cfg(feature = "reqwest-client")]
    pub fn connect(config: ServiceConfig) -> Result<Self, ApiError> {
        let transport = crate::transport::ReqwestTransport::new()?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> ServiceConfig {
        self.config.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn update_config(&self, update: impl FnOnce(&mut ServiceConfig)) {
        let mut config = self.config.write().unwrap_or_else(|e| e.into_inner());
        update(&mut *config);
    }

    pub fn queue(&self) -> &RequestQueue {
        &self.queue
    }

    pub fn is_valid(&self) -> bool {
        self.config.read().unwrap_or_else(|e| e.into_inner()).is_valid()
    }

    /// Build the request for `method` on `query` carrying `payload`.
    ///
    /// Adds client credentials as HTTP Basic auth, asks for JSON, and encodes
    /// the payload with its content type.
    pub fn build_request(&self, method: HttpMethod, query: &Query, payload: &Payload) -> Result<HttpRequest, ApiError> {
        let config = self.config();
        if !config.is_valid() {
            return Err(ApiError::NotConfigured);
        }
        if !method.allows_body() && !payload.is_none() {
            return Err(ApiError::InvalidPayload(format!("{method} requests do not take a body")));
        }

        let mut request = HttpRequest::new(method, query.url(config.api_base_url())?);
        request
            .headers
            .push(("authorization".to_string(), basic_auth(&config)));
        request
            .headers
            .push(("accept".to_string(), "application/json".to_string()));
        if let Some((content_type, body)) = payload.encode()? {
            request.headers.push(("content-type".to_string(), content_type));
            request.body = Some(body);
        }
        Ok(request)
    }

    /// Build and enqueue a request.
    pub fn request(&self, method: HttpMethod, query: &Query, payload: &Payload) -> Result<RequestHandle, ApiError> {
        let request = self.build_request(method, query, payload)?;
        Ok(self.queue.submit(request))
    }

    /// Enqueue a request built elsewhere, untouched.
    pub fn add_request(&self, request: HttpRequest) -> RequestHandle {
        debug!(method = %request.method, url = %request.url, "adding pre-built request");
        self.queue.submit(request)
    }

    pub fn get(&self, query: &Query) -> Result<RequestHandle, ApiError> {
        self.request(HttpMethod::Get, query, &Payload::None)
    }

    pub fn post(&self, query: &Query) -> Result<RequestHandle, ApiError> {
        self.request(HttpMethod::Post, query, &Payload::None)
    }

    pub fn post_entry(&self, query: &Query, entry: &Entry) -> Result<RequestHandle, ApiError> {
        self.request(HttpMethod::Post, query, &Payload::Entry(entry.clone()))
    }

    pub fn post_photo(
        &self,
        query: &Query,
        photo_data: Vec<u8>,
        format: &str,
        description: &str,
    ) -> Result<RequestHandle, ApiError> {
        let photo = PhotoUpload::new(photo_data, format, description);
        self.request(HttpMethod::Post, query, &Payload::Photo(photo))
    }

    pub fn put(&self, query: &Query) -> Result<RequestHandle, ApiError> {
        self.request(HttpMethod::Put, query, &Payload::None)
    }

    pub fn put_entry(&self, query: &Query, entry: &Entry) -> Result<RequestHandle, ApiError> {
        self.request(HttpMethod::Put, query, &Payload::Entry(entry.clone()))
    }

    pub fn delete(&self, query: &Query) -> Result<RequestHandle, ApiError> {
        self.request(HttpMethod::Delete, query, &Payload::None)
    }
}

fn basic_auth(config: &ServiceConfig) -> String {
    let raw = format!("{}:{}", config.client_id(), config.client_secret());
    format!("Basic {}", STANDARD.encode(raw))
}
