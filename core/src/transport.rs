//! The seam between the request queue and the network.
//!
//! The queue only knows `Transport`; any HTTP library can sit behind it. A
//! `reqwest`-backed implementation ships behind the `reqwest-client` feature.

use async_trait::async_trait;

use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};

/// Executes one HTTP round-trip.
///
/// Implementations return `Ok` for every response the server produced,
/// whatever its status, and `Err(ApiError::Transport)` when no response was
/// received at all.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

#[cfg(feature = "reqwest-client")]
pub use reqwest_impl::ReqwestTransport;

#[cfg(feature = "reqwest-client")]
mod reqwest_impl {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::Transport;
    use crate::error::ApiError;
    use crate::http::{HttpMethod, HttpRequest, HttpResponse};

    const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Async transport on top of `reqwest`.
    #[derive(Debug, Clone)]
    pub struct ReqwestTransport {
        client: reqwest::Client,
    }

    impl ReqwestTransport {
        pub fn new() -> Result<Self, ApiError> {
            Self::with_timeout(DEFAULT_TIMEOUT_SECS)
        }

        pub fn with_timeout(timeout_secs: u64) -> Result<Self, ApiError> {
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .map_err(|e| ApiError::Transport(format!("failed to build http client: {e}")))?;
            Ok(Self { client })
        }

        pub fn with_client(client: reqwest::Client) -> Self {
            Self { client }
        }
    }

    #[async_trait]
    impl Transport for ReqwestTransport {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
            let method = match request.method {
                HttpMethod::Get => reqwest::Method::GET,
                HttpMethod::Post => reqwest::Method::POST,
                HttpMethod::Put => reqwest::Method::PUT,
                HttpMethod::Delete => reqwest::Method::DELETE,
            };

            let mut builder = self.client.request(method, &request.url);
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = builder
                .send()
                .await
                .map_err(|e| ApiError::Transport(format!("{} {} failed: {e}", request.method, request.url)))?;

            let status = response.status().as_u16();
            let headers = header_pairs(response.headers());
            let body = response
                .bytes()
                .await
                .map_err(|e| ApiError::Transport(format!("failed to read response body: {e}")))?
                .to_vec();

            Ok(HttpResponse { status, headers, body })
        }
    }

    /// Non-UTF-8 header bytes are kept, lossily decoded.
    fn header_pairs(headers: &reqwest::header::HeaderMap) -> Vec<(String, String)> {
        headers
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect()
    }

}
