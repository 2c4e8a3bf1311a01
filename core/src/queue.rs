//! Shared request queue and the handles it returns.
//!
//! # Design
//! `submit` returns immediately. Each request runs on its own tokio task,
//! gated by a semaphore so at most `max_concurrent` requests are on the wire.
//! The outcome travels back over a oneshot channel, which gives the
//! exactly-once guarantee: the task sends one `Result`, and if it dies before
//! sending, the dropped sender turns into `ApiError::Transport` on the
//! receiving side.
//!
//! Dropping a `RequestHandle` does not stop the request; use `cancel`.
//!
//! Tasks run on the runtime given to `with_handle`, or else on the runtime
//! current at `submit`. With neither, the handle resolves at once to
//! `ApiError::Transport` instead of panicking.

use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{oneshot, Notify, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::Transport;

pub const DEFAULT_MAX_CONCURRENT: usize = 4;

type Outcome = Result<HttpResponse, ApiError>;

/// Executes requests asynchronously on a shared transport.
///
/// Cloning is cheap; clones share the transport, the concurrency limit and
/// the in-flight counter.
#[derive(Clone)]
pub struct RequestQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    transport: Arc<dyn Transport>,
    permits: Semaphore,
    max_concurrent: usize,
    in_flight: AtomicUsize,
    runtime: Option<Handle>,
}

impl RequestQueue {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_max_concurrent(transport, DEFAULT_MAX_CONCURRENT)
    }

    /// `max_concurrent` of 0 is treated as 1.
    pub fn with_max_concurrent(transport: Arc<dyn Transport>, max_concurrent: usize) -> Self {
        Self::build(transport, max_concurrent, None)
    }

    /// Queue whose requests always run on `runtime`, so `submit` works from
    /// threads that are not inside a tokio runtime.
    pub fn with_handle(transport: Arc<dyn Transport>, max_concurrent: usize, runtime: Handle) -> Self {
        Self::build(transport, max_concurrent, Some(runtime))
    }

    fn build(transport: Arc<dyn Transport>, max_concurrent: usize, runtime: Option<Handle>) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            inner: Arc::new(QueueInner {
                transport,
                permits: Semaphore::new(max_concurrent),
                max_concurrent,
                in_flight: AtomicUsize::new(0),
                runtime,
            }),
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.inner.max_concurrent
    }

    /// Requests submitted but not yet completed, waiting ones included.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Enqueue `request` and return a handle to its outcome.
    pub fn submit(&self, request: HttpRequest) -> RequestHandle {
        let id = Uuid::new_v4();
        let method = request.method;
        let url = request.url.clone();
        let (tx, rx) = oneshot::channel();
        let cancel = Arc::new(Notify::new());

        let runtime = match self.inner.runtime.clone().or_else(|| Handle::try_current().ok()) {
            Some(runtime) => runtime,
            None => {
                warn!(%id, %method, %url, "no tokio runtime to run request");
                let _ = tx.send(Err(ApiError::Transport("no tokio runtime available".to_string())));
                return RequestHandle {
                    id,
                    method,
                    url,
                    cancel,
                    runtime: None,
                    outcome: rx,
                };
            }
        };

        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        debug!(%id, %method, %url, "request enqueued");

        let inner = Arc::clone(&self.inner);
        let task_cancel = Arc::clone(&cancel);
        runtime.spawn(async move {
            let guard = InFlightGuard(Arc::clone(&inner));
            let outcome = tokio::select! {
                biased;
                _ = task_cancel.notified() => Err(ApiError::Cancelled),
                outcome = execute(&inner, request) => outcome,
            };
            match &outcome {
                Ok(response) => debug!(%id, status = response.status, "request completed"),
                Err(ApiError::Cancelled) => debug!(%id, "request cancelled"),
                Err(e) => warn!(%id, error = %e, "request failed"),
            }
            // Settle the counter before the caller can observe the outcome.
            drop(guard);
            let _ = tx.send(outcome);
        });

        RequestHandle {
            id,
            method,
            url,
            cancel,
            runtime: Some(runtime),
            outcome: rx,
        }
    }
}

impl std::fmt::Debug for RequestQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestQueue")
            .field("max_concurrent", &self.inner.max_concurrent)
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

async fn execute(inner: &QueueInner, request: HttpRequest) -> Outcome {
    let _permit = inner
        .permits
        .acquire()
        .await
        .map_err(|_| ApiError::Transport("request queue closed".to_string()))?;
    inner.transport.execute(request).await
}

struct InFlightGuard(Arc<QueueInner>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A live request owned by the queue.
///
/// Await it (or call `wait`) for the outcome, or hand the outcome to a
/// callback with `on_complete`. Either way the outcome is delivered once.
#[derive(Debug)]
pub struct RequestHandle {
    id: Uuid,
    method: HttpMethod,
    url: String,
    cancel: Arc<Notify>,
    runtime: Option<Handle>,
    outcome: oneshot::Receiver<Outcome>,
}

impl RequestHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Stop the request. No effect once it has completed.
    pub fn cancel(&self) {
        self.cancel.notify_one();
    }

    /// A detached canceller, usable after the handle has been consumed.
    pub fn canceller(&self) -> Canceller {
        Canceller(Arc::clone(&self.cancel))
    }

    pub async fn wait(self) -> Outcome {
        self.outcome
            .await
            .unwrap_or_else(|_| Err(ApiError::Transport("request dropped before completion".to_string())))
    }

    /// Deliver the outcome to `callback` on a task of the request's runtime.
    ///
    /// When the request never reached a runtime its outcome is already
    /// known; `callback` then runs inline and `None` is returned.
    pub fn on_complete<F>(mut self, callback: F) -> Option<JoinHandle<()>>
    where
        F: FnOnce(Outcome) + Send + 'static,
    {
        match self.runtime.take() {
            Some(runtime) => Some(runtime.spawn(async move { callback(self.wait().await) })),
            None => {
                let outcome = self
                    .outcome
                    .try_recv()
                    .unwrap_or_else(|_| Err(ApiError::Transport("no tokio runtime available".to_string())));
                callback(outcome);
                None
            }
        }
    }
}

impl IntoFuture for RequestHandle {
    type Output = Outcome;
    type IntoFuture = Pin<Box<dyn Future<Output = Outcome> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.wait())
    }
}

/// Cancels the request it was taken from.
#[derive(Debug, Clone)]
pub struct Canceller(Arc<Notify>);

impl Canceller {
    pub fn cancel(&self) {
        self.0.notify_one();
    }
}
