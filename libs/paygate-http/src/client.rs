//! Asynchronous HTTP client with bounded immediate retry.
//!
//! The client never blocks its caller. Each [`AsyncHttpClient::send_request`]
//! submits exactly one unit of work to the scheduler's background context;
//! that unit performs every attempt the request's [`RetryPolicy`] allows and
//! then hands the single outcome to the completion context.
//!
//! Retries are immediate and uniform: there is no backoff and the error kind
//! is not consulted. When a bounded policy runs out of attempts the caller
//! receives [`HttpError::RetryLimitExceeded`], which carries the last attempt's
//! error as its source.

use crate::builder::HttpClientBuilder;
use crate::config::RetryPolicy;
use crate::error::HttpError;
use crate::executor::RequestExecutor;
use crate::request::HttpRequest;
use crate::scheduler::Scheduler;
use std::sync::Arc;

/// Result of one logical request: the parsed success body or one classified
/// error.
pub type HttpOutcome = Result<String, HttpError>;

/// Receives the outcome of [`AsyncHttpClient::send_request`] on the
/// completion context, exactly once.
pub type HttpCallback = Box<dyn FnOnce(HttpOutcome) + Send + 'static>;

/// Callback-based HTTP client.
///
/// Cheap to clone; clones share the executor and scheduler.
#[derive(Clone)]
pub struct AsyncHttpClient {
    executor: Arc<dyn RequestExecutor>,
    scheduler: Arc<dyn Scheduler>,
    base_url: Option<Arc<str>>,
}

impl AsyncHttpClient {
    #[must_use]
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::new()
    }

    /// Assemble a client from explicit parts.
    #[must_use]
    pub fn new(executor: Arc<dyn RequestExecutor>, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            executor,
            scheduler,
            base_url: None,
        }
    }

    /// Base URL applied to requests that were built without one.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(Arc::from(base_url.into()));
        self
    }

    #[must_use]
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Send `request` in the background.
    ///
    /// With `callback == None` the request is still performed, but nothing
    /// is ever scheduled on the completion context. A panic in the executor
    /// or its parser is delivered as a [`HttpError::Transport`] failure.
    pub fn send_request(&self, request: HttpRequest, callback: Option<HttpCallback>) {
        let request = self.prepare(request);
        let executor = Arc::clone(&self.executor);
        let scheduler = Arc::clone(&self.scheduler);

        tracing::trace!(method = %request.method(), "scheduling request");
        self.scheduler.run_on_background(Box::new(move || {
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                execute_with_retry(executor.as_ref(), &request)
            }))
            .unwrap_or_else(|payload| {
                let message = panic_message(payload.as_ref());
                tracing::error!(
                    method = %request.method(),
                    panic = %message,
                    "request execution panicked"
                );
                Err(HttpError::Transport(
                    format!("request execution panicked: {message}").into(),
                ))
            });
            match callback {
                Some(callback) => {
                    scheduler.run_on_completion_context(Box::new(move || callback(outcome)));
                }
                None => {
                    if let Err(err) = outcome {
                        tracing::debug!(error = %err, "request without callback failed");
                    }
                }
            }
        }));
    }

    /// Deliver `err` to `callback` on the completion context without
    /// touching the network. Used when a request cannot even be built.
    pub fn deliver_failure(&self, err: HttpError, callback: Option<HttpCallback>) {
        if let Some(callback) = callback {
            self.scheduler
                .run_on_completion_context(Box::new(move || callback(Err(err))));
        }
    }

    /// Perform `request` on the calling thread, with the same retry
    /// semantics as [`send_request`](Self::send_request).
    ///
    /// # Errors
    ///
    /// Returns the classified error of the single attempt, or
    /// [`HttpError::RetryLimitExceeded`] when a bounded policy is exhausted.
    pub fn execute(&self, request: HttpRequest) -> HttpOutcome {
        let request = self.prepare(request);
        execute_with_retry(self.executor.as_ref(), &request)
    }

    fn prepare(&self, request: HttpRequest) -> HttpRequest {
        match &self.base_url {
            Some(base) => request.with_default_base_url(base),
            None => request,
        }
    }
}

impl std::fmt::Debug for AsyncHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncHttpClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

/// Run every attempt allowed by the request's policy.
pub(crate) fn execute_with_retry(
    executor: &dyn RequestExecutor,
    request: &HttpRequest,
) -> HttpOutcome {
    let policy = request.retry_policy();
    let max_attempts = policy.max_attempts();
    let mut attempt: u32 = 1;

    loop {
        tracing::debug!(method = %request.method(), attempt, max_attempts, "executing request");

        let err = match executor.execute(request) {
            Ok(body) => return Ok(body),
            Err(err) => err,
        };

        match policy {
            RetryPolicy::None => return Err(err),
            RetryPolicy::Bounded { .. } if attempt >= max_attempts => {
                tracing::warn!(
                    method = %request.method(),
                    attempts = attempt,
                    error = %err,
                    "retry limit exceeded"
                );
                return Err(HttpError::RetryLimitExceeded {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }
            RetryPolicy::Bounded { .. } => {
                tracing::warn!(
                    method = %request.method(),
                    attempt,
                    kind = ?err.kind(),
                    error = %err,
                    "request failed, retrying"
                );
                attempt += 1;
            }
        }
    }
}
