#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Retry and callback delivery semantics of `AsyncHttpClient`, driven by the
//! manually flushed scheduler.

use httpmock::prelude::*;
use paygate_http::{
    AsyncHttpClient, ErrorKind, ExecutionContext, HttpClientConfig, HttpError, HttpOutcome,
    HttpRequest, ManualScheduler, RequestExecutor, RetryPolicy, ThreadPoolScheduler,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Executor that fails a fixed number of times, then succeeds.
struct FlakyExecutor {
    calls: AtomicUsize,
    failures: usize,
    scheduler: Arc<ManualScheduler>,
    contexts: Mutex<Vec<Option<ExecutionContext>>>,
}

impl FlakyExecutor {
    fn new(failures: usize, scheduler: &Arc<ManualScheduler>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            failures,
            scheduler: Arc::clone(scheduler),
            contexts: Mutex::new(Vec::new()),
        })
    }

    fn always_failing(scheduler: &Arc<ManualScheduler>) -> Arc<Self> {
        Self::new(usize::MAX, scheduler)
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RequestExecutor for FlakyExecutor {
    fn execute(&self, _request: &HttpRequest) -> Result<String, HttpError> {
        self.contexts.lock().push(self.scheduler.current_context());
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            Err(HttpError::Transport("connection reset".into()))
        } else {
            Ok(format!("body after {n} failures"))
        }
    }
}

/// Records every outcome together with the context it was delivered on.
#[derive(Default)]
struct Deliveries {
    outcomes: Mutex<Vec<(Option<ExecutionContext>, HttpOutcome)>>,
}

impl Deliveries {
    fn callback(
        self: &Arc<Self>,
        scheduler: &Arc<ManualScheduler>,
    ) -> Option<paygate_http::HttpCallback> {
        let this = Arc::clone(self);
        let scheduler = Arc::clone(scheduler);
        Some(Box::new(move |outcome| {
            this.outcomes
                .lock()
                .push((scheduler.current_context(), outcome));
        }))
    }

    fn len(&self) -> usize {
        self.outcomes.lock().len()
    }
}

fn client(executor: Arc<dyn RequestExecutor>, scheduler: &Arc<ManualScheduler>) -> AsyncHttpClient {
    AsyncHttpClient::new(executor, scheduler.clone())
}

fn request(policy: RetryPolicy) -> HttpRequest {
    HttpRequest::get("https://api.sandbox.example.com/v1/configuration")
        .retry_policy(policy)
        .build()
        .unwrap()
}

#[test]
fn always_failing_executor_is_called_three_times() {
    let scheduler = Arc::new(ManualScheduler::new());
    let executor = FlakyExecutor::always_failing(&scheduler);
    let deliveries = Arc::new(Deliveries::default());

    client(executor.clone(), &scheduler).send_request(
        request(RetryPolicy::bounded()),
        deliveries.callback(&scheduler),
    );

    assert_eq!(scheduler.background_submitted(), 1);
    assert_eq!(executor.calls(), 0);

    assert_eq!(scheduler.flush_background(), 1);
    assert_eq!(executor.calls(), 3);
    assert_eq!(deliveries.len(), 0, "nothing delivered before completion flush");
    assert_eq!(scheduler.pending_completion(), 1);

    assert_eq!(scheduler.flush_completion(), 1);
    let outcomes = deliveries.outcomes.lock();
    assert_eq!(outcomes.len(), 1);
    let (context, outcome) = &outcomes[0];
    assert_eq!(*context, Some(ExecutionContext::Completion));
    let err = outcome.as_ref().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RetryLimitExceeded);
    let HttpError::RetryLimitExceeded { attempts, last } = err else {
        panic!("expected RetryLimitExceeded, got {err:?}");
    };
    assert_eq!(*attempts, 3);
    assert_eq!(last.kind(), ErrorKind::Transport);
}

#[test]
fn every_attempt_runs_on_background() {
    let scheduler = Arc::new(ManualScheduler::new());
    let executor = FlakyExecutor::always_failing(&scheduler);

    client(executor.clone(), &scheduler).send_request(request(RetryPolicy::bounded()), None);
    scheduler.run_until_idle();

    assert_eq!(
        *executor.contexts.lock(),
        vec![Some(ExecutionContext::Background); 3]
    );
}

#[test]
fn single_failure_then_success_delivers_success() {
    let scheduler = Arc::new(ManualScheduler::new());
    let executor = FlakyExecutor::new(1, &scheduler);
    let deliveries = Arc::new(Deliveries::default());

    client(executor.clone(), &scheduler).send_request(
        request(RetryPolicy::bounded()),
        deliveries.callback(&scheduler),
    );
    scheduler.run_until_idle();

    assert_eq!(executor.calls(), 2);
    let outcomes = deliveries.outcomes.lock();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].0, Some(ExecutionContext::Completion));
    assert_eq!(outcomes[0].1.as_ref().unwrap(), "body after 1 failures");
}

#[test]
fn no_retry_policy_delivers_underlying_error() {
    let scheduler = Arc::new(ManualScheduler::new());
    let executor = FlakyExecutor::always_failing(&scheduler);
    let deliveries = Arc::new(Deliveries::default());

    client(executor.clone(), &scheduler)
        .send_request(request(RetryPolicy::None), deliveries.callback(&scheduler));
    scheduler.run_until_idle();

    assert_eq!(executor.calls(), 1);
    let outcomes = deliveries.outcomes.lock();
    assert_eq!(outcomes[0].1.as_ref().unwrap_err().kind(), ErrorKind::Transport);
}

#[test]
fn missing_callback_schedules_no_completion_work() {
    for failures in [0, 1, usize::MAX] {
        let scheduler = Arc::new(ManualScheduler::new());
        let executor = FlakyExecutor::new(failures, &scheduler);

        client(executor.clone(), &scheduler).send_request(request(RetryPolicy::bounded()), None);
        scheduler.run_until_idle();

        assert!(executor.calls() >= 1);
        assert_eq!(scheduler.background_submitted(), 1);
        assert_eq!(scheduler.completion_submitted(), 0, "failures = {failures}");
    }
}

#[test]
fn validation_errors_are_retried_like_any_other() {
    struct Always422(AtomicUsize);
    impl RequestExecutor for Always422 {
        fn execute(&self, _request: &HttpRequest) -> Result<String, HttpError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(paygate_http::classify(422, "{}"))
        }
    }

    let scheduler = Arc::new(ManualScheduler::new());
    let executor = Arc::new(Always422(AtomicUsize::new(0)));
    let err = client(executor.clone(), &scheduler)
        .execute(request(RetryPolicy::bounded()))
        .unwrap_err();

    assert_eq!(executor.0.load(Ordering::SeqCst), 3);
    assert_eq!(err.kind(), ErrorKind::RetryLimitExceeded);
}

#[test]
fn synchronous_twin_bypasses_scheduler() {
    let scheduler = Arc::new(ManualScheduler::new());
    let executor = FlakyExecutor::new(2, &scheduler);

    let body = client(executor.clone(), &scheduler)
        .execute(request(RetryPolicy::bounded()))
        .unwrap();

    assert_eq!(body, "body after 2 failures");
    assert_eq!(scheduler.background_submitted(), 0);
    assert_eq!(scheduler.completion_submitted(), 0);
    assert_eq!(*executor.contexts.lock(), vec![None; 3]);
}

#[test]
fn concurrent_requests_each_deliver_once() {
    let scheduler = Arc::new(ManualScheduler::new());
    let executor = FlakyExecutor::new(0, &scheduler);
    let deliveries = Arc::new(Deliveries::default());
    let client = client(executor, &scheduler);

    for _ in 0..5 {
        client.send_request(request(RetryPolicy::None), deliveries.callback(&scheduler));
    }
    assert_eq!(scheduler.background_submitted(), 5);
    scheduler.run_until_idle();
    assert_eq!(deliveries.len(), 5);
    assert_eq!(scheduler.completion_submitted(), 5);
}

#[test]
fn thread_pool_end_to_end_against_mock_server() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(Method::GET).path("/v1/configuration");
        then.status(500).body("down for maintenance");
    });

    let scheduler = Arc::new(ThreadPoolScheduler::new(4).unwrap());
    let client = AsyncHttpClient::builder()
        .transport(HttpClientConfig::for_testing().transport)
        .base_url(server.base_url())
        .scheduler(scheduler)
        .build()
        .unwrap();

    let (tx, rx) = std::sync::mpsc::channel();
    client.send_request(
        HttpRequest::get("/v1/configuration")
            .with_retries()
            .build()
            .unwrap(),
        Some(Box::new(move |outcome| {
            let thread = std::thread::current().name().map(ToOwned::to_owned);
            tx.send((thread, outcome)).unwrap();
        })),
    );

    let (thread, outcome) = rx.recv_timeout(Duration::from_secs(10)).unwrap();
    assert_eq!(thread.as_deref(), Some("paygate-http-completion"));
    let err = outcome.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RetryLimitExceeded);
    assert_eq!(mock.calls(), 3);
}

#[test]
fn panicking_parser_still_delivers_failure_on_thread_pool() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(Method::GET).path("/v1/configuration");
        then.status(200).body("{}");
    });

    let parser = |_status: u16, _body: String| -> Result<String, HttpError> {
        panic!("parser bug");
    };
    let client = AsyncHttpClient::builder()
        .transport(HttpClientConfig::for_testing().transport)
        .base_url(server.base_url())
        .parser(Arc::new(parser))
        .scheduler(Arc::new(ThreadPoolScheduler::new(2).unwrap()))
        .build()
        .unwrap();

    let (tx, rx) = std::sync::mpsc::channel();
    client.send_request(
        HttpRequest::get("/v1/configuration").build().unwrap(),
        Some(Box::new(move |outcome| tx.send(outcome).unwrap())),
    );

    let outcome = rx.recv_timeout(Duration::from_secs(10)).unwrap();
    assert_eq!(outcome.unwrap_err().kind(), ErrorKind::Transport);
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
}
