//! Execution contexts for the asynchronous client.
//!
//! A [`Scheduler`] offers two contexts: a bounded background pool where
//! blocking HTTP work runs, and a single completion context where caller
//! callbacks run one at a time, in submission order.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::thread::JoinHandle;
use tokio::sync::mpsc;

/// A unit of work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Dispatches work onto the background and completion contexts.
pub trait Scheduler: Send + Sync {
    /// Queue `task` on the background pool.
    fn run_on_background(&self, task: Task);

    /// Queue `task` on the completion context.
    fn run_on_completion_context(&self, task: Task);
}

impl<T: Scheduler + ?Sized> Scheduler for Arc<T> {
    fn run_on_background(&self, task: Task) {
        (**self).run_on_background(task);
    }

    fn run_on_completion_context(&self, task: Task) {
        (**self).run_on_completion_context(task);
    }
}

/// Production scheduler.
///
/// Background work runs on the blocking pool of a tokio runtime, capped at
/// `max_background_threads`. Completion work runs on one dedicated thread;
/// a panicking callback is logged and does not stop later callbacks.
pub struct ThreadPoolScheduler {
    background: BackgroundPool,
    completion_tx: mpsc::UnboundedSender<Task>,
    completion_thread: Option<JoinHandle<()>>,
}

enum BackgroundPool {
    Owned(Option<tokio::runtime::Runtime>),
    Shared(tokio::runtime::Handle),
}

impl BackgroundPool {
    fn handle(&self) -> Option<&tokio::runtime::Handle> {
        match self {
            BackgroundPool::Owned(rt) => rt.as_ref().map(tokio::runtime::Runtime::handle),
            BackgroundPool::Shared(handle) => Some(handle),
        }
    }
}

impl ThreadPoolScheduler {
    /// Build a scheduler with its own runtime.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the runtime or the completion thread cannot
    /// be started.
    pub fn new(max_background_threads: usize) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(max_background_threads.max(1))
            .thread_name("paygate-http-bg")
            .enable_all()
            .build()?;
        Self::start(BackgroundPool::Owned(Some(runtime)))
    }

    /// Build a scheduler that runs background work on an existing runtime.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the completion thread cannot be started.
    pub fn with_handle(handle: tokio::runtime::Handle) -> std::io::Result<Self> {
        Self::start(BackgroundPool::Shared(handle))
    }

    fn start(background: BackgroundPool) -> std::io::Result<Self> {
        let (completion_tx, mut completion_rx) = mpsc::unbounded_channel::<Task>();
        let completion_thread = std::thread::Builder::new()
            .name("paygate-http-completion".to_owned())
            .spawn(move || {
                while let Some(task) = completion_rx.blocking_recv() {
                    if std::panic::catch_unwind(std::panic::AssertUnwindSafe(task)).is_err() {
                        tracing::error!("completion callback panicked");
                    }
                }
                tracing::trace!("completion context stopped");
            })?;

        Ok(Self {
            background,
            completion_tx,
            completion_thread: Some(completion_thread),
        })
    }
}

impl Scheduler for ThreadPoolScheduler {
    fn run_on_background(&self, task: Task) {
        if let Some(handle) = self.background.handle() {
            drop(handle.spawn_blocking(task));
        } else {
            tracing::warn!("background pool is shut down; task dropped");
        }
    }

    fn run_on_completion_context(&self, task: Task) {
        if self.completion_tx.send(task).is_err() {
            tracing::warn!("completion context is shut down; callback dropped");
        }
    }
}

impl Drop for ThreadPoolScheduler {
    fn drop(&mut self) {
        if let BackgroundPool::Owned(runtime) = &mut self.background
            && let Some(runtime) = runtime.take()
        {
            runtime.shutdown_background();
        }
        // Closing the sender lets the completion thread drain and exit.
        let (closed_tx, _) = mpsc::unbounded_channel();
        drop(std::mem::replace(&mut self.completion_tx, closed_tx));
        if let Some(thread) = self.completion_thread.take()
            && thread.thread().id() != std::thread::current().id()
            && thread.join().is_err()
        {
            tracing::warn!("completion thread terminated abnormally");
        }
    }
}

impl std::fmt::Debug for ThreadPoolScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPoolScheduler").finish_non_exhaustive()
    }
}

/// Which context a [`ManualScheduler`] task is currently running in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionContext {
    Background,
    Completion,
}

const CONTEXT_NONE: u8 = 0;
const CONTEXT_BACKGROUND: u8 = 1;
const CONTEXT_COMPLETION: u8 = 2;

/// Deterministic scheduler for tests.
///
/// Tasks are queued and only run when the test calls
/// [`flush_background`](Self::flush_background) or
/// [`flush_completion`](Self::flush_completion), on the calling thread.
#[derive(Default)]
pub struct ManualScheduler {
    background: Mutex<VecDeque<Task>>,
    completion: Mutex<VecDeque<Task>>,
    background_submitted: AtomicUsize,
    completion_submitted: AtomicUsize,
    context: AtomicU8,
}

impl ManualScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total background tasks ever submitted.
    #[must_use]
    pub fn background_submitted(&self) -> usize {
        self.background_submitted.load(Ordering::SeqCst)
    }

    /// Total completion tasks ever submitted.
    #[must_use]
    pub fn completion_submitted(&self) -> usize {
        self.completion_submitted.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn pending_background(&self) -> usize {
        self.background.lock().len()
    }

    #[must_use]
    pub fn pending_completion(&self) -> usize {
        self.completion.lock().len()
    }

    /// The context of the task being run by a flush, if any.
    #[must_use]
    pub fn current_context(&self) -> Option<ExecutionContext> {
        match self.context.load(Ordering::SeqCst) {
            CONTEXT_BACKGROUND => Some(ExecutionContext::Background),
            CONTEXT_COMPLETION => Some(ExecutionContext::Completion),
            _ => None,
        }
    }

    /// Run queued background tasks, including ones queued while flushing.
    /// Returns how many ran.
    #[must_use]
    pub fn flush_background(&self) -> usize {
        self.drain(&self.background, CONTEXT_BACKGROUND)
    }

    /// Run queued completion tasks, including ones queued while flushing.
    /// Returns how many ran.
    #[must_use]
    pub fn flush_completion(&self) -> usize {
        self.drain(&self.completion, CONTEXT_COMPLETION)
    }

    /// Flush both queues until neither has work left.
    pub fn run_until_idle(&self) {
        while self.flush_background() + self.flush_completion() > 0 {}
    }

    fn drain(&self, queue: &Mutex<VecDeque<Task>>, context: u8) -> usize {
        let mut ran = 0;
        loop {
            // Lock released before running so tasks may enqueue more work.
            let Some(task) = queue.lock().pop_front() else {
                break;
            };
            let previous = self.context.swap(context, Ordering::SeqCst);
            task();
            self.context.store(previous, Ordering::SeqCst);
            ran += 1;
        }
        if self.context.load(Ordering::SeqCst) == CONTEXT_NONE {
            tracing::trace!(ran, "manual scheduler flushed");
        }
        ran
    }
}

impl Scheduler for ManualScheduler {
    fn run_on_background(&self, task: Task) {
        self.background_submitted.fetch_add(1, Ordering::SeqCst);
        self.background.lock().push_back(task);
    }

    fn run_on_completion_context(&self, task: Task) {
        self.completion_submitted.fetch_add(1, Ordering::SeqCst);
        self.completion.lock().push_back(task);
    }
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("pending_background", &self.pending_background())
            .field("pending_completion", &self.pending_completion())
            .finish_non_exhaustive()
    }
}
