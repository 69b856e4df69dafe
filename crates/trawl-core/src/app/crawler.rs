//! Crawler - queue + event bus + worker pool の入口
//!
//! # イベント
//! - **response**: 論理タスクごとにちょうど 1 回。handler から `queue()` して再帰的に crawl できる
//! - **drain**: outstanding が 0 になったとき run ごとに 1 回
//!
//! # 使用例
//! ```ignore
//! let crawler = Crawler::builder().max_connections(2).retries(0).build()?;
//! crawler.on_response(|result, crawler| {
//!     if let Some(page) = result.page() {
//!         println!("{} {}", page.status, result.task.uri());
//!     }
//!     Ok(())
//! });
//! crawler.on_drain(|| Ok(()));
//! crawler.queue("https://example.com/");
//! let stats = crawler.run().await?;
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use futures::FutureExt;
use tracing::{debug, info, warn};

use super::handler::{DrainFn, EventHandler, ResponseFn};
use super::worker_loop::WorkerGroup;
use super::{CrawlerBuilder, CrawlerConfig, RunStats};
use crate::domain::{CrawlEvent, CrawlResult, EventKind, TaskDefaults, TaskId, TaskSpec};
use crate::error::{CrawlError, HandlerError};
use crate::ports::{DocumentParser, Fetch};
use crate::queue::{RateLimiter, RetryPolicy, TaskQueue};

/// Cheap to clone; every clone drives the same queue and handlers.
#[derive(Clone)]
pub struct Crawler {
    pub(super) inner: Arc<Inner>,
}

pub(super) struct Inner {
    pub(super) config: CrawlerConfig,
    task_defaults: TaskDefaults,
    pub(super) queue: TaskQueue,
    pub(super) rate_limiter: RateLimiter,
    pub(super) retry_policy: RetryPolicy,
    pub(super) fetcher: Arc<dyn Fetch>,
    pub(super) parser: Option<Arc<dyn DocumentParser>>,
    handlers: RwLock<HashMap<EventKind, Arc<dyn EventHandler>>>,
    running: AtomicBool,
}

impl Crawler {
    pub fn builder() -> CrawlerBuilder {
        CrawlerBuilder::new()
    }

    pub(super) fn from_parts(
        config: CrawlerConfig,
        fetcher: Arc<dyn Fetch>,
        parser: Option<Arc<dyn DocumentParser>>,
        retry_policy: RetryPolicy,
    ) -> Self {
        let inner = Inner {
            task_defaults: config.task_defaults(),
            queue: TaskQueue::new(config.queue_order),
            rate_limiter: RateLimiter::new(config.rate_limit),
            retry_policy,
            fetcher,
            parser,
            handlers: RwLock::new(HashMap::new()),
            running: AtomicBool::new(false),
            config,
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.inner.config
    }

    /// Queue a new logical task. Accepts a bare URI or a full `TaskSpec`.
    ///
    /// Safe to call before `run()` and from inside a `response` handler
    /// while running; that is how recursive crawls add follow-up pages.
    pub fn queue(&self, spec: impl Into<TaskSpec>) -> TaskId {
        let task = spec.into().into_task(&self.inner.task_defaults);
        let id = task.id();
        debug!(task_id = %id, uri = task.uri(), retries = task.retries(), "push to queue");
        self.inner.queue.push(task);
        id
    }

    /// Register the handler for `kind`, replacing any previous one.
    pub fn on(&self, kind: EventKind, handler: impl EventHandler + 'static) {
        self.inner
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind, Arc::new(handler));
    }

    pub fn on_response<F>(&self, handler: F)
    where
        F: Fn(&CrawlResult, &Crawler) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.on(EventKind::Response, ResponseFn(handler));
    }

    pub fn on_drain<F>(&self, handler: F)
    where
        F: Fn() -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.on(EventKind::Drain, DrainFn(handler));
    }

    /// Logical tasks queued but not yet resolved.
    pub fn outstanding(&self) -> usize {
        self.inner.queue.outstanding()
    }

    pub fn is_drained(&self) -> bool {
        self.inner.queue.is_drained()
    }

    /// Start `max_connections` workers and wait until the queue drains.
    ///
    /// Individual task failures never fail the run; they arrive as failed
    /// `CrawlResult`s. Tasks queued from the `drain` handler are left for
    /// the next `run()`.
    pub async fn run(&self) -> Result<RunStats, CrawlError> {
        if self.inner.running.swap(true, Ordering::AcqRel) {
            return Err(CrawlError::AlreadyRunning);
        }
        let _running = RunningGuard(&self.inner.running);

        self.inner.queue.begin_run();
        let workers = self.inner.config.max_connections;
        info!(workers, queued = self.outstanding(), "crawl started");

        WorkerGroup::spawn(workers, self).join().await;

        let stats = self.inner.queue.stats();
        info!(
            succeeded = stats.succeeded,
            failed = stats.failed,
            attempts = stats.attempts,
            retries = stats.retries,
            "crawl finished"
        );
        Ok(stats)
    }

    fn handler_for(&self, kind: EventKind) -> Option<Arc<dyn EventHandler>> {
        self.inner
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned()
    }

    /// Invoke the registered handler, if any. Errors and panics stop here.
    pub(super) async fn trigger(&self, event: CrawlEvent) {
        let kind = event.kind();
        let Some(handler) = self.handler_for(kind) else {
            return;
        };

        match AssertUnwindSafe(handler.handle(&event, self)).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(event = %kind, error = %e, "event handler failed"),
            Err(payload) => warn!(event = %kind, panic = %panic_message(&*payload), "event handler panicked"),
        }
    }
}

impl fmt::Debug for Crawler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crawler")
            .field("config", &self.inner.config)
            .field("outstanding", &self.outstanding())
            .field("running", &self.inner.running.load(Ordering::Acquire))
            .finish()
    }
}

struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub(super) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
