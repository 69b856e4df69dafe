//! WorkerLoop - タスク実行ループ
//!
//! # フロー
//! 1. TaskQueue::next() で次のタスクを取得（outstanding == 0 なら drain を claim して終了。
//!    claim と判定は同じ lock の中なので、drain は run ごとにちょうど 1 回）
//! 2. RateLimiter::gate() で発行間隔を守る
//! 3. Fetch 実行 → Page を構築（decode / parse）
//! 4. 失敗時は RetryPolicy::decide() で re-push か terminal failure
//! 5. response イベント発火 → outstanding を減らす

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::Crawler;
use super::crawler::panic_message;
use super::page::build_page;
use super::request::build_request;
use crate::domain::{CrawlEvent, CrawlResult, Page, Task};
use crate::error::TaskError;
use crate::queue::{Decision, Next, QueuedTask};

/// Worker group handle.
/// - `join()` waits for every worker to exit (they exit on their own once drained)
/// - dropping the group aborts workers that are still running
pub(crate) struct WorkerGroup {
    joins: Vec<JoinHandle<()>>,
}

impl WorkerGroup {
    /// Spawn `n` workers over the same crawler.
    pub(crate) fn spawn(n: usize, crawler: &Crawler) -> Self {
        let joins = (0..n)
            .map(|worker_id| {
                let crawler = crawler.clone();
                tokio::spawn(async move {
                    worker_loop(worker_id, crawler).await;
                })
            })
            .collect();
        Self { joins }
    }

    pub(crate) async fn join(mut self) {
        for (worker_id, join) in self.joins.iter_mut().enumerate() {
            if let Err(e) = join.await {
                error!(worker_id, error = %e, "worker ended abnormally");
            }
        }
    }
}

impl Drop for WorkerGroup {
    fn drop(&mut self) {
        for join in &self.joins {
            join.abort();
        }
    }
}

async fn worker_loop(worker_id: usize, crawler: Crawler) {
    debug!(worker_id, "worker started");
    let backoff = crawler.config().empty_queue_backoff();

    loop {
        match crawler.inner.queue.next() {
            Next::Drain => {
                info!(worker_id, "queue drained");
                crawler.trigger(CrawlEvent::Drained).await;
                break;
            }
            Next::Exit => break,
            Next::Empty => {
                // 他のワーカーが処理中（retry で戻ってくるかもしれない）なので少し待つ
                tokio::time::sleep(backoff).await;
            }
            Next::Task(queued) => {
                crawler.inner.rate_limiter.gate().await;
                process(worker_id, &crawler, queued).await;
            }
        }
    }

    debug!(worker_id, "worker exit");
}

async fn process(worker_id: usize, crawler: &Crawler, queued: QueuedTask) {
    let QueuedTask { task, attempts } = queued;
    let attempts = attempts + 1;
    info!(worker_id, task_id = %task.id(), uri = task.uri(), attempt = attempts, "start fetching uri");

    // 注入された Fetch / DocumentParser の panic は retry しない失敗として扱う
    let outcome = match AssertUnwindSafe(attempt(crawler, &task)).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(payload) => Err(TaskError::Panicked(panic_message(&*payload))),
    };

    match outcome {
        Ok(page) => {
            debug!(worker_id, uri = task.uri(), status = page.status, bytes = page.body.len(), "fetched");
            finish(crawler, CrawlResult::success(task, attempts, page)).await;
        }
        Err(error) => match crawler.inner.retry_policy.decide(&task, &error) {
            Decision::Retry { retries_left } => {
                warn!(worker_id, uri = task.uri(), retries_left, error = %error, "fetch failed, retrying");
                crawler.inner.queue.requeue(QueuedTask {
                    task: task.with_retries(retries_left),
                    attempts,
                });
            }
            Decision::GiveUp { reason } => {
                warn!(worker_id, uri = task.uri(), attempts, error = %reason, "fetch failed, giving up");
                finish(crawler, CrawlResult::failure(task, attempts, reason)).await;
            }
        },
    }
}

async fn attempt(crawler: &Crawler, task: &Task) -> Result<Page, TaskError> {
    let inner = &crawler.inner;
    let request = build_request(task, &inner.config.headers, inner.config.timeout())?;
    let response = inner.fetcher.fetch(request).await?;
    if let Some(err) = inner.retry_policy.status_failure(response.status) {
        return Err(err.into());
    }
    build_page(response, task, inner.parser.as_deref())
}

async fn finish(crawler: &Crawler, result: CrawlResult) {
    let success = result.is_success();
    crawler.trigger(CrawlEvent::Response(result)).await;
    // handler が follow-up を queue し終わってから減らす（drain の早期発火を防ぐ）
    crawler.inner.queue.complete(success);
}
