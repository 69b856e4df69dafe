//! TaskQueue - pending タスク + outstanding カウンタ + drain フラグ
//!
//! rate limiter 以外で worker 間に共有する状態は、すべてここの 1 つの Mutex の中にある。
//! lock を持ったまま `.await` しない。

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::error;

use crate::app::{QueueOrder, RunStats};
use crate::domain::Task;

/// A task waiting in the queue, with the number of fetches already spent on it.
#[derive(Debug, Clone)]
pub struct QueuedTask {
    pub task: Task,
    pub attempts: u32,
}

/// What a worker should do next.
#[derive(Debug)]
pub(crate) enum Next {
    Task(QueuedTask),
    /// Work is outstanding but nothing is pending (in flight elsewhere).
    Empty,
    /// Outstanding counter hit zero and this caller claimed the drain event.
    Drain,
    /// Drain was already claimed this run; the worker should stop.
    Exit,
}

struct QueueState {
    pending: VecDeque<QueuedTask>,

    /// Logical tasks queued but not yet terminally resolved.
    outstanding: usize,

    /// Set once per run when the drain event is claimed.
    drain_fired: bool,

    stats: RunStats,
}

pub struct TaskQueue {
    order: QueueOrder,
    state: Mutex<QueueState>,
}

impl TaskQueue {
    pub fn new(order: QueueOrder) -> Self {
        Self {
            order,
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                outstanding: 0,
                drain_fired: false,
                stats: RunStats::default(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // この lock の中ではユーザーコードを実行しないので、poison されても状態は壊れていない
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a brand-new logical task.
    pub fn push(&self, task: Task) {
        let mut state = self.lock();
        state.outstanding += 1;
        state.pending.push_back(QueuedTask { task, attempts: 0 });
    }

    /// Put a failed task back for another attempt. Same logical task, so the
    /// outstanding counter is left alone.
    pub(crate) fn requeue(&self, queued: QueuedTask) {
        let mut state = self.lock();
        state.stats.retries += 1;
        state.pending.push_back(queued);
    }

    /// Remove one pending task; LIFO or FIFO depending on the configured order.
    pub fn pop(&self) -> Option<QueuedTask> {
        let mut state = self.lock();
        self.pop_locked(&mut state)
    }

    fn pop_locked(&self, state: &mut QueueState) -> Option<QueuedTask> {
        let popped = match self.order {
            QueueOrder::Lifo => state.pending.pop_back(),
            QueueOrder::Fifo => state.pending.pop_front(),
        };
        if popped.is_some() {
            state.stats.attempts += 1;
        }
        popped
    }

    /// Drain check, drain claim and pop under one lock. Exactly one caller
    /// per run gets `Drain`; once it has, every caller gets `Exit` and tasks
    /// queued afterwards wait for the next run.
    pub(crate) fn next(&self) -> Next {
        let mut state = self.lock();
        if state.drain_fired {
            return Next::Exit;
        }
        if state.outstanding == 0 {
            state.drain_fired = true;
            return Next::Drain;
        }
        match self.pop_locked(&mut state) {
            Some(queued) => Next::Task(queued),
            None => Next::Empty,
        }
    }

    pub fn is_drained(&self) -> bool {
        self.lock().outstanding == 0
    }

    pub fn outstanding(&self) -> usize {
        self.lock().outstanding
    }

    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    /// A logical task produced its terminal result.
    pub(crate) fn complete(&self, success: bool) {
        let mut state = self.lock();
        if state.outstanding == 0 {
            error!("task completed with no outstanding tasks; ignoring");
            return;
        }
        state.outstanding -= 1;
        if success {
            state.stats.succeeded += 1;
        } else {
            state.stats.failed += 1;
        }
    }

    /// Reset per-run bookkeeping (drain flag, stats). Pending tasks stay.
    pub(crate) fn begin_run(&self) {
        let mut state = self.lock();
        state.drain_fired = false;
        state.stats = RunStats::default();
    }

    pub fn stats(&self) -> RunStats {
        self.lock().stats
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::{TaskDefaults, TaskSpec};

    fn task(uri: &str) -> Task {
        TaskSpec::new(uri).into_task(&TaskDefaults {
            retries: 1,
            encoding: "utf-8".to_string(),
            parse_document: false,
        })
    }

    #[test]
    fn lifo_serves_newest_first() {
        let q = TaskQueue::new(QueueOrder::Lifo);
        q.push(task("a"));
        q.push(task("b"));
        q.push(task("c"));

        let order: Vec<String> = std::iter::from_fn(|| q.pop())
            .map(|qt| qt.task.uri().to_string())
            .collect();
        assert_eq!(order, vec!["c", "b", "a"]);
    }

    #[test]
    fn fifo_serves_oldest_first() {
        let q = TaskQueue::new(QueueOrder::Fifo);
        q.push(task("a"));
        q.push(task("b"));

        assert_eq!(q.pop().unwrap().task.uri(), "a");
        assert_eq!(q.pop().unwrap().task.uri(), "b");
        assert!(q.pop().is_none());
    }

    #[test]
    fn requeue_does_not_count_as_new_work() {
        let q = TaskQueue::new(QueueOrder::Lifo);
        q.push(task("a"));
        assert_eq!(q.outstanding(), 1);

        let mut queued = q.pop().unwrap();
        queued.attempts += 1;
        q.requeue(queued);

        assert_eq!(q.outstanding(), 1);
        assert_eq!(q.pending_len(), 1);
        assert_eq!(q.pop().unwrap().attempts, 1);

        let stats = q.stats();
        assert_eq!(stats.retries, 1);
        assert_eq!(stats.attempts, 2);
    }

    #[test]
    fn drained_only_after_every_task_completes() {
        let q = TaskQueue::new(QueueOrder::Lifo);
        assert!(q.is_drained());

        q.push(task("a"));
        q.push(task("b"));
        assert!(!q.is_drained());

        q.pop();
        q.complete(true);
        assert!(!q.is_drained());

        // 両方 pop 済みでも、完了するまでは drained ではない
        q.pop();
        assert!(matches!(q.next(), Next::Empty));
        q.complete(false);
        assert!(q.is_drained());
        assert!(matches!(q.next(), Next::Drain));

        let stats = q.stats();
        assert_eq!((stats.succeeded, stats.failed), (1, 1));
    }

    #[test]
    fn tasks_pushed_after_drain_wait_for_next_run() {
        let q = TaskQueue::new(QueueOrder::Lifo);
        assert!(matches!(q.next(), Next::Drain));

        // claim 直後に外から push されても、この run では拾わない
        q.push(task("late"));
        assert!(matches!(q.next(), Next::Exit));
        assert_eq!(q.pending_len(), 1);
        assert_eq!(q.outstanding(), 1);

        q.begin_run();
        assert!(matches!(q.next(), Next::Task(_)));
    }

    #[test]
    fn complete_never_underflows() {
        let q = TaskQueue::new(QueueOrder::Lifo);
        q.complete(true);
        assert_eq!(q.outstanding(), 0);
        assert_eq!(q.stats().succeeded, 0);
    }

    #[test]
    fn drain_is_claimed_once_per_run() {
        let q = TaskQueue::new(QueueOrder::Lifo);
        assert!(matches!(q.next(), Next::Drain));
        assert!(matches!(q.next(), Next::Exit));

        q.begin_run();
        q.push(task("a"));
        assert!(matches!(q.next(), Next::Task(_)));
        assert!(matches!(q.next(), Next::Empty));
        q.complete(true);
        assert!(matches!(q.next(), Next::Drain));
        assert!(matches!(q.next(), Next::Exit));
    }

    #[test]
    fn concurrent_callers_claim_drain_exactly_once() {
        let q = Arc::new(TaskQueue::new(QueueOrder::Lifo));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let q = Arc::clone(&q);
                std::thread::spawn(move || matches!(q.next(), Next::Drain))
            })
            .collect();
        let fired = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|fired| *fired)
            .count();
        assert_eq!(fired, 1);
    }

    #[test]
    fn concurrent_push_and_complete_balance() {
        let q = Arc::new(TaskQueue::new(QueueOrder::Fifo));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let q = Arc::clone(&q);
                std::thread::spawn(move || {
                    for j in 0..50 {
                        q.push(task(&format!("t{i}-{j}")));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(q.outstanding(), 200);

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let q = Arc::clone(&q);
                std::thread::spawn(move || {
                    while q.pop().is_some() {
                        q.complete(true);
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }
        assert!(q.is_drained());
        assert_eq!(q.stats().succeeded, 200);
    }
}
