//! Queue - タスクキュー、rate limiter、retry policy

mod rate_limit;
mod retry;
mod task_queue;

pub use rate_limit::{MAX_SPAN, RateLimiter};
pub use retry::{Decision, RetryPolicy, StatusPredicate};
pub use task_queue::{QueuedTask, TaskQueue};
pub(crate) use task_queue::Next;
