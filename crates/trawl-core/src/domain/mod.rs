//! Domain - ドメインモデル
//!
//! - **task**: TaskSpec（呼び出し側が渡す形）と Task（worker が実行する形）
//! - **result**: Page / CrawlResult
//! - **event**: EventKind / CrawlEvent
//! - **ids**: TaskId

pub mod event;
pub mod ids;
pub mod result;
pub mod task;

pub use event::{CrawlEvent, EventKind, UnknownEvent};
pub use ids::TaskId;
pub use result::{CrawlOutcome, CrawlResult, Document, Page};
pub use task::{Body, HttpMethod, Metadata, Task, TaskSpec};
pub(crate) use task::TaskDefaults;
