//! Results - 論理タスクごとにちょうど 1 つの CrawlResult
//!
//! retry の途中経過は result にならない。最後の成功か失敗だけが届く。

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use super::{Metadata, Task};

/// Parser output, type-erased. Use `Page::document::<T>()` to get it back.
pub type Document = Arc<dyn Any + Send + Sync>;

/// A successfully fetched response.
#[derive(Clone)]
pub struct Page {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    /// Raw body as received.
    pub body: Bytes,
    /// Body decoded from the task's encoding into UTF-8.
    pub text: String,
    /// Set when the task asked for parsing and the parser succeeded.
    pub document: Option<Document>,
    pub fetched_at: DateTime<Utc>,
}

impl Page {
    /// First header value with this name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn document<T: Any>(&self) -> Option<&T> {
        self.document.as_deref().and_then(|doc| doc.downcast_ref::<T>())
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .field("document", &self.document.is_some())
            .field("fetched_at", &self.fetched_at)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum CrawlOutcome {
    Success(Page),
    /// Terminal failure: retries exhausted or the error was not retryable.
    Failure { error: String },
}

/// What a `response` event carries.
#[derive(Debug, Clone)]
pub struct CrawlResult {
    /// The originating task (retry budget as of the last attempt).
    pub task: Task,
    /// Number of fetches performed for this logical task.
    pub attempts: u32,
    pub outcome: CrawlOutcome,
}

impl CrawlResult {
    pub(crate) fn success(task: Task, attempts: u32, page: Page) -> Self {
        Self {
            task,
            attempts,
            outcome: CrawlOutcome::Success(page),
        }
    }

    pub(crate) fn failure(task: Task, attempts: u32, error: impl Into<String>) -> Self {
        Self {
            task,
            attempts,
            outcome: CrawlOutcome::Failure {
                error: error.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, CrawlOutcome::Success(_))
    }

    pub fn page(&self) -> Option<&Page> {
        match &self.outcome {
            CrawlOutcome::Success(page) => Some(page),
            CrawlOutcome::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            CrawlOutcome::Success(_) => None,
            CrawlOutcome::Failure { error } => Some(error),
        }
    }

    pub fn metadata(&self) -> &Metadata {
        self.task.metadata()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::{TaskDefaults, TaskSpec};

    fn task() -> Task {
        TaskSpec::new("https://example.com/")
            .meta("kind", "index")
            .into_task(&TaskDefaults {
                retries: 0,
                encoding: "utf-8".to_string(),
                parse_document: false,
            })
    }

    fn page(document: Option<Document>) -> Page {
        Page {
            status: 200,
            headers: vec![("Content-Type".to_string(), "text/html".to_string())],
            body: Bytes::from_static(b"<html></html>"),
            text: "<html></html>".to_string(),
            document,
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn header_lookup_ignores_case() {
        let p = page(None);
        assert_eq!(p.header("content-type"), Some("text/html"));
        assert_eq!(p.header("x-missing"), None);
    }

    #[test]
    fn document_downcasts_to_parser_type() {
        let p = page(Some(Arc::new(vec!["a".to_string()])));
        assert_eq!(p.document::<Vec<String>>().map(Vec::len), Some(1));
        assert!(p.document::<u32>().is_none());
    }

    #[test]
    fn success_and_failure_accessors() {
        let ok = CrawlResult::success(task(), 1, page(None));
        assert!(ok.is_success());
        assert_eq!(ok.page().map(|p| p.status), Some(200));
        assert!(ok.error().is_none());
        assert_eq!(ok.metadata()["kind"], "index");

        let failed = CrawlResult::failure(task(), 4, "connection refused");
        assert!(!failed.is_success());
        assert!(failed.page().is_none());
        assert_eq!(failed.error(), Some("connection refused"));
        assert_eq!(failed.attempts, 4);
    }
}
