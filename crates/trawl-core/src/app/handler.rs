//! Event handlers.
//!
//! `on_response` / `on_drain` のクロージャも、直接実装した `EventHandler` も、
//! EventKind ごとに 1 つだけ保持する（後から登録したものが勝つ）。

use async_trait::async_trait;

use super::Crawler;
use crate::domain::{CrawlEvent, CrawlResult};
use crate::error::HandlerError;

/// Receives routed events. Implement this directly when the handler needs
/// to await (e.g. an extra request per response).
///
/// The `crawler` argument is the running crawler itself; call
/// `crawler.queue(...)` from a `Response` handler to add follow-up work.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &CrawlEvent, crawler: &Crawler) -> Result<(), HandlerError>;
}

pub(crate) struct ResponseFn<F>(pub F);

#[async_trait]
impl<F> EventHandler for ResponseFn<F>
where
    F: Fn(&CrawlResult, &Crawler) -> Result<(), HandlerError> + Send + Sync,
{
    async fn handle(&self, event: &CrawlEvent, crawler: &Crawler) -> Result<(), HandlerError> {
        match event {
            CrawlEvent::Response(result) => (self.0)(result, crawler),
            CrawlEvent::Drained => Ok(()),
        }
    }
}

pub(crate) struct DrainFn<F>(pub F);

#[async_trait]
impl<F> EventHandler for DrainFn<F>
where
    F: Fn() -> Result<(), HandlerError> + Send + Sync,
{
    async fn handle(&self, event: &CrawlEvent, _crawler: &Crawler) -> Result<(), HandlerError> {
        match event {
            CrawlEvent::Drained => (self.0)(),
            CrawlEvent::Response(_) => Ok(()),
        }
    }
}
