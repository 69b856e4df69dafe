//! trawl-core
//!
//! Bounded-concurrency fetch scheduler.
//!
//! タスク（URI + リクエストオプション + 呼び出し側のメタデータ）を queue に積むと、
//! 固定数の worker がグローバルな rate limit の下で取得し、失敗は task ごとの回数まで retry する。
//! 論理タスクごとに `response` イベントがちょうど 1 回、すべて終わると `drain` が 1 回発火する。
//!
//! # モジュール構成
//! - **domain**: Task / Page / CrawlResult / イベント
//! - **ports**: 抽象化レイヤー（Fetch, DocumentParser）
//! - **queue**: TaskQueue, RateLimiter, RetryPolicy
//! - **app**: Crawler, CrawlerBuilder, worker loop
//! - **impls**: HttpFetcher, LinkParser
//! - **error**: エラー型

pub mod app;
pub mod domain;
pub mod error;
pub mod impls;
pub mod ports;
pub mod queue;

#[cfg(test)]
mod testing;

pub use app::{Crawler, CrawlerBuilder, CrawlerConfig, EventHandler, QueueOrder, RunStats};
pub use domain::{
    Body, CrawlEvent, CrawlOutcome, CrawlResult, Document, EventKind, HttpMethod, Metadata, Page,
    Task, TaskId, TaskSpec,
};
pub use error::{BuildError, CrawlError, HandlerError, TaskError};
pub use impls::{HttpFetcher, LinkDocument, LinkParser};
pub use ports::{DocumentParser, Fetch, FetchError, FetchRequest, FetchResponse, ParseError};
pub use queue::{RateLimiter, RetryPolicy};
