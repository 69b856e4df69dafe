//! Errors - crate のエラー型
//!
//! - **CrawlError**: `run()` の失敗
//! - **BuildError**: 設定の検証
//! - **TaskError**: 1 回の attempt の失敗
//! - **HandlerError**: イベントハンドラの戻り値（ログに出すだけで伝播しない）

use thiserror::Error;

use crate::ports::FetchError;

/// Errors returned by `Crawler::run`.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("crawler is already running")]
    AlreadyRunning,
}

/// Configuration rejected by `CrawlerBuilder::build`.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("max_connections must be at least 1")]
    InvalidMaxConnections,

    #[error("rate_limit must be a finite number >= 0, got {0}")]
    InvalidRateLimit(f64),

    #[error("unknown encoding label: {0}")]
    UnknownEncoding(String),

    #[error("could not build http client: {0}")]
    HttpClient(String),
}

/// Why a single attempt of a task did not produce a page.
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// The injected fetcher or parser panicked.
    #[error("attempt panicked: {0}")]
    Panicked(String),
}

impl TaskError {
    /// Only transport-level failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            TaskError::Fetch(err) => err.is_retryable(),
            TaskError::UnsupportedEncoding(_) | TaskError::Panicked(_) => false,
        }
    }
}

/// Returned by event handlers. Logged at the trigger boundary, never propagated.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    pub fn msg(message: impl Into<String>) -> Self {
        HandlerError::Message(message.into())
    }
}
