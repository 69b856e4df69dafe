//! Fetch port - 通信の抽象化
//!
//! スケジューラ自身は HTTP を話さない。FetchRequest を注入された Fetch に渡し、
//! 失敗したときは `FetchError::is_retryable` だけを見る。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::HttpMethod;

/// A fully shaped outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub uri: String,
    pub method: HttpMethod,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
    /// Per-call override; `None` means the transport's own default.
    pub timeout: Option<Duration>,
}

impl FetchRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transport error: {0}")]
    Transport(String),

    /// The request could not be built (bad URI, bad header, ...).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The response status matched the retry policy's status predicate.
    #[error("unexpected status {0}")]
    Status(u16),
}

impl FetchError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FetchError::InvalidRequest(_))
    }
}

#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, FetchError>;
}

#[async_trait]
impl<T: Fetch + ?Sized> Fetch for Arc<T> {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, FetchError> {
        (**self).fetch(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::timeout(FetchError::Timeout, true)]
    #[case::connect(FetchError::Connect("refused".into()), true)]
    #[case::transport(FetchError::Transport("reset".into()), true)]
    #[case::status(FetchError::Status(503), true)]
    #[case::invalid(FetchError::InvalidRequest("bad uri".into()), false)]
    fn retryable_classification(#[case] error: FetchError, #[case] retryable: bool) {
        assert_eq!(error.is_retryable(), retryable);
    }

    #[test]
    fn request_header_lookup_ignores_case() {
        let req = FetchRequest {
            uri: "https://example.com/".to_string(),
            method: HttpMethod::Get,
            headers: vec![("User-Agent".to_string(), "trawl".to_string())],
            body: None,
            timeout: None,
        };
        assert_eq!(req.header("user-agent"), Some("trawl"));
    }
}
