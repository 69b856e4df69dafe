//! CrawlerBuilder - 構築と起動時検証
//!
//! 設定値は `build()` でまとめて検証する（fail-fast）。
//! Fetch を渡さなければ HttpFetcher を使う。

use std::sync::Arc;
use std::time::Duration;

use super::{Crawler, CrawlerConfig, QueueOrder};
use crate::error::BuildError;
use crate::impls::HttpFetcher;
use crate::ports::{DocumentParser, Fetch};
use crate::queue::RetryPolicy;

/// Builds a `Crawler`.
///
/// # 使用例
/// ```ignore
/// let crawler = CrawlerBuilder::new()
///     .max_connections(2)
///     .rate_limit(2.0)
///     .parser(LinkParser::new())
///     .build()?;
/// ```
///
/// # Fail-fast
/// `build()` validates the configuration (pool size, rate, encoding label)
/// so a bad setup is reported before any worker starts.
pub struct CrawlerBuilder {
    config: CrawlerConfig,
    fetcher: Option<Arc<dyn Fetch>>,
    parser: Option<Arc<dyn DocumentParser>>,
    retry_policy: RetryPolicy,
}

impl CrawlerBuilder {
    pub fn new() -> Self {
        Self {
            config: CrawlerConfig::default(),
            fetcher: None,
            parser: None,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Replace the whole configuration (e.g. one loaded from JSON).
    pub fn config(mut self, config: CrawlerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_connections(mut self, n: usize) -> Self {
        self.config.max_connections = n;
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.config.retries = retries;
        self
    }

    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.config.encoding = encoding.into();
        self
    }

    /// Fetch issues per second across all workers; 0 disables.
    pub fn rate_limit(mut self, per_second: f64) -> Self {
        self.config.rate_limit = per_second;
        self
    }

    pub fn parse_document(mut self, parse: bool) -> Self {
        self.config.parse_document = parse;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.headers.insert(name.into(), value.into());
        self
    }

    pub fn queue_order(mut self, order: QueueOrder) -> Self {
        self.config.queue_order = order;
        self
    }

    pub fn empty_queue_backoff(mut self, backoff: Duration) -> Self {
        self.config.empty_queue_backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Transport to use. Defaults to `HttpFetcher`.
    pub fn fetcher(mut self, fetcher: impl Fetch + 'static) -> Self {
        self.fetcher = Some(Arc::new(fetcher));
        self
    }

    pub fn parser(mut self, parser: impl DocumentParser + 'static) -> Self {
        self.parser = Some(Arc::new(parser));
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn build(self) -> Result<Crawler, BuildError> {
        self.config.validate()?;

        let fetcher = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(HttpFetcher::new().map_err(|e| BuildError::HttpClient(e.to_string()))?),
        };

        Ok(Crawler::from_parts(
            self.config,
            fetcher,
            self.parser,
            self.retry_policy,
        ))
    }
}

impl Default for CrawlerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Crawler {
    /// Crawler with the given configuration and the default HTTP transport.
    pub fn new(config: CrawlerConfig) -> Result<Self, BuildError> {
        CrawlerBuilder::new().config(config).build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubFetcher;

    #[test]
    fn build_success() {
        let crawler = CrawlerBuilder::new()
            .fetcher(StubFetcher::ok())
            .max_connections(4)
            .rate_limit(2.0)
            .timeout(Duration::from_secs(30))
            .header("User-Agent", "trawl")
            .build()
            .unwrap();

        let config = crawler.config();
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.rate_limit, 2.0);
        assert_eq!(config.timeout_ms, Some(30_000));
        assert_eq!(config.headers.get("User-Agent").map(String::as_str), Some("trawl"));
    }

    #[test]
    fn build_rejects_zero_connections() {
        let result = CrawlerBuilder::new()
            .fetcher(StubFetcher::ok())
            .max_connections(0)
            .build();
        assert!(matches!(result, Err(BuildError::InvalidMaxConnections)));
    }

    #[test]
    fn build_rejects_unknown_default_encoding() {
        let result = CrawlerBuilder::new()
            .fetcher(StubFetcher::ok())
            .encoding("not-a-charset")
            .build();
        assert!(matches!(result, Err(BuildError::UnknownEncoding(_))));
    }

    #[test]
    fn tiny_rate_limit_builds_with_clamped_spacing() {
        let crawler = CrawlerBuilder::new()
            .fetcher(StubFetcher::ok())
            .rate_limit(1e-20)
            .build()
            .unwrap();
        assert_eq!(crawler.inner.rate_limiter.span(), Some(crate::queue::MAX_SPAN));
    }

    #[test]
    fn build_with_default_http_transport() {
        let crawler = Crawler::new(CrawlerConfig::default());
        assert!(crawler.is_ok());
    }
}
