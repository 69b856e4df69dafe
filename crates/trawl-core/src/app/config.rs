//! CrawlerConfig - crawler 全体の設定
//!
//! serde で JSON から読める。省略したフィールドは既定値になる。
//! Fetch / DocumentParser / status predicate のようにシリアライズできないものは
//! CrawlerBuilder で渡す。

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::TaskDefaults;
use crate::error::BuildError;

/// Which pending task a worker picks next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueOrder {
    /// Newest first. Follow-up links are crawled depth-first.
    #[default]
    Lifo,
    /// Oldest first. Breadth-first crawling.
    Fifo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Worker pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Default retry budget per task.
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Default source encoding of response bodies.
    #[serde(default = "default_encoding")]
    pub encoding: String,

    /// Max fetch issues per second across all workers; 0 disables.
    #[serde(default)]
    pub rate_limit: f64,

    /// Default for the per-task parse flag.
    #[serde(default)]
    pub parse_document: bool,

    /// Default per-request timeout in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Headers merged into every request; per-task headers win.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(default)]
    pub queue_order: QueueOrder,

    /// How long an idle worker waits before looking at the queue again.
    #[serde(default = "default_empty_queue_backoff_ms")]
    pub empty_queue_backoff_ms: u64,
}

fn default_max_connections() -> usize {
    1
}

fn default_retries() -> u32 {
    3
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

fn default_empty_queue_backoff_ms() -> u64 {
    100
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            retries: default_retries(),
            encoding: default_encoding(),
            rate_limit: 0.0,
            parse_document: false,
            timeout_ms: None,
            headers: BTreeMap::new(),
            queue_order: QueueOrder::default(),
            empty_queue_backoff_ms: default_empty_queue_backoff_ms(),
        }
    }
}

impl CrawlerConfig {
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn empty_queue_backoff(&self) -> Duration {
        Duration::from_millis(self.empty_queue_backoff_ms)
    }

    pub fn validate(&self) -> Result<(), BuildError> {
        if self.max_connections == 0 {
            return Err(BuildError::InvalidMaxConnections);
        }
        if !self.rate_limit.is_finite() || self.rate_limit < 0.0 {
            return Err(BuildError::InvalidRateLimit(self.rate_limit));
        }
        if encoding_rs::Encoding::for_label(self.encoding.as_bytes()).is_none() {
            return Err(BuildError::UnknownEncoding(self.encoding.clone()));
        }
        Ok(())
    }

    pub(crate) fn task_defaults(&self) -> TaskDefaults {
        TaskDefaults {
            retries: self.retries,
            encoding: self.encoding.clone(),
            parse_document: self.parse_document,
        }
    }
}
