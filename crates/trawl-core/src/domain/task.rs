//! Task model.
//!
//! - **TaskSpec**: 呼び出し側が queue に渡す形。`uri` 以外は省略できる
//! - **Task**: 既定値を埋めた実行用の形。変わるのは残り retry 回数だけ

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::TaskId;

/// Caller-defined fields carried verbatim from the `TaskSpec` into the result.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request body.
///
/// - `Raw`: sent as-is.
/// - `Fields`: encoded when the request is built (JSON or form-urlencoded,
///   depending on the effective `Content-Type`).
///
/// In JSON a string deserializes to `Raw`, an object to `Fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "BodyRepr", into = "BodyRepr")]
pub enum Body {
    Raw(Bytes),
    Fields(Metadata),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum BodyRepr {
    Text(String),
    Fields(Metadata),
}

impl From<BodyRepr> for Body {
    fn from(repr: BodyRepr) -> Self {
        match repr {
            BodyRepr::Text(text) => Body::Raw(Bytes::from(text)),
            BodyRepr::Fields(fields) => Body::Fields(fields),
        }
    }
}

impl From<Body> for BodyRepr {
    fn from(body: Body) -> Self {
        match body {
            Body::Raw(bytes) => BodyRepr::Text(String::from_utf8_lossy(&bytes).into_owned()),
            Body::Fields(fields) => BodyRepr::Fields(fields),
        }
    }
}

/// What the caller submits to `Crawler::queue`.
///
/// Every field except `uri` is optional; missing ones are filled from the
/// crawler configuration. Unknown keys in JSON land in `metadata`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub uri: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<HttpMethod>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Body>,

    /// Per-task timeout override in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_document: Option<bool>,

    #[serde(flatten)]
    pub metadata: Metadata,
}

impl TaskSpec {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Self::default()
        }
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    /// Structured body; encoded as JSON or form data when the request is built.
    pub fn fields(self, fields: Metadata) -> Self {
        self.body(Body::Fields(fields))
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    pub fn parse_document(mut self, parse: bool) -> Self {
        self.parse_document = Some(parse);
        self
    }

    /// Attach a metadata field (e.g. `"kind": "detail_page"`).
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Resolve missing fields against the crawler defaults.
    pub(crate) fn into_task(self, defaults: &TaskDefaults) -> Task {
        Task {
            id: TaskId::generate(),
            uri: self.uri,
            method: self.method.unwrap_or_default(),
            headers: self.headers,
            body: self.body,
            timeout: self.timeout_ms.map(Duration::from_millis),
            retries: self.retries.unwrap_or(defaults.retries),
            encoding: self.encoding.unwrap_or_else(|| defaults.encoding.clone()),
            parse_document: self.parse_document.unwrap_or(defaults.parse_document),
            metadata: self.metadata,
        }
    }
}

impl From<&str> for TaskSpec {
    fn from(uri: &str) -> Self {
        Self::new(uri)
    }
}

impl From<String> for TaskSpec {
    fn from(uri: String) -> Self {
        Self::new(uri)
    }
}

/// Crawler-wide values applied to fields a `TaskSpec` leaves unset.
#[derive(Debug, Clone)]
pub(crate) struct TaskDefaults {
    pub retries: u32,
    pub encoding: String,
    pub parse_document: bool,
}

/// A resolved task.
///
/// Immutable once queued, except for the remaining retry budget which a
/// retry re-push lowers by one.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    id: TaskId,
    uri: String,
    method: HttpMethod,
    headers: BTreeMap<String, String>,
    body: Option<Body>,
    timeout: Option<Duration>,
    retries: u32,
    encoding: String,
    parse_document: bool,
    metadata: Metadata,
}

impl Task {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Retries left for this logical task.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    pub fn parse_document(&self) -> bool {
        self.parse_document
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Shortcut for `metadata().get(key)`.
    pub fn meta(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }

    /// Same logical task with a lower retry budget.
    pub(crate) fn with_retries(mut self, retries: u32) -> Self {
        debug_assert!(retries < self.retries, "retry budget must only decrease");
        self.retries = retries;
        self
    }
}
