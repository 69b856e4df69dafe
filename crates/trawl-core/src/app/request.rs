//! Request shaping - Task + 既定値 → FetchRequest
//!
//! - ヘッダは既定値を task のもので上書きする（名前の大文字小文字は区別しない）
//! - `Body::Fields` は Content-Type が JSON なら JSON、それ以外は form-urlencoded
//! - timeout は task の値、なければ設定の既定値

use std::collections::BTreeMap;
use std::time::Duration;

use bytes::Bytes;
use serde_json::Value;
use url::form_urlencoded;

use crate::domain::{Body, Metadata, Task};
use crate::ports::{FetchError, FetchRequest};

const CONTENT_TYPE: &str = "Content-Type";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

pub(crate) fn build_request(
    task: &Task,
    default_headers: &BTreeMap<String, String>,
    default_timeout: Option<Duration>,
) -> Result<FetchRequest, FetchError> {
    let mut headers: Vec<(String, String)> = Vec::new();
    for (name, value) in default_headers.iter().chain(task.headers()) {
        set_header(&mut headers, name, value);
    }

    let body = match task.body() {
        None => None,
        Some(Body::Raw(bytes)) => Some(bytes.clone()),
        Some(Body::Fields(fields)) => {
            let is_json = header(&headers, CONTENT_TYPE)
                .is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"));
            if is_json {
                let encoded = serde_json::to_vec(fields)
                    .map_err(|e| FetchError::InvalidRequest(format!("json body: {e}")))?;
                Some(Bytes::from(encoded))
            } else {
                set_header(&mut headers, CONTENT_TYPE, FORM_CONTENT_TYPE);
                Some(Bytes::from(encode_form(fields)))
            }
        }
    };

    Ok(FetchRequest {
        uri: task.uri().to_string(),
        method: task.method(),
        headers,
        body,
        timeout: task.timeout().or(default_timeout),
    })
}

/// Insert or replace a header, matching names case-insensitively.
fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    headers.push((name.to_string(), value.to_string()));
}

fn header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Form-encode fields. Nested values use bracket keys: `a[]=1&a[]=2`, `o[k]=v`.
fn encode_form(fields: &Metadata) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in fields {
        append_form_value(&mut serializer, key, value);
    }
    serializer.finish()
}

fn append_form_value(serializer: &mut form_urlencoded::Serializer<'_, String>, key: &str, value: &Value) {
    match value {
        Value::Null => {
            serializer.append_pair(key, "");
        }
        Value::Bool(b) => {
            serializer.append_pair(key, if *b { "1" } else { "0" });
        }
        Value::Number(n) => {
            serializer.append_pair(key, &n.to_string());
        }
        Value::String(s) => {
            serializer.append_pair(key, s);
        }
        Value::Array(items) => {
            let nested = format!("{key}[]");
            for item in items {
                append_form_value(serializer, &nested, item);
            }
        }
        Value::Object(map) => {
            for (sub, item) in map {
                append_form_value(serializer, &format!("{key}[{sub}]"), item);
            }
        }
    }
}
