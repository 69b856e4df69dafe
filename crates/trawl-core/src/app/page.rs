//! Page construction - FetchResponse → Page
//!
//! - task の encoding から UTF-8 に decode する（不正なバイト列は置換）
//! - `parse_document` が true なら DocumentParser を通す
//! - parse の失敗は warn を出して document なしにする（task は成功のまま）

use chrono::Utc;
use encoding_rs::Encoding;
use tracing::{debug, warn};

use crate::domain::{Page, Task};
use crate::error::TaskError;
use crate::ports::{DocumentParser, FetchResponse};

pub(crate) fn build_page(
    response: FetchResponse,
    task: &Task,
    parser: Option<&dyn DocumentParser>,
) -> Result<Page, TaskError> {
    let text = decode_body(&response.body, task.encoding())?;

    let document = match (task.parse_document(), parser) {
        (false, _) => None,
        (true, None) => {
            warn!(uri = task.uri(), "parse requested but no document parser is configured");
            None
        }
        (true, Some(parser)) => match parser.parse(&text, task) {
            Ok(doc) => Some(doc),
            Err(e) => {
                warn!(uri = task.uri(), error = %e, "document parse failed");
                None
            }
        },
    };

    Ok(Page {
        status: response.status,
        headers: response.headers,
        body: response.body,
        text,
        document,
        fetched_at: Utc::now(),
    })
}

/// Decode `body` from the encoding named by `label` into UTF-8.
/// Malformed sequences become U+FFFD; an unknown label is an error.
pub(crate) fn decode_body(body: &[u8], label: &str) -> Result<String, TaskError> {
    let encoding = Encoding::for_label(label.as_bytes())
        .ok_or_else(|| TaskError::UnsupportedEncoding(label.to_string()))?;
    let (text, _, had_errors) = encoding.decode(body);
    if had_errors {
        debug!(encoding = encoding.name(), "body contained malformed sequences");
    }
    Ok(text.into_owned())
}
