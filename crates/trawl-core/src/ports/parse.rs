//! DocumentParser port - decode 済みの body を扱いやすい形にする

use std::sync::Arc;

use crate::domain::{Document, Task};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("parse failed: {0}")]
pub struct ParseError(pub String);

/// Parse capability. Runs only for tasks whose `parse_document` flag is set.
pub trait DocumentParser: Send + Sync {
    fn parse(&self, text: &str, task: &Task) -> Result<Document, ParseError>;
}

impl<T: DocumentParser + ?Sized> DocumentParser for Arc<T> {
    fn parse(&self, text: &str, task: &Task) -> Result<Document, ParseError> {
        (**self).parse(text, task)
    }
}
