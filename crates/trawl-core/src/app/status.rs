//! RunStats - run ごとのカウンタ
//!
//! `run()` の開始時にリセットされ、終了時に返される。

use serde::{Deserialize, Serialize};

/// Counters for one `Crawler::run`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Logical tasks that ended with a page.
    pub succeeded: usize,
    /// Logical tasks that ended with a terminal failure.
    pub failed: usize,
    /// Fetch attempts issued (first tries + retries).
    pub attempts: usize,
    /// Failed attempts that were put back into the queue.
    pub retries: usize,
}

impl RunStats {
    pub fn completed(&self) -> usize {
        self.succeeded + self.failed
    }
}
