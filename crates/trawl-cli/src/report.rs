//! Reporter - response の表示とリンク追跡
//!
//! - response ごとに 1 行（`--json` なら JSON オブジェクト 1 つ）を出す
//! - `--follow` のときは LinkDocument のリンクを depth メタデータ付きで queue する
//! - 同じ URI は seen-set で 1 回だけ queue する

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use trawl_core::{CrawlEvent, CrawlResult, Crawler, EventHandler, HandlerError, LinkDocument, TaskSpec};

/// Metadata key carrying how many links away from a seed a task is.
pub const DEPTH_KEY: &str = "depth";

#[derive(Debug, Clone, Copy)]
pub struct FollowPolicy {
    pub max_depth: u32,
    pub same_host: bool,
}

/// Prints each response and, when following, queues unseen links.
pub struct Reporter {
    follow: Option<FollowPolicy>,
    json: bool,
    seen: Mutex<HashSet<String>>,
}

#[derive(Serialize)]
struct ResponseLine<'a> {
    uri: &'a str,
    ok: bool,
    status: Option<u16>,
    bytes: Option<usize>,
    title: Option<&'a str>,
    attempts: u32,
    error: Option<&'a str>,
}

impl Reporter {
    pub fn new(follow: Option<FollowPolicy>, json: bool) -> Self {
        Self {
            follow,
            json,
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// Returns false when the URI was already seen.
    pub fn mark_seen(&self, uri: &str) -> bool {
        self.seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(uri.to_string())
    }

    fn print(&self, result: &CrawlResult) {
        let page = result.page();
        let title = page
            .and_then(|p| p.document::<LinkDocument>())
            .and_then(|doc| doc.title.as_deref());

        if self.json {
            let line = ResponseLine {
                uri: result.task.uri(),
                ok: result.is_success(),
                status: page.map(|p| p.status),
                bytes: page.map(|p| p.body.len()),
                title,
                attempts: result.attempts,
                error: result.error(),
            };
            match serde_json::to_string(&line) {
                Ok(json) => println!("{json}"),
                Err(e) => warn!(error = %e, "failed to encode response line"),
            }
            return;
        }

        match (page, result.error()) {
            (Some(page), _) => println!(
                "{} {} {}B{}",
                page.status,
                result.task.uri(),
                page.body.len(),
                title.map(|t| format!(" \"{t}\"")).unwrap_or_default()
            ),
            (None, error) => println!(
                "ERR {} ({} attempts): {}",
                result.task.uri(),
                result.attempts,
                error.unwrap_or("unknown error")
            ),
        }
    }

    fn follow_links(&self, result: &CrawlResult, crawler: &Crawler) {
        let Some(policy) = self.follow else { return };
        let Some(doc) = result.page().and_then(|p| p.document::<LinkDocument>()) else {
            return;
        };
        let depth = result
            .task
            .meta(DEPTH_KEY)
            .and_then(|v| v.as_u64())
            .and_then(|d| u32::try_from(d).ok())
            .unwrap_or(0);

        let next = next_links(doc, result.task.uri(), depth, policy);
        for link in next {
            if self.mark_seen(&link) {
                debug!(uri = %link, depth = depth + 1, "following");
                crawler.queue(TaskSpec::new(link).meta(DEPTH_KEY, depth + 1));
            }
        }
    }
}

#[async_trait]
impl EventHandler for Reporter {
    async fn handle(&self, event: &CrawlEvent, crawler: &Crawler) -> Result<(), HandlerError> {
        if let CrawlEvent::Response(result) = event {
            self.print(result);
            self.follow_links(result, crawler);
        }
        Ok(())
    }
}

/// Links from `doc` worth queueing from a page at `depth`.
fn next_links(doc: &LinkDocument, from: &str, depth: u32, policy: FollowPolicy) -> Vec<String> {
    if depth >= policy.max_depth {
        return Vec::new();
    }
    let origin_host = Url::parse(from).ok().and_then(|u| u.host_str().map(str::to_owned));

    doc.links
        .iter()
        .filter(|link| {
            !policy.same_host
                || Url::parse(link)
                    .ok()
                    .and_then(|u| u.host_str().map(str::to_owned))
                    .is_some_and(|host| Some(host) == origin_host)
        })
        .cloned()
        .collect()
}
