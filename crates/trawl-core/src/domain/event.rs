//! Events - event bus が配送するイベント
//!
//! `"response"` と `"drain"` の 2 種類だけ。

use std::fmt;
use std::str::FromStr;

use super::CrawlResult;

/// Registration key for handlers. One handler per kind; the last one wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Response,
    Drain,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Response => "response",
            EventKind::Drain => "drain",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event name: {0}")]
pub struct UnknownEvent(pub String);

impl FromStr for EventKind {
    type Err = UnknownEvent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "response" => Ok(EventKind::Response),
            "drain" => Ok(EventKind::Drain),
            other => Err(UnknownEvent(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub enum CrawlEvent {
    /// One logical task reached its terminal result.
    Response(CrawlResult),
    /// Every queued logical task has resolved. Fired once per run.
    Drained,
}

impl CrawlEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            CrawlEvent::Response(_) => EventKind::Response,
            CrawlEvent::Drained => EventKind::Drain,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::response("response", EventKind::Response)]
    #[case::drain("drain", EventKind::Drain)]
    fn event_names_parse(#[case] name: &str, #[case] kind: EventKind) {
        assert_eq!(name.parse::<EventKind>(), Ok(kind));
        assert_eq!(kind.as_str(), name);
    }

    #[test]
    fn unknown_event_name_is_rejected() {
        let err = "finish".parse::<EventKind>().unwrap_err();
        assert_eq!(err.to_string(), "unknown event name: finish");
    }

    #[test]
    fn drained_event_kind() {
        assert_eq!(CrawlEvent::Drained.kind(), EventKind::Drain);
    }
}
