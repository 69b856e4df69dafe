//! LinkParser - title and link extraction for HTML pages.
//!
//! # 方針
//! - `scraper` で HTML をパースし、`<title>` と `a[href]` を拾う
//! - 相対リンクは task の URI を base に解決する
//! - http(s) 以外（mailto:, javascript: など）とフラグメントだけのリンクは捨てる
//! - フラグメントを落とした上で重複を除き、文書順を保つ

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use scraper::{Html, Selector};
use url::Url;

use crate::domain::{Document, Task};
use crate::ports::{DocumentParser, ParseError};

static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("title selector"));

static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("anchor selector"));

/// Parsed form of an HTML page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkDocument {
    pub title: Option<String>,
    /// Absolute http(s) links in document order, fragments stripped, no duplicates.
    pub links: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LinkParser;

impl LinkParser {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, html: &str, base: Option<&Url>) -> LinkDocument {
        let document = Html::parse_document(html);

        let title = document
            .select(&TITLE)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty());

        let mut seen = HashSet::new();
        let links = document
            .select(&ANCHOR)
            .filter_map(|el| el.value().attr("href"))
            .filter_map(|href| resolve(href.trim(), base))
            .filter(|link| seen.insert(link.clone()))
            .collect();

        LinkDocument { title, links }
    }
}

impl DocumentParser for LinkParser {
    fn parse(&self, text: &str, task: &Task) -> Result<Document, ParseError> {
        let base = Url::parse(task.uri()).ok();
        Ok(Arc::new(self.extract(text, base.as_ref())))
    }
}

fn resolve(href: &str, base: Option<&Url>) -> Option<String> {
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let mut url = match base {
        Some(base) => base.join(href).ok()?,
        None => Url::parse(href).ok()?,
    };
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::CrawlerConfig;
    use crate::domain::TaskSpec;

    const PAGE: &str = r##"
        <html><head><TITLE> Rust &amp; Friends </TITLE></head>
        <body>
          <a href="/docs">Docs</a>
          <a class="x" href='guide/intro.html#top'>Guide</a>
          <a href=https://other.example/path>Other</a>
          <a href="/docs">Docs again</a>
          <a href="#section">Anchor</a>
          <a href="mailto:me@example.com">Mail</a>
          <a href="javascript:void(0)">JS</a>
          <a href="/search?q=a&amp;page=2">Search</a>
          <a name="no-href">Target</a>
        </body></html>
    "##;

    fn base() -> Url {
        Url::parse("https://example.com/book/index.html").unwrap()
    }

    #[test]
    fn extracts_title_and_resolves_links() {
        let doc = LinkParser::new().extract(PAGE, Some(&base()));

        assert_eq!(doc.title.as_deref(), Some("Rust & Friends"));
        assert_eq!(
            doc.links,
            vec![
                "https://example.com/docs",
                "https://example.com/book/guide/intro.html",
                "https://other.example/path",
                "https://example.com/search?q=a&page=2",
            ]
        );
    }

    #[test]
    fn only_real_href_attributes_count() {
        let html = r#"
            <a data-href="/wrong" href="/right">x</a>
            <!-- <a href="/commented">c</a> -->
            <script>var s = '<a href="/scripted">';</script>
        "#;
        let doc = LinkParser::new().extract(html, Some(&base()));
        assert_eq!(doc.links, vec!["https://example.com/right"]);
    }

    #[test]
    fn without_base_keeps_only_absolute_links() {
        let doc = LinkParser::new().extract(PAGE, None);
        assert_eq!(doc.links, vec!["https://other.example/path"]);
    }

    #[test]
    fn page_without_title_or_links() {
        let doc = LinkParser::new().extract("<p>plain</p>", None);
        assert_eq!(doc, LinkDocument::default());
    }

    #[test]
    fn parse_uses_task_uri_as_base() {
        let task = TaskSpec::new("http://example.com/a/").into_task(&CrawlerConfig::default().task_defaults());
        let document = LinkParser::new().parse(r#"<a href="b">b</a>"#, &task).unwrap();
        let doc = document.downcast_ref::<LinkDocument>().unwrap();
        assert_eq!(doc.links, vec!["http://example.com/a/b"]);
    }
}
