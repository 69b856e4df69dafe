//! Impls - ports の実装
//!
//! - **HttpFetcher**: reqwest による `Fetch`
//! - **LinkParser**: HTML から title とリンクを抽出する `DocumentParser`

pub mod http;
pub mod links;

pub use self::http::HttpFetcher;
pub use self::links::{LinkDocument, LinkParser};
