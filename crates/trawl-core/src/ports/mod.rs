//! Ports - 抽象化レイヤー
//!
//! 通信（Fetch）とパース（DocumentParser）は trait の向こう側に置く。
//! テストではスタブに差し替える。

pub mod fetch;
pub mod parse;

pub use self::fetch::{Fetch, FetchError, FetchRequest, FetchResponse};
pub use self::parse::{DocumentParser, ParseError};
