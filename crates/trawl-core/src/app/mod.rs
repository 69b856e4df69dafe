//! App - アプリケーション層
//!
//! ports（Fetch / DocumentParser）と queue を組み合わせて crawler を実装する。
//!
//! # 主要コンポーネント
//! - **CrawlerBuilder**: 構築と起動時検証
//! - **Crawler**: queue / on / run、イベント配送
//! - **WorkerLoop**: pop → rate gate → fetch → retry or emit
//! - **RunStats**: run ごとのカウンタ

pub mod builder;
pub mod config;
pub mod crawler;
pub mod handler;
mod page;
mod request;
pub mod status;
mod worker_loop;

pub use self::builder::CrawlerBuilder;
pub use self::config::{CrawlerConfig, QueueOrder};
pub use self::crawler::Crawler;
pub use self::handler::EventHandler;
pub use self::status::RunStats;
