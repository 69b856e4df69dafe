//! trawl - bounded-concurrency fetcher CLI.
//!
//! # 使用例
//! ```text
//! trawl -c 4 --rate-limit 2 https://example.com/ https://example.org/
//! trawl --tasks tasks.json --retries 5 --timeout-ms 10000
//! trawl --follow 2 --same-host https://example.com/
//! ```
//!
//! フラグは `--config` で読んだ値を上書きする。失敗した task が 1 つでもあれば終了コードは非 0。

mod report;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use eyre::{Context, Result, bail};
use tracing::{debug, info};

use trawl_core::{Crawler, CrawlerConfig, EventKind, LinkParser, QueueOrder, TaskSpec};

use crate::report::{FollowPolicy, Reporter};

#[derive(Debug, Parser)]
#[command(name = "trawl", version, about = "Fetch URIs with bounded concurrency, rate limiting and retries")]
struct Cli {
    /// URIs to fetch
    urls: Vec<String>,

    /// Crawler configuration (JSON). Flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON array of task objects (`{"uri": ..., "method": ..., ...}`)
    #[arg(long)]
    tasks: Option<PathBuf>,

    /// Number of concurrent workers
    #[arg(short = 'c', long)]
    max_connections: Option<usize>,

    /// Retry budget per task
    #[arg(long)]
    retries: Option<u32>,

    /// Fetch issues per second across all workers (0 = unlimited)
    #[arg(long)]
    rate_limit: Option<f64>,

    /// Per-request timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Process tasks in insertion order instead of newest first
    #[arg(long)]
    fifo: bool,

    /// Follow links found in HTML pages up to this depth
    #[arg(long, value_name = "DEPTH")]
    follow: Option<u32>,

    /// When following, stay on the host of the page the link came from
    #[arg(long, requires = "follow")]
    same_host: bool,

    /// Print one JSON object per response instead of plain lines
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn setup_logging(verbose: bool) {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

fn load_config(cli: &Cli) -> Result<CrawlerConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            CrawlerConfig::from_json_str(&text)
                .with_context(|| format!("Failed to parse config {}", path.display()))?
        }
        None => CrawlerConfig::default(),
    };

    if let Some(n) = cli.max_connections {
        config.max_connections = n;
    }
    if let Some(retries) = cli.retries {
        config.retries = retries;
    }
    if let Some(rate) = cli.rate_limit {
        config.rate_limit = rate;
    }
    if let Some(ms) = cli.timeout_ms {
        config.timeout_ms = Some(ms);
    }
    if cli.fifo {
        config.queue_order = QueueOrder::Fifo;
    }
    if cli.follow.is_some() {
        config.parse_document = true;
    }
    Ok(config)
}

fn load_tasks(cli: &Cli) -> Result<Vec<TaskSpec>> {
    let mut specs: Vec<TaskSpec> = match &cli.tasks {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read tasks {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse tasks {}", path.display()))?
        }
        None => Vec::new(),
    };
    specs.extend(cli.urls.iter().cloned().map(TaskSpec::from));

    if specs.is_empty() {
        bail!("nothing to fetch: pass URIs or --tasks");
    }
    Ok(specs)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = load_config(&cli)?;
    let specs = load_tasks(&cli)?;
    debug!(?config, tasks = specs.len(), "starting");

    let mut builder = Crawler::builder().config(config);
    if cli.follow.is_some() {
        builder = builder.parser(LinkParser::new());
    }
    let crawler = builder.build().context("Invalid crawler configuration")?;

    let follow = cli.follow.map(|max_depth| FollowPolicy {
        max_depth,
        same_host: cli.same_host,
    });
    let reporter = Reporter::new(follow, cli.json);
    for spec in specs {
        let uri = spec.uri.clone();
        let spec = if follow.is_some() { spec.meta(report::DEPTH_KEY, 0) } else { spec };
        reporter.mark_seen(&uri);
        crawler.queue(spec);
    }
    crawler.on(EventKind::Response, reporter);
    crawler.on_drain(|| {
        debug!("queue drained");
        Ok(())
    });

    let started = tokio::time::Instant::now();
    let stats = crawler.run().await?;
    let elapsed: Duration = started.elapsed();

    info!(
        succeeded = stats.succeeded,
        failed = stats.failed,
        attempts = stats.attempts,
        retries = stats.retries,
        elapsed_ms = elapsed.as_millis() as u64,
        "done"
    );

    Ok(if stats.failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
