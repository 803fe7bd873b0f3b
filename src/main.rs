//! `rpa-crawl`: crawl one URL with a crawl config and print the result tree.
//!
//! Usage: rpa-crawl <URL> <CONFIG> [--download] [--keep-tab] [--headful] [--output FILE]

use anyhow::{Context, Result};
use clap::Parser;
use rpa_crawler::browser::{ChromiumDriver, launch_browser};
use rpa_crawler::config::{CrawlerSettings, FileConfigFetcher};
use rpa_crawler::crawl_engine::{CrawlOptions, Crawler};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "rpa-crawl", version, about = "Config-driven browser crawler")]
struct Cli {
    /// Page to crawl
    url: String,

    /// Crawl config: filesystem path or http(s) URL of a JSON document
    config: String,

    /// Save the files listed in the config's downloadSection
    #[arg(long)]
    download: bool,

    /// Leave the crawled tab open until the browser shuts down
    #[arg(long)]
    keep_tab: bool,

    /// Show the browser window
    #[arg(long)]
    headful: bool,

    /// Probe interval for selector waits, in milliseconds (100-1000)
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,

    /// Write the result JSON here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,chromiumoxide=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let settings = CrawlerSettings::builder()
        .poll_interval(Duration::from_millis(cli.poll_ms))
        .build()?;
    let fetcher = FileConfigFetcher::new()?;

    let wrapper = launch_browser(!cli.headful).await?;
    let driver = Arc::new(ChromiumDriver::new(wrapper)?);
    let crawler = Crawler::new(
        Arc::clone(&driver) as Arc<dyn rpa_crawler::browser::BrowserDriver>,
        Arc::new(fetcher),
        settings,
    );

    info!("Crawling {} with {}", cli.url, cli.config);
    let outcome = crawler
        .crawl_url(
            &cli.url,
            cli.config.as_str(),
            CrawlOptions {
                auto_download: cli.download,
                close_tab: !cli.keep_tab,
            },
        )
        .await;
    drop(crawler);

    let written = match outcome {
        Ok(outcome) => {
            let json = serde_json::to_string_pretty(&outcome.result)?;
            match &cli.output {
                Some(path) => tokio::fs::write(path, json)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display())),
                None => {
                    println!("{json}");
                    Ok(())
                }
            }
        }
        Err(e) => Err(anyhow::Error::new(e).context(format!("Crawl of {} failed", cli.url))),
    };

    if let Some(driver) = Arc::into_inner(driver) {
        driver.shutdown().await;
    }
    written
}
