pub mod browser;
pub mod config;
pub mod crawl_engine;
pub mod page_extractor;
pub mod utils;

pub use browser::{BrowserDriver, DownloadCapture, ElementHandle, ModifierKey, PageHandle};
pub use config::{ConfigFetcher, ConfigSource, CrawlConfig, CrawlerSettings, FileConfigFetcher};
pub use crawl_engine::{CrawlError, CrawlOptions, CrawlOutcome, CrawlResult, Crawler};
pub use page_extractor::schema::*;
pub use utils::resolve_ref;
