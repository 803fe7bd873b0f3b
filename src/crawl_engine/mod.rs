//! Crawl Engine Module
//!
//! This module contains the crawl pipeline: the visibility probe and wait
//! engine that gate a page, the download dispatcher, the recursive external
//! resolver, and the `Crawler` façade that runs them in order.

// Sub-modules
pub mod crawl_types;
pub mod crawler;
pub mod download;
pub mod external;
pub mod page_timeout;
pub mod readiness;
pub mod visibility;
pub mod wait;

// Re-export crawl types
pub use crawl_types::{CrawlContext, CrawlError, CrawlResult};

// Re-export the façade
pub use crawler::{CrawlOptions, CrawlOutcome, Crawler};

// Re-export pipeline stages for callers that drive pages themselves
pub use download::dispatch_downloads;
pub use external::failure_diagnostic;
pub use readiness::wait_until_ready;
pub use visibility::is_visible;
pub use wait::{race_show, wait_hide, wait_show};
